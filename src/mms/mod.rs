//! MMS body composition and parsing.

pub mod compose;
pub mod parse;
pub mod textfile;

pub use compose::{Composition, MmsComposer, DEFAULT_PAGE_DURATION_MS};
pub use parse::{MmsParser, ParsedBody};
pub use textfile::{TextFile, TextFileStore};
