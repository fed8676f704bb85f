//! Message stores.
//!
//! A store keeps two things per message: the [`Envelope`] (addresses,
//! SMS text, subject, mailbox) and, for MMS, the structured [`MmsBody`].
//! They are written and read in two steps, envelope first.
//!
//! A stored body owns the text files its text media point at. They are
//! deleted with the message, or when the body is replaced by one that no
//! longer references them.

pub mod file;
pub mod format;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::io::ErrorKind;

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::body::{MmsBody, SmilMediaKind};
use crate::model::message::{Envelope, MessageId};

/// Persistence backend used by the message service.
pub trait MessageStore {
    /// Store a new envelope and return the id assigned to it.
    ///
    /// The `id` field of `envelope` is ignored.
    fn add_message(&mut self, envelope: &Envelope) -> Result<MessageId>;

    /// Fetch the envelope of a stored message.
    fn get_envelope(&mut self, id: MessageId) -> Result<Envelope>;

    /// Attach an MMS body to a stored message, replacing any previous one.
    fn set_body(&mut self, id: MessageId, body: &MmsBody) -> Result<()>;

    /// Fetch the MMS body of a stored message.
    fn get_body(&mut self, id: MessageId) -> Result<MmsBody>;

    /// Delete a message, its body and the body's text files. Unknown ids
    /// are not an error.
    fn remove_message(&mut self, id: MessageId) -> Result<()>;

    /// Ids of every stored message, ascending.
    fn message_ids(&mut self) -> Result<Vec<MessageId>>;
}

/// Delete the text files of `old` that `new` does not reference.
///
/// Failures are logged; the message itself is already gone or replaced.
pub(crate) fn release_text_files(old: &MmsBody, new: Option<&MmsBody>) {
    let still_used = |path: &str| {
        new.is_some_and(|body| {
            body.media()
                .any(|m| m.kind == SmilMediaKind::Text && m.filepath == path)
        })
    };

    for media in old.media() {
        if media.kind != SmilMediaKind::Text || media.filepath.is_empty() {
            continue;
        }
        if still_used(&media.filepath) {
            continue;
        }
        match std::fs::remove_file(&media.filepath) {
            Ok(()) => debug!(path = %media.filepath, "Removed MMS text file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %media.filepath, error = %e, "Could not remove MMS text file"),
        }
    }
}
