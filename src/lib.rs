//! `mmskit`: SMS/MMS message composition, storage and parsing.
//!
//! The core turns a message's text and attachment list into a structured
//! MMS body (regions, a page of media, trailing attachments) and recovers
//! text and attachments from a stored body again.

pub mod config;
pub mod error;
pub mod mms;
pub mod model;
pub mod service;
pub mod store;
