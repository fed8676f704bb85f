//! Core data model types: messages, attachments, and structured MMS bodies.

pub mod attachment;
pub mod body;
pub mod message;
