//! On-disk record format for [`FileStore`](super::FileStore).
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (64 bytes, fixed)             │
//! │  magic: [u8; 8] = b"MMSKIT\0\0"      │
//! │  version: u32                        │
//! │  payload_len: u64                    │
//! │  sha256_payload: [u8; 32]            │
//! │  (padding to 64 bytes)               │
//! ├──────────────────────────────────────┤
//! │ PAYLOAD (variable)                   │
//! │  bincode-serialized StoredRecord     │
//! └──────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::body::MmsBody;
use crate::model::message::Envelope;

/// Magic bytes identifying an mmskit record file.
pub const MAGIC: &[u8; 8] = b"MMSKIT\0\0";

/// Current record format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// File extension of record files.
pub const RECORD_EXTENSION: &str = "msg";

/// Serializable record header.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Magic bytes (must equal [`MAGIC`]).
    pub magic: [u8; 8],
    /// Format version (must equal [`VERSION`]).
    pub version: u32,
    /// Length of the payload following the header.
    pub payload_len: u64,
    /// SHA-256 of the payload.
    pub sha256_payload: [u8; 32],
}

impl RecordHeader {
    /// Header describing `payload`.
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            payload_len: payload.len() as u64,
            sha256_payload: sha256(payload),
        }
    }

    /// Validate that the header is well-formed and matches the current format.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        Ok(())
    }

    /// Check `payload` against the recorded length and hash.
    pub fn verify(&self, payload: &[u8]) -> std::result::Result<(), String> {
        if self.payload_len != payload.len() as u64 {
            return Err(format!(
                "Payload length mismatch: expected {}, found {}",
                self.payload_len,
                payload.len()
            ));
        }
        if self.sha256_payload != sha256(payload) {
            return Err("Payload hash mismatch".into());
        }
        Ok(())
    }
}

/// Everything stored for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub envelope: Envelope,
    pub body: Option<MmsBody>,
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
