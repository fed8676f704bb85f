//! Directory-backed message store: one record file per message, with an
//! LRU cache of decoded MMS bodies.

use std::io::{ErrorKind, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::error::{MessagesError, Result};
use crate::model::body::MmsBody;
use crate::model::message::{Envelope, MessageId};

use super::format::{RecordHeader, StoredRecord, HEADER_SIZE, RECORD_EXTENSION};
use super::{release_text_files, MessageStore};

/// Default number of decoded bodies to keep in the LRU cache.
const DEFAULT_CACHE_SIZE: usize = 50;

/// Stores each message as `<id>.msg` inside a directory.
pub struct FileStore {
    dir: PathBuf,
    next_id: MessageId,
    cache: LruCache<MessageId, MmsBody>,
}

impl FileStore {
    /// Open (creating if needed) a store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_cache_size(dir, DEFAULT_CACHE_SIZE)
    }

    /// Open a store directory keeping up to `cache_size` bodies in memory.
    pub fn with_cache_size(dir: impl AsRef<Path>, cache_size: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| MessagesError::io(&dir, e))?;

        let ids = scan_ids(&dir)?;
        let next_id = ids.last().map_or(1, |last| last.saturating_add(1));
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        debug!(path = %dir.display(), messages = ids.len(), "Opened message store");

        Ok(Self {
            dir,
            next_id,
            cache: LruCache::new(cache_size),
        })
    }

    /// Open the store configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_cache_size(config::store_dir(config), config.store.cache_size)
    }

    /// Path of the record file for `id`.
    pub fn record_path(&self, id: MessageId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn read_record(&self, id: MessageId) -> Result<StoredRecord> {
        let path = self.record_path(id);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(MessagesError::NotFound(id)),
            Err(e) => return Err(MessagesError::io(&path, e)),
        };

        if data.len() < HEADER_SIZE {
            return Err(MessagesError::InvalidRecord {
                path,
                reason: "Record file too small".into(),
            });
        }

        let header: RecordHeader =
            bincode::deserialize(&data[..HEADER_SIZE]).map_err(|e| MessagesError::InvalidRecord {
                path: path.clone(),
                reason: format!("Header deserialization failed: {e}"),
            })?;

        let payload = &data[HEADER_SIZE..];
        if let Err(reason) = header.validate().and_then(|()| header.verify(payload)) {
            return Err(MessagesError::InvalidRecord { path, reason });
        }

        bincode::deserialize(payload).map_err(|e| MessagesError::InvalidRecord {
            path,
            reason: format!("Payload deserialization failed: {e}"),
        })
    }

    fn write_record(&self, id: MessageId, record: &StoredRecord) -> Result<()> {
        let payload = bincode::serialize(record)
            .map_err(|e| MessagesError::OperationFailed(format!("cannot encode message {id}: {e}")))?;
        let header_bytes = bincode::serialize(&RecordHeader::for_payload(&payload))
            .map_err(|e| MessagesError::OperationFailed(format!("cannot encode header: {e}")))?;

        // Pad header to HEADER_SIZE
        let mut padded_header = vec![0u8; HEADER_SIZE];
        let copy_len = header_bytes.len().min(HEADER_SIZE);
        padded_header[..copy_len].copy_from_slice(&header_bytes[..copy_len]);

        // Write next to the target and rename, so readers never see half a record.
        let path = self.record_path(id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| MessagesError::io(&self.dir, e))?;
        tmp.write_all(&padded_header)
            .and_then(|()| tmp.write_all(&payload))
            .and_then(|()| tmp.flush())
            .map_err(|e| MessagesError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| MessagesError::io(&path, e.error))?;

        debug!(path = %path.display(), bytes = HEADER_SIZE + payload.len(), "Record written");
        Ok(())
    }
}

impl MessageStore for FileStore {
    fn add_message(&mut self, envelope: &Envelope) -> Result<MessageId> {
        let id = self.next_id;
        if id == MessageId::MAX {
            return Err(MessagesError::OperationFailed("message ids exhausted".into()));
        }

        let mut envelope = envelope.clone();
        envelope.id = Some(id);
        self.write_record(id, &StoredRecord { envelope, body: None })?;
        self.next_id = id + 1;
        Ok(id)
    }

    fn get_envelope(&mut self, id: MessageId) -> Result<Envelope> {
        Ok(self.read_record(id)?.envelope)
    }

    fn set_body(&mut self, id: MessageId, body: &MmsBody) -> Result<()> {
        let mut record = match self.read_record(id) {
            Ok(record) => record,
            Err(MessagesError::NotFound(_)) => {
                return Err(MessagesError::OperationFailed(format!(
                    "no message {id} to attach a body to"
                )))
            }
            Err(e) => return Err(e),
        };
        let old = record.body.replace(body.clone());
        self.write_record(id, &record)?;
        self.cache.put(id, body.clone());
        if let Some(old) = old {
            release_text_files(&old, Some(body));
        }
        Ok(())
    }

    fn get_body(&mut self, id: MessageId) -> Result<MmsBody> {
        if let Some(body) = self.cache.get(&id) {
            return Ok(body.clone());
        }
        let body = self
            .read_record(id)?
            .body
            .ok_or(MessagesError::NotFound(id))?;
        self.cache.put(id, body.clone());
        Ok(body)
    }

    fn remove_message(&mut self, id: MessageId) -> Result<()> {
        self.cache.pop(&id);
        let body = match self.read_record(id) {
            Ok(record) => record.body,
            Err(MessagesError::NotFound(_)) => return Ok(()),
            Err(e) => {
                warn!(id, error = %e, "Removing unreadable record; its text files are kept");
                None
            }
        };

        let path = self.record_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Record removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(MessagesError::io(&path, e)),
        }
        if let Some(body) = body {
            release_text_files(&body, None);
        }
        Ok(())
    }

    fn message_ids(&mut self) -> Result<Vec<MessageId>> {
        scan_ids(&self.dir)
    }
}

/// Ids of the record files in `dir`, ascending.
fn scan_ids(dir: &Path) -> Result<Vec<MessageId>> {
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| MessagesError::io(dir, e))? {
        let entry = entry.map_err(|e| MessagesError::io(dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }
        match path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<MessageId>().ok())
        {
            Some(id) => ids.push(id),
            None => warn!(path = %path.display(), "Ignoring record with a non-numeric name"),
        }
    }
    ids.sort_unstable();
    Ok(ids)
}
