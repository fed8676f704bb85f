//! In-memory message store.

use std::collections::BTreeMap;

use crate::error::{MessagesError, Result};
use crate::model::body::MmsBody;
use crate::model::message::{Envelope, MessageId};

use super::{release_text_files, MessageStore};

#[derive(Debug, Clone)]
struct Record {
    envelope: Envelope,
    body: Option<MmsBody>,
}

/// Keeps messages in a map. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<MessageId, Record>,
    last_id: MessageId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MessageStore for MemoryStore {
    fn add_message(&mut self, envelope: &Envelope) -> Result<MessageId> {
        let id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| MessagesError::OperationFailed("message ids exhausted".into()))?;
        let mut envelope = envelope.clone();
        envelope.id = Some(id);
        self.records.insert(id, Record { envelope, body: None });
        self.last_id = id;
        Ok(id)
    }

    fn get_envelope(&mut self, id: MessageId) -> Result<Envelope> {
        self.records
            .get(&id)
            .map(|r| r.envelope.clone())
            .ok_or(MessagesError::NotFound(id))
    }

    fn set_body(&mut self, id: MessageId, body: &MmsBody) -> Result<()> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| MessagesError::OperationFailed(format!("no message {id} to attach a body to")))?;
        if let Some(old) = record.body.replace(body.clone()) {
            release_text_files(&old, Some(body));
        }
        Ok(())
    }

    fn get_body(&mut self, id: MessageId) -> Result<MmsBody> {
        self.records
            .get(&id)
            .and_then(|r| r.body.clone())
            .ok_or(MessagesError::NotFound(id))
    }

    fn remove_message(&mut self, id: MessageId) -> Result<()> {
        if let Some(body) = self.records.remove(&id).and_then(|r| r.body) {
            release_text_files(&body, None);
        }
        Ok(())
    }

    fn message_ids(&mut self) -> Result<Vec<MessageId>> {
        Ok(self.records.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{Mailbox, MessageKind};

    #[test]
    fn test_ids_are_assigned_in_order() {
        let mut store = MemoryStore::new();
        let env = Envelope::new(MessageKind::Sms, Mailbox::Inbox);
        assert_eq!(store.add_message(&env).unwrap(), 1);
        assert_eq!(store.add_message(&env).unwrap(), 2);
        assert_eq!(store.message_ids().unwrap(), vec![1, 2]);
        assert_eq!(store.get_envelope(2).unwrap().id, Some(2));
    }

    #[test]
    fn test_missing_message() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.get_envelope(7), Err(MessagesError::NotFound(7))));
        assert!(matches!(
            store.set_body(7, &MmsBody::default()),
            Err(MessagesError::OperationFailed(_))
        ));
    }

    #[test]
    fn test_body_is_separate_from_envelope() {
        let mut store = MemoryStore::new();
        let id = store
            .add_message(&Envelope::new(MessageKind::Mms, Mailbox::Draft))
            .unwrap();
        assert!(matches!(store.get_body(id), Err(MessagesError::NotFound(_))));

        store.set_body(id, &MmsBody::default()).unwrap();
        assert_eq!(store.get_body(id).unwrap(), MmsBody::default());
    }

    #[test]
    fn test_text_files_follow_the_body() {
        use crate::model::body::{MediaElement, Page, TextStyle};

        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&first, "one").unwrap();
        std::fs::write(&second, "two").unwrap();
        let body_with = |path: &std::path::Path| MmsBody {
            pages: vec![Page {
                duration_ms: 5440,
                media: vec![MediaElement::text(
                    "Text",
                    path.to_string_lossy(),
                    TextStyle::default(),
                )],
            }],
            ..MmsBody::default()
        };

        let mut store = MemoryStore::new();
        let id = store
            .add_message(&Envelope::new(MessageKind::Mms, Mailbox::Draft))
            .unwrap();
        store.set_body(id, &body_with(&first)).unwrap();

        // Re-setting the same body keeps its file.
        store.set_body(id, &body_with(&first)).unwrap();
        assert!(first.exists());

        store.set_body(id, &body_with(&second)).unwrap();
        assert!(!first.exists());
        assert!(second.exists());

        store.remove_message(id).unwrap();
        assert!(!second.exists());
        assert!(store.is_empty());
    }
}
