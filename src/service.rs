//! Sending, saving and searching messages on top of a [`MessageStore`].

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MessagesError, Result};
use crate::mms::{Composition, MmsComposer, MmsParser};
use crate::model::message::{Envelope, Mailbox, Message, MessageId, MessageKind};
use crate::store::MessageStore;

/// Criteria for [`MessageService::search_messages`].
///
/// Empty criteria match every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub mailbox: Mailbox,
    pub kind: Option<MessageKind>,
    /// Case-insensitive substring of the text or subject.
    pub keyword: Option<String>,
    /// Substring of any recipient address.
    pub address: Option<String>,
    /// Matches to skip before the first result.
    pub offset: usize,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl SearchFilter {
    fn matches_envelope(&self, envelope: &Envelope) -> bool {
        if !self.mailbox.matches(envelope.mailbox) {
            return false;
        }
        if self.kind.is_some_and(|k| k != envelope.kind) {
            return false;
        }
        if let Some(ref needle) = self.address {
            if !envelope.addresses.iter().any(|r| r.address.contains(needle.as_str())) {
                return false;
            }
        }
        true
    }

    fn matches_content(&self, message: &Message) -> bool {
        let Some(ref keyword) = self.keyword else {
            return true;
        };
        let keyword = keyword.to_lowercase();
        let subject = message.subject().ok().flatten();
        [message.text(), subject]
            .into_iter()
            .flatten()
            .any(|s| s.to_lowercase().contains(&keyword))
    }
}

/// Message operations over a store.
pub struct MessageService<S: MessageStore> {
    store: S,
    composer: MmsComposer,
    parser: MmsParser,
}

impl<S: MessageStore> MessageService<S> {
    /// Service with the default composer and parser.
    pub fn new(store: S) -> Self {
        Self::with_parts(store, MmsComposer::default(), MmsParser::default())
    }

    pub fn with_parts(store: S, composer: MmsComposer, parser: MmsParser) -> Self {
        Self {
            store,
            composer,
            parser,
        }
    }

    /// Service whose composer and parser follow `config`.
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::with_parts(
            store,
            MmsComposer::from_config(config),
            MmsParser::from_config(&config.parse),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Send `message`, recording it in the sent box or the outbox.
    ///
    /// On success the message carries its new id, mailbox and timestamp.
    pub fn send_message(&mut self, message: &mut Message, save_to_sentbox: bool) -> Result<MessageId> {
        if message.address_count() == 0 {
            return Err(MessagesError::invalid("a message needs at least one recipient"));
        }
        let mailbox = if save_to_sentbox {
            Mailbox::Sentbox
        } else {
            Mailbox::Outbox
        };
        let id = self.store_message(message, mailbox)?;
        info!(id, kind = %message.kind(), mailbox = %mailbox, "Message sent");
        Ok(id)
    }

    /// Save `message` into the draft box. Drafts may have no recipients.
    pub fn save_draft(&mut self, message: &mut Message) -> Result<MessageId> {
        let id = self.store_message(message, Mailbox::Draft)?;
        info!(id, kind = %message.kind(), "Draft saved");
        Ok(id)
    }

    fn store_message(&mut self, message: &mut Message, mailbox: Mailbox) -> Result<MessageId> {
        let kind = message.kind();
        if !matches!(kind, MessageKind::Sms | MessageKind::Mms) {
            return Err(MessagesError::invalid(format!(
                "cannot store a message of kind '{kind}'"
            )));
        }

        // Compose first so layout failures surface before anything is stored.
        let composition = if kind.is_mms() {
            Some(
                self.composer
                    .compose(message.text(), message.attachments())?,
            )
        } else {
            None
        };

        let mut envelope = message.envelope();
        envelope.mailbox = mailbox;
        let id = self.store.add_message(&envelope).map_err(rejected)?;

        if let Some(composition) = composition {
            if let Err(e) = self.attach_body(id, composition) {
                if let Err(cleanup) = self.store.remove_message(id) {
                    warn!(id, error = %cleanup, "Could not remove partially stored message");
                }
                return Err(e);
            }
        }

        message.mark_stored(id, mailbox, Utc::now());
        Ok(id)
    }

    fn attach_body(&mut self, id: MessageId, composition: Composition) -> Result<()> {
        self.store
            .set_body(id, composition.body())
            .map_err(rejected)?;
        composition.commit()?;
        Ok(())
    }

    /// Load a message by id. MMS text and attachments are read from the body.
    pub fn search_message_by_id(&mut self, id: MessageId) -> Result<Message> {
        let envelope = self.store.get_envelope(id)?;
        self.load(id, envelope)
    }

    fn load(&mut self, id: MessageId, envelope: Envelope) -> Result<Message> {
        let mut message = Message::from_envelope(envelope);
        if message.kind().is_mms() {
            let body = self.store.get_body(id)?;
            self.parser.load_into(&body, &mut message);
        }
        Ok(message)
    }

    /// Messages matching `filter`, in id order.
    ///
    /// A message that cannot be loaded is skipped with a warning.
    pub fn search_messages(&mut self, filter: &SearchFilter) -> Result<Vec<Message>> {
        let ids = self.store.message_ids()?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        let mut skipped = 0;
        let mut found = Vec::new();

        for id in ids {
            if found.len() >= limit {
                break;
            }
            let envelope = match self.store.get_envelope(id) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(id, error = %e, "Skipping unreadable message");
                    continue;
                }
            };
            if !filter.matches_envelope(&envelope) {
                continue;
            }
            let message = match self.load(id, envelope) {
                Ok(message) => message,
                Err(e) => {
                    warn!(id, error = %e, "Skipping unreadable message");
                    continue;
                }
            };
            if !filter.matches_content(&message) {
                continue;
            }
            if skipped < filter.offset {
                skipped += 1;
                continue;
            }
            found.push(message);
        }

        debug!(results = found.len(), "Search complete");
        Ok(found)
    }

    /// Call `callback(message, index, total)` for every match until it
    /// returns `false`. Returns how many messages were visited.
    pub fn foreach_message<F>(&mut self, filter: &SearchFilter, mut callback: F) -> Result<usize>
    where
        F: FnMut(&Message, usize, usize) -> bool,
    {
        let messages = self.search_messages(filter)?;
        let total = messages.len();
        let mut visited = 0;
        for (index, message) in messages.iter().enumerate() {
            visited += 1;
            if !callback(message, index, total) {
                break;
            }
        }
        Ok(visited)
    }

    /// Number of messages in `mailbox`, optionally restricted to one kind.
    pub fn count_messages(&mut self, mailbox: Mailbox, kind: Option<MessageKind>) -> Result<usize> {
        let filter = SearchFilter {
            mailbox,
            kind,
            ..SearchFilter::default()
        };
        let mut count = 0;
        for id in self.store.message_ids()? {
            match self.store.get_envelope(id) {
                Ok(envelope) if filter.matches_envelope(&envelope) => count += 1,
                Ok(_) => {}
                Err(e) => warn!(id, error = %e, "Skipping unreadable message"),
            }
        }
        Ok(count)
    }
}

/// Report any store write failure as a rejected operation.
fn rejected(e: MessagesError) -> MessagesError {
    match e {
        MessagesError::OperationFailed(_) | MessagesError::OutOfMemory(_) => e,
        other => MessagesError::OperationFailed(other.to_string()),
    }
}
