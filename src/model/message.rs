//! SMS/MMS message and its stored envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::{Attachment, MediaKind};
use crate::error::{MessagesError, Result};

/// Maximum length in bytes of a recipient address.
pub const MAX_ADDRESS_LEN: usize = 254;

/// Maximum number of characters in an SMS text.
pub const MAX_SMS_TEXT_LEN: usize = 1530;

/// Maximum number of characters in an MMS subject.
pub const MAX_SUBJECT_LEN: usize = 120;

/// Maximum number of recipients per message.
pub const MAX_RECIPIENTS: usize = 10;

/// Identifier assigned by the message store.
pub type MessageId = u32;

/// Kind of message. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    #[default]
    Unknown,
    Sms,
    Mms,
    /// Cell broadcast.
    Cb,
    /// WAP push.
    Push,
    EtwsPrimary,
    EtwsSecondary,
}

impl MessageKind {
    /// Cell broadcast, push and ETWS messages travel over SMS.
    pub fn is_sms(self) -> bool {
        matches!(
            self,
            Self::Sms | Self::Cb | Self::Push | Self::EtwsPrimary | Self::EtwsSecondary
        )
    }

    pub fn is_mms(self) -> bool {
        self == Self::Mms
    }

    /// Parse a kind name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sms" => Some(Self::Sms),
            "mms" => Some(Self::Mms),
            "cb" => Some(Self::Cb),
            "push" => Some(Self::Push),
            "etws-primary" => Some(Self::EtwsPrimary),
            "etws-secondary" => Some(Self::EtwsSecondary),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Sms => "sms",
            Self::Mms => "mms",
            Self::Cb => "cb",
            Self::Push => "push",
            Self::EtwsPrimary => "etws-primary",
            Self::EtwsSecondary => "etws-secondary",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder a stored message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    /// Not yet stored, or "any folder" when used as a filter.
    #[default]
    All,
    Inbox,
    Outbox,
    Sentbox,
    Draft,
}

impl Mailbox {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "inbox" => Some(Self::Inbox),
            "outbox" => Some(Self::Outbox),
            "sentbox" | "sent" => Some(Self::Sentbox),
            "draft" | "drafts" => Some(Self::Draft),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Inbox => "inbox",
            Self::Outbox => "outbox",
            Self::Sentbox => "sentbox",
            Self::Draft => "draft",
        }
    }

    /// `All` matches every folder.
    pub fn matches(self, other: Mailbox) -> bool {
        self == Self::All || self == other
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    #[default]
    Unknown,
    To,
    Cc,
    Bcc,
}

/// How an MMS recipient is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    /// Phone number.
    Plmn,
    Email,
}

impl AddressType {
    /// Anything containing `@` is an e-mail address.
    pub fn detect(address: &str) -> Self {
        if address.contains('@') {
            Self::Email
        } else {
            Self::Plmn
        }
    }
}

/// A recipient of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub recipient_type: RecipientType,
    /// Recorded for MMS only.
    pub address_type: Option<AddressType>,
}

/// SIM slot a message is sent from or was received on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimIndex {
    #[default]
    Unknown,
    Sim1,
    Sim2,
}

impl SimIndex {
    /// Map a numeric slot (1 or 2) to a `SimIndex`.
    pub fn from_number(n: u8) -> Self {
        match n {
            1 => Self::Sim1,
            2 => Self::Sim2,
            _ => Self::Unknown,
        }
    }
}

/// The part of a message the store keeps outside the MMS body.
///
/// For MMS the text lives in the body (as a text file), so `text` is only
/// set for SMS-class messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Option<MessageId>,
    pub kind: MessageKind,
    pub mailbox: Mailbox,
    pub addresses: Vec<Recipient>,
    pub text: Option<String>,
    pub subject: Option<String>,
    pub sim: SimIndex,
    pub port: u16,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    /// An empty envelope of the given kind, e.g. for an incoming message.
    pub fn new(kind: MessageKind, mailbox: Mailbox) -> Self {
        Self {
            id: None,
            kind,
            mailbox,
            addresses: Vec::new(),
            text: None,
            subject: None,
            sim: SimIndex::Unknown,
            port: 0,
            timestamp: None,
        }
    }
}

/// An SMS or MMS message.
///
/// Setters check that they apply to this kind of message: the subject and
/// attachments exist only on MMS, and SMS text is length-limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: Option<MessageId>,
    kind: MessageKind,
    mailbox: Mailbox,
    addresses: Vec<Recipient>,
    text: Option<String>,
    subject: Option<String>,
    attachments: Vec<Attachment>,
    sim: SimIndex,
    port: u16,
    timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create an empty outgoing message. Only SMS and MMS can be created.
    pub fn new(kind: MessageKind) -> Result<Self> {
        if !matches!(kind, MessageKind::Sms | MessageKind::Mms) {
            return Err(MessagesError::invalid(format!(
                "cannot create a message of kind '{kind}'"
            )));
        }
        Ok(Self::from_envelope(Envelope::new(kind, Mailbox::All)))
    }

    /// Rebuild a message from a stored envelope. The MMS text and
    /// attachments are filled in separately from the body.
    pub fn from_envelope(envelope: Envelope) -> Self {
        let text = if envelope.kind.is_mms() {
            None
        } else {
            envelope.text
        };
        Self {
            id: envelope.id,
            kind: envelope.kind,
            mailbox: envelope.mailbox,
            addresses: envelope.addresses,
            text,
            subject: envelope.subject,
            attachments: Vec::new(),
            sim: envelope.sim,
            port: envelope.port,
            timestamp: envelope.timestamp,
        }
    }

    /// The envelope to hand to a store. MMS text is left out.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            id: self.id,
            kind: self.kind,
            mailbox: self.mailbox,
            addresses: self.addresses.clone(),
            text: if self.kind.is_mms() {
                None
            } else {
                self.text.clone()
            },
            subject: self.subject.clone(),
            sim: self.sim,
            port: self.port,
            timestamp: self.timestamp,
        }
    }

    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn mailbox(&self) -> Mailbox {
        self.mailbox
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn sim_id(&self) -> SimIndex {
        self.sim
    }

    pub fn set_sim_id(&mut self, sim: SimIndex) {
        self.sim = sim;
    }

    /// Record where and when the store placed this message.
    pub(crate) fn mark_stored(&mut self, id: MessageId, mailbox: Mailbox, at: DateTime<Utc>) {
        self.id = Some(id);
        self.mailbox = mailbox;
        self.timestamp = Some(at);
    }

    // ── Addresses ───────────────────────────────────────────────

    /// Add a recipient. SMS recipients are always `To`.
    pub fn add_address(&mut self, address: &str, recipient_type: RecipientType) -> Result<()> {
        if address.is_empty() {
            return Err(MessagesError::invalid("address is empty"));
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(MessagesError::invalid(format!(
                "address is {} bytes, maximum is {MAX_ADDRESS_LEN}",
                address.len()
            )));
        }
        if self.addresses.len() >= MAX_RECIPIENTS {
            return Err(MessagesError::invalid(format!(
                "a message can have at most {MAX_RECIPIENTS} recipients"
            )));
        }

        let recipient = if self.kind.is_sms() {
            Recipient {
                address: address.to_string(),
                recipient_type: RecipientType::To,
                address_type: None,
            }
        } else if self.kind.is_mms() {
            Recipient {
                address: address.to_string(),
                recipient_type,
                address_type: Some(AddressType::detect(address)),
            }
        } else {
            return Err(MessagesError::invalid("the message type is unknown"));
        };

        self.addresses.push(recipient);
        Ok(())
    }

    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn address(&self, index: usize) -> Option<&Recipient> {
        self.addresses.get(index)
    }

    pub fn addresses(&self) -> &[Recipient] {
        &self.addresses
    }

    pub fn remove_all_addresses(&mut self) {
        self.addresses.clear();
    }

    // ── Text ────────────────────────────────────────────────────

    /// Set the text. SMS text is limited to [`MAX_SMS_TEXT_LEN`] characters.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if self.kind.is_sms() {
            let len = text.chars().count();
            if len > MAX_SMS_TEXT_LEN {
                return Err(MessagesError::invalid(format!(
                    "SMS text is {len} characters, maximum is {MAX_SMS_TEXT_LEN}"
                )));
            }
        } else if !self.kind.is_mms() {
            return Err(MessagesError::invalid("the message type is unknown"));
        }
        self.text = Some(text.to_string());
        Ok(())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace the text wholesale, as the body parser does.
    pub(crate) fn replace_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    // ── MMS only ────────────────────────────────────────────────

    fn require_mms(&self) -> Result<()> {
        if self.kind.is_mms() {
            Ok(())
        } else {
            Err(MessagesError::invalid("the message type should be MMS"))
        }
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<()> {
        self.require_mms()?;
        let len = subject.chars().count();
        if len > MAX_SUBJECT_LEN {
            return Err(MessagesError::invalid(format!(
                "subject is {len} characters, maximum is {MAX_SUBJECT_LEN}"
            )));
        }
        self.subject = Some(subject.to_string());
        Ok(())
    }

    pub fn subject(&self) -> Result<Option<&str>> {
        self.require_mms()?;
        Ok(self.subject.as_deref())
    }

    /// Append an attachment. Insertion order is kept.
    pub fn add_attachment(&mut self, media_kind: MediaKind, filepath: &str) -> Result<()> {
        self.require_mms()?;
        self.attachments.push(Attachment::new(media_kind, filepath)?);
        Ok(())
    }

    pub fn attachment_count(&self) -> Result<usize> {
        self.require_mms()?;
        Ok(self.attachments.len())
    }

    /// Attachment at `index`, or `None` past the end.
    pub fn attachment(&self, index: usize) -> Result<Option<&Attachment>> {
        self.require_mms()?;
        Ok(self.attachments.get(index))
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn remove_all_attachments(&mut self) -> Result<()> {
        self.require_mms()?;
        self.attachments.clear();
        Ok(())
    }

    /// Replace the attachment list wholesale, as the body parser does.
    pub(crate) fn replace_attachments(&mut self, attachments: Vec<Attachment>) {
        self.attachments = attachments;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sms_and_mms_can_be_created() {
        assert!(Message::new(MessageKind::Sms).is_ok());
        assert!(Message::new(MessageKind::Mms).is_ok());
        for kind in [
            MessageKind::Unknown,
            MessageKind::Cb,
            MessageKind::Push,
            MessageKind::EtwsPrimary,
        ] {
            assert!(matches!(
                Message::new(kind),
                Err(MessagesError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_sms_recipients_are_always_to() {
        let mut msg = Message::new(MessageKind::Sms).unwrap();
        msg.add_address("+15551234", RecipientType::Cc).unwrap();
        let r = msg.address(0).unwrap();
        assert_eq!(r.recipient_type, RecipientType::To);
        assert_eq!(r.address_type, None);
    }

    #[test]
    fn test_mms_address_type_detection() {
        let mut msg = Message::new(MessageKind::Mms).unwrap();
        msg.add_address("+15551234", RecipientType::To).unwrap();
        msg.add_address("bob@example.com", RecipientType::Bcc).unwrap();
        assert_eq!(msg.address(0).unwrap().address_type, Some(AddressType::Plmn));
        let bob = msg.address(1).unwrap();
        assert_eq!(bob.address_type, Some(AddressType::Email));
        assert_eq!(bob.recipient_type, RecipientType::Bcc);
    }

    #[test]
    fn test_recipient_cap() {
        let mut msg = Message::new(MessageKind::Sms).unwrap();
        for i in 0..MAX_RECIPIENTS {
            msg.add_address(&format!("+1555000{i}"), RecipientType::To)
                .unwrap();
        }
        assert!(msg.add_address("+15559999", RecipientType::To).is_err());
        assert_eq!(msg.address_count(), MAX_RECIPIENTS);

        msg.remove_all_addresses();
        assert_eq!(msg.address_count(), 0);
    }

    #[test]
    fn test_address_length_limit() {
        let mut msg = Message::new(MessageKind::Sms).unwrap();
        assert!(msg.add_address(&"1".repeat(MAX_ADDRESS_LEN + 1), RecipientType::To).is_err());
        assert!(msg.add_address(&"1".repeat(MAX_ADDRESS_LEN), RecipientType::To).is_ok());
        assert!(msg.add_address("", RecipientType::To).is_err());
    }

    #[test]
    fn test_sms_text_limit() {
        let mut msg = Message::new(MessageKind::Sms).unwrap();
        assert!(msg.set_text(&"x".repeat(MAX_SMS_TEXT_LEN)).is_ok());
        assert!(msg.set_text(&"x".repeat(MAX_SMS_TEXT_LEN + 1)).is_err());
        assert_eq!(msg.text().map(str::len), Some(MAX_SMS_TEXT_LEN));
    }

    #[test]
    fn test_mms_text_is_unbounded() {
        let mut msg = Message::new(MessageKind::Mms).unwrap();
        let long = "y".repeat(MAX_SMS_TEXT_LEN * 4);
        msg.set_text(&long).unwrap();
        assert_eq!(msg.text(), Some(long.as_str()));
    }

    #[test]
    fn test_mms_only_operations_reject_sms() {
        let mut msg = Message::new(MessageKind::Sms).unwrap();
        assert!(msg.set_subject("hi").is_err());
        assert!(msg.subject().is_err());
        assert!(msg.add_attachment(MediaKind::Image, "a.jpg").is_err());
        assert!(msg.attachment_count().is_err());
        assert!(msg.attachment(0).is_err());
        assert!(msg.remove_all_attachments().is_err());
    }

    #[test]
    fn test_subject_limit() {
        let mut msg = Message::new(MessageKind::Mms).unwrap();
        assert!(msg.set_subject(&"s".repeat(MAX_SUBJECT_LEN + 1)).is_err());
        msg.set_subject("Holiday").unwrap();
        assert_eq!(msg.subject().unwrap(), Some("Holiday"));
    }

    #[test]
    fn test_attachments_keep_order_and_clear_as_unit() {
        let mut msg = Message::new(MessageKind::Mms).unwrap();
        msg.add_attachment(MediaKind::Audio, "b.amr").unwrap();
        msg.add_attachment(MediaKind::Image, "a.jpg").unwrap();
        assert_eq!(msg.attachment_count().unwrap(), 2);
        assert_eq!(msg.attachment(0).unwrap().unwrap().filepath, "b.amr");
        assert_eq!(msg.attachment(1).unwrap().unwrap().filepath, "a.jpg");
        assert!(msg.attachment(2).unwrap().is_none());

        msg.remove_all_attachments().unwrap();
        assert_eq!(msg.attachment_count().unwrap(), 0);
    }

    #[test]
    fn test_envelope_leaves_out_mms_text() {
        let mut mms = Message::new(MessageKind::Mms).unwrap();
        mms.set_text("in the body").unwrap();
        assert_eq!(mms.envelope().text, None);

        let mut sms = Message::new(MessageKind::Sms).unwrap();
        sms.set_text("inline").unwrap();
        let env = sms.envelope();
        assert_eq!(env.text.as_deref(), Some("inline"));
        assert_eq!(Message::from_envelope(env).text(), Some("inline"));
    }

    #[test]
    fn test_sim_id_survives_envelope() {
        let mut msg = Message::new(MessageKind::Mms).unwrap();
        assert_eq!(msg.sim_id(), SimIndex::Unknown);

        msg.set_sim_id(SimIndex::from_number(2));
        assert_eq!(msg.sim_id(), SimIndex::Sim2);

        let env = msg.envelope();
        assert_eq!(env.sim, SimIndex::Sim2);
        assert_eq!(Message::from_envelope(env).sim_id(), SimIndex::Sim2);
    }

    #[test]
    fn test_sim_from_number() {
        assert_eq!(SimIndex::from_number(1), SimIndex::Sim1);
        assert_eq!(SimIndex::from_number(2), SimIndex::Sim2);
        assert_eq!(SimIndex::from_number(0), SimIndex::Unknown);
        assert_eq!(SimIndex::from_number(3), SimIndex::Unknown);
    }

    #[test]
    fn test_sms_class_kinds() {
        assert!(MessageKind::Cb.is_sms());
        assert!(MessageKind::EtwsSecondary.is_sms());
        assert!(!MessageKind::Mms.is_sms());
        assert!(!MessageKind::Unknown.is_sms());
        assert!(!MessageKind::Unknown.is_mms());
    }
}
