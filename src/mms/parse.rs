//! MMS decomposition: stored body → text + attachment list.
//!
//! Parsing is best effort. A media element that cannot be read is skipped
//! with a warning and the rest of the body is still recovered.

use tracing::{debug, warn};

use crate::config::ParseConfig;
use crate::model::attachment::{Attachment, MediaInference, MediaKind};
use crate::model::body::{MmsBody, SmilMediaKind};
use crate::model::message::Message;

use super::textfile::TextFileStore;

/// Text and attachments recovered from a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBody {
    /// Text of every text element, joined with `\n`.
    pub text: Option<String>,
    /// Placed media first (page order), then top-level attachments.
    pub attachments: Vec<Attachment>,
}

/// Reads MMS bodies back into text and attachments.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmsParser {
    inference: MediaInference,
}

impl MmsParser {
    pub fn new(inference: MediaInference) -> Self {
        Self { inference }
    }

    pub fn from_config(config: &ParseConfig) -> Self {
        Self::new(config.media_inference)
    }

    /// Recover text and attachments from `body`.
    pub fn parse(&self, body: &MmsBody) -> ParsedBody {
        let mut parsed = ParsedBody::default();

        for (page_no, page) in body.pages.iter().enumerate() {
            for media in &page.media {
                if media.filepath.is_empty() {
                    warn!(page = page_no, kind = ?media.kind, "Skipping media element without a file");
                    continue;
                }

                if media.kind == SmilMediaKind::Text {
                    let path = std::path::Path::new(&media.filepath);
                    if let Err(e) = TextFileStore::load(path, &mut parsed.text) {
                        warn!(page = page_no, error = %e, "Skipping unreadable MMS text");
                    }
                    continue;
                }

                let media_kind = match media.kind {
                    SmilMediaKind::Image => MediaKind::Image,
                    SmilMediaKind::Video => MediaKind::Video,
                    SmilMediaKind::Audio => MediaKind::Audio,
                    _ => MediaKind::Unknown,
                };
                push_attachment(&mut parsed.attachments, media_kind, &media.filepath);
            }
        }

        for attachment in &body.attachments {
            if attachment.filepath.is_empty() {
                warn!("Skipping top-level attachment without a file");
                continue;
            }
            let media_kind = MediaKind::from_filepath(&attachment.filepath, self.inference);
            push_attachment(&mut parsed.attachments, media_kind, &attachment.filepath);
        }

        debug!(
            pages = body.pages.len(),
            attachments = parsed.attachments.len(),
            has_text = parsed.text.is_some(),
            "Parsed MMS body"
        );

        parsed
    }

    /// Parse `body` and store the result on `message`, replacing its text
    /// and attachments.
    pub fn load_into(&self, body: &MmsBody, message: &mut Message) {
        let parsed = self.parse(body);
        message.replace_text(parsed.text);
        message.replace_attachments(parsed.attachments);
    }
}

fn push_attachment(list: &mut Vec<Attachment>, media_kind: MediaKind, filepath: &str) {
    match Attachment::new(media_kind, filepath) {
        Ok(a) => list.push(a),
        Err(e) => warn!(error = %e, "Skipping attachment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::body::{BodyAttachment, MediaElement, Page, TextStyle};

    fn write_text(dir: &std::path::Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_media_kinds_follow_smil_types() {
        let body = MmsBody {
            pages: vec![Page {
                duration_ms: 5440,
                media: vec![
                    MediaElement::new(SmilMediaKind::Image, "Image", "a.jpg"),
                    MediaElement::new(SmilMediaKind::Video, "Image", "v.3gp"),
                    MediaElement::new(SmilMediaKind::Audio, "Audio", "b.amr"),
                    MediaElement::new(SmilMediaKind::Animation, "Image", "x.svg"),
                ],
            }],
            ..MmsBody::default()
        };

        let parsed = MmsParser::default().parse(&body);
        let kinds: Vec<MediaKind> = parsed.attachments.iter().map(|a| a.media_kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Image,
                MediaKind::Video,
                MediaKind::Audio,
                MediaKind::Unknown
            ]
        );
        assert!(parsed.text.is_none());
    }

    #[test]
    fn test_text_from_several_pages_is_joined() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_text(dir.path(), "p1.txt", "first");
        let second = write_text(dir.path(), "p2.txt", "second");
        let page = |path: &str| Page {
            duration_ms: 5440,
            media: vec![MediaElement::text("Text", path, TextStyle::default())],
        };
        let body = MmsBody {
            pages: vec![page(first.as_str()), page(second.as_str())],
            ..MmsBody::default()
        };

        let parsed = MmsParser::default().parse(&body);
        assert_eq!(parsed.text.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_unreadable_text_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_text(dir.path(), "ok.txt", "kept");
        let body = MmsBody {
            pages: vec![Page {
                duration_ms: 5440,
                media: vec![
                    MediaElement::text("Text", "/nonexistent/gone.txt", TextStyle::default()),
                    MediaElement::new(SmilMediaKind::Image, "Image", ""),
                    MediaElement::new(SmilMediaKind::Image, "Image", "a.jpg"),
                    MediaElement::text("Text", good, TextStyle::default()),
                ],
            }],
            attachments: vec![
                BodyAttachment {
                    filepath: String::new(),
                },
                BodyAttachment {
                    filepath: "doc.pdf".into(),
                },
            ],
            ..MmsBody::default()
        };

        let parsed = MmsParser::default().parse(&body);
        assert_eq!(parsed.text.as_deref(), Some("kept"));
        let paths: Vec<&str> = parsed.attachments.iter().map(|a| a.filepath.as_str()).collect();
        assert_eq!(paths, vec!["a.jpg", "doc.pdf"]);
    }

    #[test]
    fn test_top_level_kind_uses_literal_table_by_default() {
        let body = MmsBody {
            attachments: vec![BodyAttachment {
                filepath: "clip.mp4".into(),
            }],
            ..MmsBody::default()
        };

        let parsed = MmsParser::default().parse(&body);
        assert_eq!(parsed.attachments[0].media_kind, MediaKind::Image);

        let parsed = MmsParser::new(MediaInference::Extension).parse(&body);
        assert_eq!(parsed.attachments[0].media_kind, MediaKind::Video);
    }

    #[test]
    fn test_empty_body() {
        let parsed = MmsParser::default().parse(&MmsBody::default());
        assert_eq!(parsed, ParsedBody::default());
    }

    #[test]
    fn test_load_into_replaces_message_content() {
        use crate::model::message::MessageKind;

        let mut msg = Message::new(MessageKind::Mms).unwrap();
        msg.add_attachment(MediaKind::Audio, "old.amr").unwrap();
        let body = MmsBody {
            attachments: vec![BodyAttachment {
                filepath: "new.pdf".into(),
            }],
            ..MmsBody::default()
        };

        MmsParser::default().load_into(&body, &mut msg);
        assert_eq!(msg.attachment_count().unwrap(), 1);
        assert_eq!(msg.attachment(0).unwrap().unwrap().filepath, "new.pdf");
        assert!(msg.text().is_none());
    }
}
