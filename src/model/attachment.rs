//! MMS attachments and media-kind inference.
//!
//! The attachment payload itself is never loaded; only its kind and the
//! path of the file on disk travel with the message.

use serde::{Deserialize, Serialize};

use crate::error::{MessagesError, Result};

/// Maximum length in bytes of an attachment file path.
pub const MAX_FILEPATH_LEN: usize = 1024;

/// Kind of media carried by an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Unknown,
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Parse a user-supplied kind name (`image`, `audio`, `video`, `unknown`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "image" | "img" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Lowercase display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Image and video share the visual slot of a page.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Infer the kind of a file from the last four bytes of its path.
    ///
    /// Paths shorter than five bytes are always [`MediaKind::Unknown`].
    /// The suffix is compared as raw bytes, so it may split a multi-byte
    /// character.
    /// See [`MediaInference`] for the two available tables.
    pub fn from_filepath(filepath: &str, inference: MediaInference) -> Self {
        if filepath.len() < 5 {
            return Self::Unknown;
        }
        let bytes = filepath.as_bytes();
        let ext = &bytes[bytes.len() - 4..];
        let listed = |table: &[&[u8; 4]]| table.iter().any(|e| e.as_slice() == ext);

        match inference {
            MediaInference::Literal => {
                if !listed(&IMAGE_EXTENSIONS) {
                    Self::Image
                } else if !listed(&VIDEO_EXTENSIONS) {
                    Self::Video
                } else if !listed(&AUDIO_EXTENSIONS) {
                    Self::Audio
                } else {
                    Self::Unknown
                }
            }
            MediaInference::Extension => {
                if listed(&IMAGE_EXTENSIONS) {
                    Self::Image
                } else if listed(&VIDEO_EXTENSIONS) {
                    Self::Video
                } else if listed(&AUDIO_EXTENSIONS) {
                    Self::Audio
                } else {
                    Self::Unknown
                }
            }
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const IMAGE_EXTENSIONS: [&[u8; 4]; 4] = [b".jpg", b".gif", b".bmp", b".png"];
const VIDEO_EXTENSIONS: [&[u8; 4]; 2] = [b".mp4", b".3gp"];
const AUDIO_EXTENSIONS: [&[u8; 4]; 3] = [b".mid", b".aac", b".amr"];

/// Table used to guess the kind of top-level attachments, whose stored
/// record carries only a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaInference {
    /// The messaging framework's historical table, with every extension
    /// check negated: anything that is *not* `.jpg/.gif/.bmp/.png` is an
    /// image, a known image is a video unless it is also `.mp4/.3gp`, and
    /// so on.
    #[default]
    Literal,
    /// Straight extension lookup: `.jpg` is an image, `.mp4` a video,
    /// `.amr` an audio clip, anything else unknown.
    Extension,
}

/// A file attached to an MMS message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Kind of media the file holds.
    pub media_kind: MediaKind,
    /// Path of the file on disk.
    pub filepath: String,
}

impl Attachment {
    /// Create an attachment, rejecting empty or over-long paths.
    pub fn new(media_kind: MediaKind, filepath: impl Into<String>) -> Result<Self> {
        let filepath = filepath.into();
        if filepath.is_empty() {
            return Err(MessagesError::invalid("attachment path is empty"));
        }
        if filepath.len() > MAX_FILEPATH_LEN {
            return Err(MessagesError::invalid(format!(
                "attachment path is {} bytes, maximum is {MAX_FILEPATH_LEN}",
                filepath.len()
            )));
        }
        Ok(Self {
            media_kind,
            filepath,
        })
    }

    /// Parse a `KIND:PATH` specification such as `image:/tmp/a.jpg`.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let (kind, path) = spec
            .split_once(':')
            .ok_or_else(|| MessagesError::invalid(format!("expected KIND:PATH, got '{spec}'")))?;
        let kind = MediaKind::from_name(kind)
            .ok_or_else(|| MessagesError::invalid(format!("unknown media kind '{kind}'")))?;
        Self::new(kind, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(path: &str) -> MediaKind {
        MediaKind::from_filepath(path, MediaInference::Literal)
    }

    fn by_extension(path: &str) -> MediaKind {
        MediaKind::from_filepath(path, MediaInference::Extension)
    }

    #[test]
    fn test_literal_table_non_image_is_image() {
        assert_eq!(literal("clip.mp4"), MediaKind::Image);
        assert_eq!(literal("song.amr"), MediaKind::Image);
        assert_eq!(literal("report.pdf"), MediaKind::Image);
    }

    #[test]
    fn test_literal_table_image_falls_through_to_video() {
        assert_eq!(literal("photo.jpg"), MediaKind::Video);
        assert_eq!(literal("anim.gif"), MediaKind::Video);
    }

    #[test]
    fn test_literal_table_is_case_sensitive() {
        assert_eq!(literal("PHOTO.JPG"), MediaKind::Image);
    }

    #[test]
    fn test_short_paths_are_unknown() {
        assert_eq!(literal(".jpg"), MediaKind::Unknown);
        assert_eq!(literal("a"), MediaKind::Unknown);
        assert_eq!(by_extension(".mp4"), MediaKind::Unknown);
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(by_extension("photo.jpg"), MediaKind::Image);
        assert_eq!(by_extension("clip.3gp"), MediaKind::Video);
        assert_eq!(by_extension("ring.mid"), MediaKind::Audio);
        assert_eq!(by_extension("notes.txt"), MediaKind::Unknown);
    }

    #[test]
    fn test_non_ascii_suffix_is_compared_bytewise() {
        // The last four bytes start inside a multi-byte character.
        assert_eq!(literal("ab日日"), MediaKind::Image);
        assert_eq!(literal("写真"), MediaKind::Image);
        assert_eq!(by_extension("ab日日"), MediaKind::Unknown);
        assert_eq!(literal("写真.jpg"), MediaKind::Video);
        assert_eq!(by_extension("写真.jpg"), MediaKind::Image);
    }

    #[test]
    fn test_attachment_path_limits() {
        assert!(Attachment::new(MediaKind::Image, "").is_err());
        let long = "a".repeat(MAX_FILEPATH_LEN + 1);
        assert!(Attachment::new(MediaKind::Image, long).is_err());
        let max = "a".repeat(MAX_FILEPATH_LEN);
        assert!(Attachment::new(MediaKind::Image, max).is_ok());
    }

    #[test]
    fn test_parse_spec() {
        let att = Attachment::parse_spec("video:/sdcard/clip.3gp").unwrap();
        assert_eq!(att.media_kind, MediaKind::Video);
        assert_eq!(att.filepath, "/sdcard/clip.3gp");

        assert!(Attachment::parse_spec("/no/kind.jpg").is_err());
        assert!(Attachment::parse_spec("sticker:/a.png").is_err());
    }
}
