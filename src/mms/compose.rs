//! MMS composition: text + attachments → SMIL layout and body.
//!
//! ```text
//!  no image/video        image/video, no text    image/video + text
//! ┌──────────────┐       ┌──────────────┐        ┌──────────────┐
//! │              │       │              │        │    Image     │  0-50%
//! │     Text     │       │    Image     │        ├──────────────┤
//! │              │       │              │        │     Text     │ 50-100%
//! └──────────────┘       └──────────────┘        └──────────────┘
//! ```
//!
//! One page is always produced. The first image or video and the first
//! audio clip are placed on it; every other attachment is carried as a
//! top-level attachment in its original order.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::error::{MessagesError, Result};
use crate::model::attachment::{Attachment, MediaKind};
use crate::model::body::{
    region_id, BodyAttachment, MediaElement, MmsBody, Page, Region, SmilMediaKind, TextStyle,
};

use super::textfile::{TextFile, TextFileStore};

/// Page duration used unless configured otherwise.
pub const DEFAULT_PAGE_DURATION_MS: u32 = 5440;

/// Builds MMS bodies.
#[derive(Debug, Clone)]
pub struct MmsComposer {
    text_files: TextFileStore,
    page_duration_ms: u32,
}

impl Default for MmsComposer {
    fn default() -> Self {
        Self::new(TextFileStore::default(), DEFAULT_PAGE_DURATION_MS)
    }
}

/// A composed body together with the text file it references.
///
/// Dropping a `Composition` without calling [`Composition::commit`] removes
/// the text file again.
#[derive(Debug)]
pub struct Composition {
    body: MmsBody,
    text_file: Option<TextFile>,
}

impl Composition {
    pub fn body(&self) -> &MmsBody {
        &self.body
    }

    /// Path of the text file written for this body, if any.
    pub fn text_path(&self) -> Option<&Path> {
        self.text_file.as_ref().map(TextFile::path)
    }

    /// Keep the text file on disk and hand out the body.
    ///
    /// Call this only once the body has been accepted by the store.
    pub fn commit(self) -> Result<MmsBody> {
        if let Some(file) = self.text_file {
            file.persist()?;
        }
        Ok(self.body)
    }
}

/// The attachments placed on the page.
struct Selection<'a> {
    visual: Option<&'a Attachment>,
    audio: Option<&'a Attachment>,
}

impl Selection<'_> {
    fn contains(&self, attachment: &Attachment) -> bool {
        let same = |slot: Option<&Attachment>| slot.is_some_and(|s| std::ptr::eq(s, attachment));
        same(self.visual) || same(self.audio)
    }
}

/// Pick the first image-or-video and the first audio attachment.
fn select(attachments: &[Attachment]) -> Selection<'_> {
    Selection {
        visual: attachments.iter().find(|a| a.media_kind.is_visual()),
        audio: attachments
            .iter()
            .find(|a| a.media_kind == MediaKind::Audio),
    }
}

impl MmsComposer {
    pub fn new(text_files: TextFileStore, page_duration_ms: u32) -> Self {
        Self {
            text_files,
            page_duration_ms,
        }
    }

    /// Build a composer from the `[compose]` config section. Text files go
    /// to [`config::text_dir`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TextFileStore::new(config::text_dir(config)),
            config.compose.page_duration_ms,
        )
    }

    /// Compose a body from `text` and `attachments`.
    ///
    /// If the text file cannot be written, the text media element is left
    /// out and composition carries on.
    pub fn compose(&self, text: Option<&str>, attachments: &[Attachment]) -> Result<Composition> {
        let selection = select(attachments);

        let mut body = MmsBody::default();

        body.regions
            .try_reserve_exact(2)
            .map_err(|_| MessagesError::OutOfMemory("regions"))?;
        match (selection.visual, text) {
            (None, _) => {
                body.regions
                    .push(Region::new(region_id::TEXT, 0, 0, 100, 100));
            }
            (Some(_), None) => {
                body.regions
                    .push(Region::new(region_id::IMAGE, 0, 0, 100, 100));
            }
            (Some(_), Some(_)) => {
                body.regions
                    .push(Region::new(region_id::IMAGE, 0, 0, 100, 50));
                body.regions
                    .push(Region::new(region_id::TEXT, 0, 50, 100, 50));
            }
        }

        let mut page = Page {
            duration_ms: self.page_duration_ms,
            media: Vec::new(),
        };
        page.media
            .try_reserve_exact(3)
            .map_err(|_| MessagesError::OutOfMemory("page media"))?;

        if let Some(visual) = selection.visual {
            let kind = match visual.media_kind {
                MediaKind::Video => SmilMediaKind::Video,
                _ => SmilMediaKind::Image,
            };
            page.media
                .push(MediaElement::new(kind, region_id::IMAGE, &visual.filepath));
        }

        // The "Audio" region is referenced but never declared.
        if let Some(audio) = selection.audio {
            page.media.push(MediaElement::new(
                SmilMediaKind::Audio,
                region_id::AUDIO,
                &audio.filepath,
            ));
        }

        let mut text_file = None;
        if let Some(text) = text {
            match self.text_files.save(text) {
                Ok(file) => {
                    page.media.push(MediaElement::text(
                        region_id::TEXT,
                        file.path().to_string_lossy(),
                        TextStyle::default(),
                    ));
                    text_file = Some(file);
                }
                Err(e) => {
                    warn!(error = %e, "Could not write MMS text file; sending without text");
                }
            }
        }

        body.pages
            .try_reserve_exact(1)
            .map_err(|_| MessagesError::OutOfMemory("pages"))?;
        body.pages.push(page);

        let trailing = attachments.iter().filter(|a| !selection.contains(a));
        body.attachments
            .try_reserve_exact(attachments.len())
            .map_err(|_| MessagesError::OutOfMemory("attachments"))?;
        body.attachments.extend(trailing.map(|a| BodyAttachment {
            filepath: a.filepath.clone(),
        }));

        debug!(
            regions = body.regions.len(),
            media = body.pages[0].media.len(),
            attachments = body.attachments.len(),
            "Composed MMS body"
        );

        Ok(Composition { body, text_file })
    }
}
