//! Structured MMS body: SMIL root layout, regions, pages, media and
//! top-level attachments.
//!
//! This is the exchange format between the composer, the parser and the
//! message store. Text media reference a file on disk rather than carrying
//! the text inline.

use serde::{Deserialize, Serialize};

/// White, used for the canvas and every region.
pub const BACKGROUND_WHITE: u32 = 0xFF_FFFF;

/// Black, used for text media.
pub const TEXT_BLACK: u32 = 0x00_0000;

/// Region identifiers used by composed bodies.
pub mod region_id {
    pub const IMAGE: &str = "Image";
    pub const TEXT: &str = "Text";
    pub const AUDIO: &str = "Audio";
}

/// Complete MMS body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MmsBody {
    /// Canvas the regions are laid out on.
    pub root_layout: RootLayout,
    /// Named rectangles of the canvas, in declaration order.
    pub regions: Vec<Region>,
    /// Timed slides, in presentation order.
    pub pages: Vec<Page>,
    /// Files transported alongside the presentation but not placed on any page.
    pub attachments: Vec<BodyAttachment>,
}

impl MmsBody {
    /// Look up a declared region by id.
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Iterate every media element of every page, in stored order.
    pub fn media(&self) -> impl Iterator<Item = &MediaElement> {
        self.pages.iter().flat_map(|p| p.media.iter())
    }
}

/// SMIL root layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootLayout {
    pub width: u32,
    pub height: u32,
    /// `width` is a percentage rather than pixels.
    pub width_percent: bool,
    /// `height` is a percentage rather than pixels.
    pub height_percent: bool,
    pub bgcolor: u32,
}

impl Default for RootLayout {
    /// Full canvas, 100% × 100%, white.
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            width_percent: true,
            height_percent: true,
            bgcolor: BACKGROUND_WHITE,
        }
    }
}

/// A named rectangle of the canvas. Coordinates are percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub bgcolor: u32,
}

impl Region {
    /// A white region at the given position.
    pub fn new(id: &str, left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            id: id.to_string(),
            left,
            top,
            width,
            height,
            bgcolor: BACKGROUND_WHITE,
        }
    }

    /// `true` if the region covers the whole canvas.
    pub fn is_full_canvas(&self) -> bool {
        self.left == 0 && self.top == 0 && self.width == 100 && self.height == 100
    }
}

/// One timed slide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub duration_ms: u32,
    pub media: Vec<MediaElement>,
}

/// Media type recorded in the SMIL description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmilMediaKind {
    Image,
    Audio,
    Video,
    Text,
    Animation,
    Ref,
}

/// A media element placed on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaElement {
    pub kind: SmilMediaKind,
    /// Region the element is drawn in. May name a region that is not declared.
    pub region_id: String,
    /// File holding the content. For text this is the text file.
    pub filepath: String,
    /// Styling, present on text elements only.
    pub text_style: Option<TextStyle>,
}

impl MediaElement {
    /// A non-text element.
    pub fn new(kind: SmilMediaKind, region_id: &str, filepath: impl Into<String>) -> Self {
        Self {
            kind,
            region_id: region_id.to_string(),
            filepath: filepath.into(),
            text_style: None,
        }
    }

    /// A text element with the given style.
    pub fn text(region_id: &str, filepath: impl Into<String>, style: TextStyle) -> Self {
        Self {
            kind: SmilMediaKind::Text,
            region_id: region_id.to_string(),
            filepath: filepath.into(),
            text_style: Some(style),
        }
    }
}

/// Font size classes understood by the SMIL renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Normal,
    Large,
}

/// Styling of a text media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: u32,
    pub size: FontSize,
    pub bold: bool,
}

impl Default for TextStyle {
    /// Black, normal size, not bold.
    fn default() -> Self {
        Self {
            color: TEXT_BLACK,
            size: FontSize::Normal,
            bold: false,
        }
    }
}

/// A top-level attachment. The record carries only the path; its media kind
/// has to be inferred when the body is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyAttachment {
    pub filepath: String,
}
