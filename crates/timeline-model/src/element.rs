//! Timeline elements and tracks.
//!
//! Element kinds form a closed tagged union: unknown `type` values are
//! rejected when a snapshot is deserialized, never later during filter
//! emission.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single element placed on a timeline track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineElement {
    /// Unique element identifier.
    pub id: String,

    /// Position on the timeline, in seconds.
    pub start_time: f64,

    /// Untrimmed length in seconds.
    pub duration: f64,

    /// Seconds trimmed from the head of the source.
    #[serde(default)]
    pub trim_start: f64,

    /// Seconds trimmed from the tail of the source.
    #[serde(default)]
    pub trim_end: f64,

    /// Hidden elements are skipped by every compiler.
    #[serde(default)]
    pub hidden: bool,

    /// Type-specific payload.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl TimelineElement {
    /// Playable length after trims, never negative.
    pub fn effective_duration(&self) -> f64 {
        (self.duration - self.trim_start - self.trim_end).max(0.0)
    }

    /// Timeline second at which the element stops being visible.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.effective_duration()
    }

    /// The `[start, end]` window during which the element is active.
    pub fn window(&self) -> (f64, f64) {
        (self.start_time, self.end_time())
    }
}

/// Type-specific element payload. Closed union: deserializing an unknown
/// `type` tag is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// Video or audio clip referencing the media registry.
    Media(MediaRef),

    /// Plain styled text.
    Text(TextElement),

    /// Markdown content, stripped to plain text at compile time.
    Markdown(TextElement),

    /// Sticker overlay with explicit pixel geometry.
    Sticker(StickerElement),

    /// Still-image overlay referencing the media registry.
    Image(ImageElement),
}

/// Reference from a media element to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_id: String,

    #[serde(default)]
    pub muted: bool,
}

/// Styled text content shared by text and markdown elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,

    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Hex color string, with or without a leading `#`.
    #[serde(default = "default_color")]
    pub color: String,

    /// Optional background box color (hex).
    #[serde(default)]
    pub background_color: Option<String>,

    #[serde(default)]
    pub text_align: TextAlign,

    #[serde(default)]
    pub font_weight: FontWeight,

    #[serde(default)]
    pub font_style: FontStyle,

    /// Horizontal offset from canvas center, in pixels.
    #[serde(default)]
    pub x: f64,

    /// Vertical offset from canvas center, in pixels.
    #[serde(default)]
    pub y: f64,

    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f64,
}

/// Sticker overlay payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerElement {
    pub asset: StickerAsset,

    /// Horizontal offset from canvas center, in pixels.
    #[serde(default)]
    pub x: f64,

    /// Vertical offset from canvas center, in pixels.
    #[serde(default)]
    pub y: f64,

    /// Target width in pixels.
    pub width: u32,

    /// Target height in pixels.
    pub height: u32,

    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f64,

    /// Paint order among stickers: lower paints first.
    #[serde(default)]
    pub z_index: i32,
}

/// Source asset behind a sticker element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerAsset {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Remote URL or `data:` URI the asset was imported from.
    #[serde(default)]
    pub url: Option<String>,

    /// On-disk copy, when already downloaded.
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// MIME type reported at import time.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Still-image overlay payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    pub media_id: String,

    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Font weight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Font style flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    48
}

fn default_color() -> String {
    "#ffffff".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

/// Kind of content a track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Media,
    Text,
    Audio,
    Sticker,
}

/// An ordered sequence of elements. Track index within the timeline encodes
/// z-order: lower index paints first (background).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,

    pub kind: TrackKind,

    #[serde(default)]
    pub muted: bool,

    /// Elements in timeline (start-time) order.
    pub elements: Vec<TimelineElement>,
}

/// Output canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Immutable snapshot of a timeline taken at export time.
///
/// The export engine never mutates a snapshot; all derived artifacts are
/// export-run-scoped copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub tracks: Vec<Track>,

    pub canvas: CanvasSize,

    pub fps: u32,
}

impl TimelineSnapshot {
    /// Total timeline duration: the latest end among non-hidden elements.
    pub fn total_duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|track| track.elements.iter())
            .filter(|element| !element.hidden)
            .map(|element| element.end_time())
            .fold(0.0, f64::max)
    }

    /// Iterate non-hidden elements in layering order:
    /// (track index ascending, element index ascending).
    pub fn visible_elements(&self) -> impl Iterator<Item = (usize, usize, &TimelineElement)> + '_ {
        self.tracks.iter().enumerate().flat_map(|(track_idx, track)| {
            track
                .elements
                .iter()
                .enumerate()
                .filter(|(_, element)| !element.hidden)
                .map(move |(element_idx, element)| (track_idx, element_idx, element))
        })
    }
}
