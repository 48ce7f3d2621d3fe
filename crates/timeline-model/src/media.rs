//! Media registry snapshot.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of an imported media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

/// An imported media item as registered by the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,

    pub kind: MediaKind,

    #[serde(default)]
    pub name: String,

    /// On-disk location, when the item has been materialized locally.
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Remote origin, when the item was imported from a URL.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    /// Source duration in seconds (video/audio).
    #[serde(default)]
    pub duration: Option<f64>,

    /// MIME type reported at import time.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Container format (e.g. "mp4", "webm"); used to judge whether
    /// stream-copy concatenation is possible without re-encoding.
    #[serde(default)]
    pub format: Option<String>,
}

/// Read-only snapshot of the in-memory media registry.
///
/// The export engine never inserts into this map; media missing here is
/// hydrated from per-project storage by the source extractors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRegistry {
    items: HashMap<String, MediaItem>,
}

impl MediaRegistry {
    pub fn from_items(items: impl IntoIterator<Item = MediaItem>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| (item.id.clone(), item))
                .collect(),
        }
    }

    pub fn get(&self, media_id: &str) -> Option<&MediaItem> {
        self.items.get(media_id)
    }

    pub fn contains(&self, media_id: &str) -> bool {
        self.items.contains_key(media_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
