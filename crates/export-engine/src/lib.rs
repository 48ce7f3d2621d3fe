//! Clipforge Export Engine
//!
//! Compiles a declarative timeline snapshot into an encoder invocation:
//! an optimization strategy, textual filter-graph chains, and ordered media
//! input lists handed to an external command-line encoder.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline snapshot ──┐
//!                     ├── Source Extraction (video/audio/sticker/image)
//! media registry ─────┘              │
//!                                    ├── Overlay Compilation (text/sticker/image)
//! word markers ──────────────────────┤
//!                                    ├── Keep-Segment Calculation
//!                                    │
//!                                    ├── Strategy Selection
//!                                    ▼
//!                            ExportOptions descriptor
//!                                    │
//!                                    ▼
//!                         external encoder process
//! ```
//!
//! Filter chains are deterministic: the same snapshot always compiles to
//! byte-identical filter text, so export logs diff cleanly and retries are
//! side-effect free.

pub mod escape;
pub mod fonts;
pub mod graph;
pub mod image_overlay;
pub mod invocation;
pub mod segments;
pub mod sources;
pub mod sticker_overlay;
pub mod strategy;
pub mod text_overlay;

pub use invocation::*;
pub use segments::{compute_keep_segments, keep_segments_or_full, KeepSegment, SegmentOptions};
pub use sources::*;
pub use strategy::*;
