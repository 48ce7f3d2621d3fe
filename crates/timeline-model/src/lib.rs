//! Clipforge Timeline Model
//!
//! Defines the core data contracts consumed by the export compilation engine:
//! - **Elements:** Typed timeline elements (media, text, markdown, sticker, image)
//! - **Tracks:** Ordered element sequences whose index encodes z-order
//! - **Media:** Read-only registry snapshot of imported media items
//! - **Words:** Word-level transcription markers with keep/remove state
//!
//! All timing is in seconds (f64); positions are pixel offsets relative to
//! the canvas center. The export engine only ever reads these types — it
//! never mutates a snapshot it was handed.

pub mod element;
pub mod media;
pub mod project;
pub mod words;

pub use element::*;
pub use media::*;
pub use project::*;
pub use words::*;
