//! Sticker overlay filter compilation.
//!
//! Stickers arrive geometry-resolved (pixel position and size) and already
//! sorted by paint order. Each sticker becomes a scale stage, an optional
//! rotate stage, an optional per-pixel alpha-multiply stage, and an overlay
//! stage chained onto the previous output. Sticker inputs occupy encoder
//! input slots 1..N; slot 0 is the base video. This numbering is fixed by
//! the invocation's input ordering and must match exactly.

use std::f64::consts::PI;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::graph::{format_number, FilterCall, FilterGraph, FilterStage};

/// A filter-ready sticker descriptor produced by source extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerSourceForFilter {
    /// Concrete raster file on disk (vectors are rasterized beforehand).
    pub path: PathBuf,

    /// Top-left corner in output pixels.
    pub x: i64,
    pub y: i64,

    /// Target size in pixels.
    pub width: u32,
    pub height: u32,

    /// Paint order: lower paints first (visually behind later stickers).
    pub z_index: i32,

    pub opacity: f64,

    /// Rotation in degrees, clockwise.
    pub rotation: f64,

    /// Active window in timeline seconds.
    pub start_time: f64,
    pub end_time: f64,
}

impl StickerSourceForFilter {
    /// Whether the sticker is visible for the whole export.
    fn covers_full_duration(&self, export_duration: f64) -> bool {
        self.start_time <= 1e-9 && self.end_time >= export_duration - 1e-9
    }
}

/// Compile the sticker overlay chain.
///
/// An empty sticker list yields the empty string (a documented no-op, not an
/// error). Inputs are assumed internally consistent; validation is the
/// source extractors' responsibility.
pub fn compile_sticker_filter(
    stickers: &[StickerSourceForFilter],
    export_duration: f64,
) -> String {
    let mut graph = FilterGraph::new();

    for (idx, sticker) in stickers.iter().enumerate() {
        let n = idx + 1;
        let mut current = format!("scaled{n}");

        graph.push(
            FilterStage::new()
                .input(format!("{n}:v"))
                .call(
                    FilterCall::new("scale")
                        .arg(sticker.width.to_string())
                        .arg(sticker.height.to_string()),
                )
                .output(current.clone()),
        );

        // Rotation must precede the alpha multiply: rotating a buffer whose
        // alpha was already premultiplied would halo-clip the edges.
        if sticker.rotation != 0.0 {
            let radians = sticker.rotation * PI / 180.0;
            let rotated = format!("rotated{n}");
            graph.push(
                FilterStage::new()
                    .input(current)
                    .call(
                        FilterCall::new("rotate")
                            .arg(format!("{radians:.6}"))
                            .param("c", "none"),
                    )
                    .output(rotated.clone()),
            );
            current = rotated;
        }

        if sticker.opacity < 1.0 {
            let alpha = format!("alpha{n}");
            graph.push(
                FilterStage::new()
                    .input(current)
                    .call(FilterCall::new("format").arg("rgba"))
                    .call(
                        FilterCall::new("geq")
                            .param("r", "'r(X,Y)'")
                            .param("g", "'g(X,Y)'")
                            .param("b", "'b(X,Y)'")
                            .param("a", format!("'{}*alpha(X,Y)'", format_number(sticker.opacity))),
                    )
                    .output(alpha.clone()),
            );
            current = alpha;
        }

        let base = if idx == 0 {
            "0:v".to_string()
        } else {
            format!("v{idx}")
        };

        let mut overlay = FilterCall::new("overlay")
            .param("x", sticker.x.to_string())
            .param("y", sticker.y.to_string());
        if !sticker.covers_full_duration(export_duration) {
            overlay = overlay.param(
                "enable",
                format!(
                    "'between(t,{},{})'",
                    format_number(sticker.start_time),
                    format_number(sticker.end_time)
                ),
            );
        }

        let mut stage = FilterStage::new().input(base).input(current).call(overlay);
        // The terminal overlay feeds the graph output directly and carries
        // no label.
        if idx + 1 < stickers.len() {
            stage = stage.output(format!("v{n}"));
        }
        graph.push(stage);
    }

    graph.render()
}
