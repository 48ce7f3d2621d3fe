//! Image overlay filter compilation.
//!
//! Images inherit their geometry from the export canvas: each one is scaled
//! to fit inside the canvas preserving aspect ratio, padded to exact canvas
//! dimensions (letterbox/pillarbox), shifted forward to its timeline start,
//! and overlaid at the origin during its active window.
//!
//! Image input slots begin after all video input slots; the offset is an
//! explicit parameter and is independent from sticker slot numbering — the
//! two overlay families are never mixed into one input-index space.

use std::path::PathBuf;

use clipforge_timeline_model::CanvasSize;
use serde::{Deserialize, Serialize};

use crate::graph::{format_number, FilterCall, FilterGraph, FilterStage};

/// A filter-ready image descriptor produced by source extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSourceInput {
    pub path: PathBuf,

    /// Timeline second at which the image appears.
    pub start_time: f64,

    /// Seconds the image stays visible.
    pub duration: f64,
}

/// Compile the image overlay chain.
///
/// `input_offset` is the first encoder input slot holding an image (the slot
/// right after the video inputs). An empty image list yields the empty
/// string.
pub fn compile_image_filter(
    images: &[ImageSourceInput],
    canvas: CanvasSize,
    input_offset: usize,
) -> String {
    let mut graph = FilterGraph::new();

    for (idx, image) in images.iter().enumerate() {
        let n = idx + 1;
        let slot = input_offset + idx;
        let prepared = format!("scaled{n}");
        let start = format_number(image.start_time);
        let end = format_number(image.start_time + image.duration);

        graph.push(
            FilterStage::new()
                .input(format!("{slot}:v"))
                .call(
                    FilterCall::new("scale")
                        .arg(canvas.width.to_string())
                        .arg(canvas.height.to_string())
                        .param("force_original_aspect_ratio", "decrease"),
                )
                .call(
                    FilterCall::new("pad")
                        .arg(canvas.width.to_string())
                        .arg(canvas.height.to_string())
                        .arg("(ow-iw)/2")
                        .arg("(oh-ih)/2")
                        .param("color", "black"),
                )
                .call(FilterCall::new("setpts").arg(format!("PTS+{start}/TB")))
                .output(prepared.clone()),
        );

        let base = if idx == 0 {
            "0:v".to_string()
        } else {
            format!("v{idx}")
        };

        let mut stage = FilterStage::new().input(base).input(prepared).call(
            FilterCall::new("overlay")
                .arg("0")
                .arg("0")
                .param("enable", format!("'between(t,{start},{end})'")),
        );
        if idx + 1 < images.len() {
            stage = stage.output(format!("v{n}"));
        }
        graph.push(stage);
    }

    graph.render()
}
