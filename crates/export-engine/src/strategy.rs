//! Export strategy analysis and selection.
//!
//! The selector inspects the timeline snapshot once per export and picks one
//! of four mutually exclusive optimization strategies, falling back to full
//! per-frame rendering when none applies.

use clipforge_timeline_model::{
    ElementKind, MediaKind, MediaRegistry, TimelineSnapshot, TrackKind, WordItem,
};
use serde::{Deserialize, Serialize};

use crate::sources::canonical_format;

/// Mutually exclusive encoding optimization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    /// Stream-copy sequential video segments without re-encoding.
    DirectCopy,

    /// Geometry allows concatenation but container formats differ, so the
    /// segments are re-encoded to a consistent format first.
    VideoNormalization,

    /// Exactly one video source with overlays or word cuts: apply filter
    /// chains directly to the video stream, skipping per-frame rendering.
    DirectVideoWithFilters,

    /// One video mixed with image overlays.
    ImageVideoComposite,

    /// Full per-frame rendering fallback.
    FrameRender,
}

impl OptimizationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationStrategy::DirectCopy => "direct_copy",
            OptimizationStrategy::VideoNormalization => "video_normalization",
            OptimizationStrategy::DirectVideoWithFilters => "direct_video_with_filters",
            OptimizationStrategy::ImageVideoComposite => "image_video_composite",
            OptimizationStrategy::FrameRender => "frame_render",
        }
    }
}

/// Computed export summary, derived once per export run from the timeline
/// and registry snapshot.
#[derive(Debug, Clone)]
pub struct ExportAnalysis {
    /// Live count of non-hidden video elements.
    pub video_count: usize,

    pub has_text_overlays: bool,
    pub has_sticker_overlays: bool,
    pub has_image_elements: bool,
    pub has_word_cuts: bool,

    /// Whether any two video elements' timeline windows overlap.
    pub has_overlapping_video: bool,

    /// Whether all video sources share one canonical container format.
    pub video_formats_uniform: bool,

    pub can_use_direct_copy: bool,

    pub optimization_strategy: OptimizationStrategy,
}

/// Analyze the timeline and pick the optimization strategy.
pub fn analyze_export(
    timeline: &TimelineSnapshot,
    registry: &MediaRegistry,
    words: Option<&[WordItem]>,
) -> ExportAnalysis {
    let mut video_windows: Vec<(f64, f64)> = Vec::new();
    let mut video_formats: Vec<Option<String>> = Vec::new();
    let mut has_text_overlays = false;
    let mut has_sticker_overlays = false;
    let mut has_image_elements = false;

    for track in &timeline.tracks {
        for element in track.elements.iter().filter(|e| !e.hidden) {
            match &element.kind {
                ElementKind::Media(media_ref) if track.kind == TrackKind::Media => {
                    let item = registry.get(&media_ref.media_id);
                    // Unregistered media on a media track is counted as
                    // video; hydration happens later in extraction.
                    let is_video = item.map_or(true, |i| i.kind == MediaKind::Video);
                    if is_video {
                        video_windows.push(element.window());
                        video_formats
                            .push(item.and_then(|i| i.format.as_deref().map(canonical_format)));
                    }
                }
                ElementKind::Media(_) => {}
                ElementKind::Text(_) | ElementKind::Markdown(_) => has_text_overlays = true,
                ElementKind::Sticker(_) => has_sticker_overlays = true,
                ElementKind::Image(_) => has_image_elements = true,
            }
        }
    }

    let has_word_cuts = words
        .map(|words| words.iter().any(|w| w.filter_state.is_removed()))
        .unwrap_or(false);

    video_windows.sort_by(|a, b| a.0.total_cmp(&b.0));
    let has_overlapping_video = video_windows
        .windows(2)
        .any(|pair| pair[1].0 < pair[0].1 - 1e-9);

    let video_formats_uniform = video_windows.len() <= 1
        || (video_formats.iter().all(Option::is_some)
            && video_formats.windows(2).all(|pair| pair[0] == pair[1]));

    let has_overlays = has_text_overlays || has_sticker_overlays || has_image_elements;
    let can_use_direct_copy = !video_windows.is_empty()
        && !has_overlapping_video
        && !has_overlays
        && !has_word_cuts
        && video_formats_uniform;

    let mut analysis = ExportAnalysis {
        video_count: video_windows.len(),
        has_text_overlays,
        has_sticker_overlays,
        has_image_elements,
        has_word_cuts,
        has_overlapping_video,
        video_formats_uniform,
        can_use_direct_copy,
        optimization_strategy: OptimizationStrategy::FrameRender,
    };
    analysis.optimization_strategy = select_strategy(&analysis);
    analysis
}

/// Strategy precedence: direct-video-with-filters, then one-video image
/// composite, then direct copy, then normalization, then the per-frame
/// fallback.
pub fn select_strategy(analysis: &ExportAnalysis) -> OptimizationStrategy {
    if analysis.video_count == 1
        && (analysis.has_text_overlays || analysis.has_sticker_overlays || analysis.has_word_cuts)
    {
        return OptimizationStrategy::DirectVideoWithFilters;
    }

    if analysis.video_count == 1 && analysis.has_image_elements {
        return OptimizationStrategy::ImageVideoComposite;
    }

    if analysis.can_use_direct_copy {
        return OptimizationStrategy::DirectCopy;
    }

    let has_overlays = analysis.has_text_overlays
        || analysis.has_sticker_overlays
        || analysis.has_image_elements;
    if analysis.video_count >= 1
        && !analysis.has_overlapping_video
        && !has_overlays
        && !analysis.has_word_cuts
    {
        return OptimizationStrategy::VideoNormalization;
    }

    OptimizationStrategy::FrameRender
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_timeline_model::{
        CanvasSize, MediaItem, MediaRef, StickerAsset, StickerElement, TextAlign, TextElement,
        TimelineElement, Track, WordFilterState,
    };
    use std::path::PathBuf;

    fn media_item(id: &str, format: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            kind: MediaKind::Video,
            name: format!("{id}.{format}"),
            local_path: Some(PathBuf::from(format!("/m/{id}.{format}"))),
            url: None,
            width: Some(1920),
            height: Some(1080),
            duration: Some(20.0),
            content_type: None,
            format: Some(format.to_string()),
        }
    }

    fn media_element(id: &str, media_id: &str, start: f64, duration: f64) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            start_time: start,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            kind: ElementKind::Media(MediaRef {
                media_id: media_id.to_string(),
                muted: false,
            }),
        }
    }

    fn text_element(id: &str) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            start_time: 0.0,
            duration: 3.0,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            kind: ElementKind::Text(TextElement {
                content: "caption".to_string(),
                font_family: "Arial".to_string(),
                font_size: 48,
                color: "#ffffff".to_string(),
                background_color: None,
                text_align: TextAlign::Center,
                font_weight: Default::default(),
                font_style: Default::default(),
                x: 0.0,
                y: 0.0,
                opacity: 1.0,
                rotation: 0.0,
            }),
        }
    }

    fn sticker_element(id: &str) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            start_time: 0.0,
            duration: 3.0,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            kind: ElementKind::Sticker(StickerElement {
                asset: StickerAsset {
                    id: id.to_string(),
                    name: String::new(),
                    url: None,
                    local_path: None,
                    content_type: None,
                },
                x: 0.0,
                y: 0.0,
                width: 100,
                height: 100,
                opacity: 1.0,
                rotation: 0.0,
                z_index: 0,
            }),
        }
    }

    fn image_element(id: &str, media_id: &str) -> TimelineElement {
        TimelineElement {
            id: id.to_string(),
            start_time: 0.0,
            duration: 3.0,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            kind: ElementKind::Image(clipforge_timeline_model::ImageElement {
                media_id: media_id.to_string(),
                opacity: 1.0,
            }),
        }
    }

    fn timeline(tracks: Vec<(TrackKind, Vec<TimelineElement>)>) -> TimelineSnapshot {
        TimelineSnapshot {
            tracks: tracks
                .into_iter()
                .enumerate()
                .map(|(i, (kind, elements))| Track {
                    id: format!("track{i}"),
                    kind,
                    muted: false,
                    elements,
                })
                .collect(),
            canvas: CanvasSize {
                width: 1920,
                height: 1080,
            },
            fps: 30,
        }
    }

    #[test]
    fn test_sequential_uniform_videos_take_direct_copy() {
        let timeline = timeline(vec![(
            TrackKind::Media,
            vec![
                media_element("a", "v1", 0.0, 5.0),
                media_element("b", "v2", 5.0, 5.0),
            ],
        )]);
        let registry =
            MediaRegistry::from_items(vec![media_item("v1", "mp4"), media_item("v2", "mp4")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert!(analysis.can_use_direct_copy);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::DirectCopy
        );
    }

    #[test]
    fn test_mixed_formats_take_video_normalization() {
        let timeline = timeline(vec![(
            TrackKind::Media,
            vec![
                media_element("a", "v1", 0.0, 5.0),
                media_element("b", "v2", 5.0, 5.0),
            ],
        )]);
        let registry =
            MediaRegistry::from_items(vec![media_item("v1", "mp4"), media_item("v2", "webm")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert!(!analysis.video_formats_uniform);
        assert!(!analysis.can_use_direct_copy);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::VideoNormalization
        );
    }

    #[test]
    fn test_single_video_with_text_takes_direct_video_with_filters() {
        let timeline = timeline(vec![
            (TrackKind::Media, vec![media_element("a", "v1", 0.0, 5.0)]),
            (TrackKind::Text, vec![text_element("t")]),
        ]);
        let registry = MediaRegistry::from_items(vec![media_item("v1", "mp4")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::DirectVideoWithFilters
        );
        assert!(!analysis.can_use_direct_copy);
    }

    #[test]
    fn test_single_video_with_word_cuts_takes_direct_video_with_filters() {
        let timeline = timeline(vec![(
            TrackKind::Media,
            vec![media_element("a", "v1", 0.0, 5.0)],
        )]);
        let registry = MediaRegistry::from_items(vec![media_item("v1", "mp4")]);
        let words = vec![
            WordItem::new("w1", "um", 1.0, 1.2).with_state(WordFilterState::Ai),
        ];

        let analysis = analyze_export(&timeline, &registry, Some(&words));
        assert!(analysis.has_word_cuts);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::DirectVideoWithFilters
        );
    }

    #[test]
    fn test_single_video_with_images_takes_image_composite() {
        let timeline = timeline(vec![
            (TrackKind::Media, vec![media_element("a", "v1", 0.0, 5.0)]),
            (TrackKind::Media, vec![image_element("i", "img1")]),
        ]);
        let mut image = media_item("img1", "png");
        image.kind = MediaKind::Image;
        let registry = MediaRegistry::from_items(vec![media_item("v1", "mp4"), image]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert!(analysis.has_image_elements);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::ImageVideoComposite
        );
    }

    #[test]
    fn test_overlapping_videos_fall_back_to_frame_render() {
        let timeline = timeline(vec![(
            TrackKind::Media,
            vec![
                media_element("a", "v1", 0.0, 5.0),
                media_element("b", "v2", 3.0, 5.0),
            ],
        )]);
        let registry =
            MediaRegistry::from_items(vec![media_item("v1", "mp4"), media_item("v2", "mp4")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert!(analysis.has_overlapping_video);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::FrameRender
        );
    }

    #[test]
    fn test_multi_video_with_stickers_falls_back_to_frame_render() {
        let timeline = timeline(vec![
            (
                TrackKind::Media,
                vec![
                    media_element("a", "v1", 0.0, 5.0),
                    media_element("b", "v2", 5.0, 5.0),
                ],
            ),
            (TrackKind::Sticker, vec![sticker_element("s")]),
        ]);
        let registry =
            MediaRegistry::from_items(vec![media_item("v1", "mp4"), media_item("v2", "mp4")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::FrameRender
        );
    }

    #[test]
    fn test_hidden_elements_do_not_count() {
        let mut hidden_text = text_element("t");
        hidden_text.hidden = true;
        let timeline = timeline(vec![
            (TrackKind::Media, vec![media_element("a", "v1", 0.0, 5.0)]),
            (TrackKind::Text, vec![hidden_text]),
        ]);
        let registry = MediaRegistry::from_items(vec![media_item("v1", "mp4")]);

        let analysis = analyze_export(&timeline, &registry, None);
        assert!(!analysis.has_text_overlays);
        assert_eq!(analysis.video_count, 1);
        assert_eq!(
            analysis.optimization_strategy,
            OptimizationStrategy::DirectCopy
        );
    }

    #[test]
    fn test_strategy_wire_values() {
        assert_eq!(
            serde_json::to_string(&OptimizationStrategy::DirectVideoWithFilters).unwrap(),
            "\"direct_video_with_filters\""
        );
        assert_eq!(OptimizationStrategy::DirectCopy.as_str(), "direct_copy");
    }
}
