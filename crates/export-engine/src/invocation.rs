//! Export invocation: descriptor assembly and encoder hand-off.
//!
//! `build_export_options` runs extraction, filter compilation, segment
//! calculation, and strategy selection against a timeline snapshot and
//! produces the write-once [`ExportOptions`] descriptor. `run_export` hands
//! the descriptor to an [`EncoderTransport`] and relays the outcome; the
//! encoder process is the single long-running suspension point and is never
//! retried here.

use std::path::PathBuf;
use std::process::Stdio;

use clipforge_common::error::{ClipforgeError, ClipforgeResult, Resolution};
use clipforge_timeline_model::{MediaRegistry, ProjectMeta, TimelineSnapshot, WordItem};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::fonts::Platform;
use crate::graph::{FilterCall, FilterGraph, FilterStage};
use crate::image_overlay::{compile_image_filter, ImageSourceInput};
use crate::segments::{keep_segments_or_full, KeepSegment, SegmentOptions};
use crate::sources::{
    extract_audio_inputs, extract_image_sources, extract_sticker_sources, extract_video_sources,
    AudioFileInput, MediaHydrator, VideoSourceInput,
};
use crate::sticker_overlay::{compile_sticker_filter, StickerSourceForFilter};
use crate::strategy::{analyze_export, OptimizationStrategy};
use crate::text_overlay::{collect_text_overlays, compile_text_filter};

/// Output settings for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,

    /// Encoder quality preset name (e.g. "low", "medium", "high").
    pub quality: String,
}

/// Everything the compiler needs for one export run. The timeline and
/// registry are read-only snapshots; the engine never reaches into ambient
/// state.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub session_id: String,

    /// Project metadata for log context, when exporting a saved project.
    pub project: Option<ProjectMeta>,

    pub timeline: TimelineSnapshot,

    pub registry: MediaRegistry,

    /// Word-level markers, when transcription ran for this timeline.
    pub words: Option<Vec<WordItem>>,

    pub settings: ExportSettings,

    pub segment_options: SegmentOptions,

    /// Platform for font resolution; `None` means detect from the host.
    pub platform: Option<Platform>,

    /// Export-run scratch directory (rasterized stickers land here).
    pub work_dir: PathBuf,
}

/// The final encoder-facing descriptor.
///
/// Serialized as camelCase JSON for the external process layer. Every
/// optional field signals "not applicable" by being *absent*, never by
/// `null` or an empty value — downstream consumers check for the flag, not
/// for emptiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub session_id: String,

    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub quality: String,

    /// Total timeline duration in seconds.
    pub duration: f64,

    pub audio_files: Vec<AudioFileInput>,

    /// Base video filter chain (scaling/padding/fps) for re-encode paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_chain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_filter_chain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_filter_chain: Option<String>,

    /// Present whenever sticker extraction ran, even when it produced zero
    /// usable stickers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_sources: Option<Vec<StickerSourceForFilter>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_filter_chain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_sources: Option<Vec<ImageSourceInput>>,

    /// True only when no overlay filters and no word-cut segments exist;
    /// overlays and cuts are never compatible with bit-exact stream copy.
    pub use_direct_copy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_sources: Option<Vec<VideoSourceInput>>,

    pub use_video_input: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_input_path: Option<PathBuf>,

    pub trim_start: f64,
    pub trim_end: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_filter_segments: Option<Vec<KeepSegment>>,

    pub optimization_strategy: OptimizationStrategy,
}

/// Compile a timeline snapshot into an encoder invocation descriptor.
pub async fn build_export_options<H: MediaHydrator>(
    request: &ExportRequest,
    hydrator: &H,
) -> ClipforgeResult<ExportOptions> {
    let timeline = &request.timeline;
    let duration = timeline.total_duration();
    let analysis = analyze_export(timeline, &request.registry, request.words.as_deref());

    tracing::info!(
        session = %request.session_id,
        strategy = analysis.optimization_strategy.as_str(),
        videos = analysis.video_count,
        duration_secs = duration,
        "Export analysis complete"
    );

    let video_sources = if analysis.video_count > 0 {
        Some(extract_video_sources(timeline, &request.registry, hydrator).await)
    } else {
        None
    };

    let audio_files = extract_audio_inputs(timeline, &request.registry, hydrator).await;

    let text_filter_chain = if analysis.has_text_overlays {
        let overlays = collect_text_overlays(timeline, request.platform)?;
        let chain = compile_text_filter(&overlays);
        (!chain.is_empty()).then_some(chain)
    } else {
        None
    };

    let (sticker_filter_chain, sticker_sources) = if analysis.has_sticker_overlays {
        let sources = extract_sticker_sources(timeline, &request.work_dir, duration).await;
        let chain = compile_sticker_filter(&sources, duration);
        ((!chain.is_empty()).then_some(chain), Some(sources))
    } else {
        (None, None)
    };

    let video_slots = video_sources
        .as_ref()
        .map(|sources| sources.len())
        .unwrap_or(0)
        .max(1);

    let (image_filter_chain, image_sources) = if analysis.has_image_elements {
        let sources = extract_image_sources(timeline, &request.registry, hydrator).await;
        let chain = compile_image_filter(&sources, timeline.canvas, video_slots);
        ((!chain.is_empty()).then_some(chain), Some(sources))
    } else {
        (None, None)
    };

    let word_filter_segments = if analysis.has_word_cuts {
        let words = request.words.as_deref().unwrap_or_default();
        let segments = match keep_segments_or_full(words, duration, &request.segment_options) {
            Resolution::Resolved(segments) => segments,
            Resolution::Fallback { value, reason } => {
                tracing::warn!(session = %request.session_id, reason = %reason, "Word-filter segments degraded");
                value
            }
        };
        Some(segments)
    } else {
        None
    };

    let strategy = analysis.optimization_strategy;
    let needs_video_input = matches!(
        strategy,
        OptimizationStrategy::DirectVideoWithFilters | OptimizationStrategy::ImageVideoComposite
    );

    let (use_video_input, video_input_path, trim_start, trim_end) = if needs_video_input {
        match video_sources.as_deref() {
            Some([single]) => (
                true,
                Some(single.path.clone()),
                single.trim_start,
                single.trim_end,
            ),
            _ => {
                tracing::warn!(
                    session = %request.session_id,
                    strategy = strategy.as_str(),
                    "Strategy needs a single video input but none resolved; falling back to no video input"
                );
                (false, None, 0.0, 0.0)
            }
        }
    } else {
        (false, None, 0.0, 0.0)
    };

    let use_direct_copy = text_filter_chain.is_none()
        && sticker_filter_chain.is_none()
        && image_filter_chain.is_none()
        && word_filter_segments.is_none();

    let filter_chain = (use_video_input && !use_direct_copy)
        .then(|| base_video_chain(&request.settings));

    Ok(ExportOptions {
        session_id: request.session_id.clone(),
        width: request.settings.width,
        height: request.settings.height,
        fps: request.settings.fps,
        quality: request.settings.quality.clone(),
        duration,
        audio_files,
        filter_chain,
        text_filter_chain,
        sticker_filter_chain,
        sticker_sources,
        image_filter_chain,
        image_sources,
        use_direct_copy,
        video_sources,
        use_video_input,
        video_input_path,
        trim_start,
        trim_end,
        word_filter_segments,
        optimization_strategy: strategy,
    })
}

/// Scale/pad/fps chain normalizing the base video to the output geometry.
fn base_video_chain(settings: &ExportSettings) -> String {
    let mut graph = FilterGraph::new();
    graph.push(
        FilterStage::new()
            .call(
                FilterCall::new("scale")
                    .arg(settings.width.to_string())
                    .arg(settings.height.to_string())
                    .param("force_original_aspect_ratio", "decrease"),
            )
            .call(
                FilterCall::new("pad")
                    .arg(settings.width.to_string())
                    .arg(settings.height.to_string())
                    .arg("(ow-iw)/2")
                    .arg("(oh-ih)/2")
                    .param("color", "black"),
            )
            .call(FilterCall::new("fps").arg(settings.fps.to_string())),
    );
    graph.render()
}

/// Hand-off to the external encoder process.
pub trait EncoderTransport: Send + Sync {
    /// Run the encoder with the given descriptor and return the output file
    /// path. Failures carry whatever diagnostics the transport provides.
    fn invoke(
        &self,
        options: &ExportOptions,
    ) -> impl std::future::Future<Output = ClipforgeResult<PathBuf>> + Send;
}

/// Spawns a configured encoder binary, feeding the descriptor as JSON on
/// stdin and reading the output path from the last stdout line.
#[derive(Debug, Clone)]
pub struct ProcessEncoder {
    binary: PathBuf,
}

impl ProcessEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check whether the encoder binary is reachable.
    pub fn is_available(&self) -> bool {
        if self.binary.is_absolute() {
            return self.binary.exists();
        }
        std::process::Command::new("sh")
            .arg("-c")
            .arg(format!(
                "command -v {} >/dev/null 2>&1",
                self.binary.display()
            ))
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl EncoderTransport for ProcessEncoder {
    async fn invoke(&self, options: &ExportOptions) -> ClipforgeResult<PathBuf> {
        let payload = serde_json::to_vec(options)?;

        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--job")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClipforgeError::encoder(format!("failed to start encoder: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipforgeError::encoder("failed to open encoder stdin"))?;
        stdin
            .write_all(&payload)
            .await
            .map_err(|e| ClipforgeError::encoder(format!("failed to write encoder job: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClipforgeError::encoder(format!("failed to wait on encoder: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ClipforgeError::encoder(format!(
                "encoder exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let path = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| {
                ClipforgeError::encoder(format!(
                    "encoder produced no output path; stderr: {}",
                    stderr.trim()
                ))
            })?;
        Ok(PathBuf::from(path))
    }
}

/// Compile the export descriptor, hand it to the encoder, and relay the
/// outcome.
pub async fn run_export<H: MediaHydrator, T: EncoderTransport>(
    request: &ExportRequest,
    hydrator: &H,
    transport: &T,
) -> ClipforgeResult<PathBuf> {
    let started = std::time::Instant::now();
    match &request.project {
        Some(project) => tracing::info!(
            session = %request.session_id,
            project = %project.name,
            project_id = %project.id,
            "Starting export compilation"
        ),
        None => tracing::info!(session = %request.session_id, "Starting export compilation"),
    }

    let options = build_export_options(request, hydrator).await?;
    tracing::info!(
        session = %request.session_id,
        strategy = options.optimization_strategy.as_str(),
        direct_copy = options.use_direct_copy,
        audio_inputs = options.audio_files.len(),
        "Export descriptor assembled"
    );

    let output_path = transport.invoke(&options).await?;
    tracing::info!(
        session = %request.session_id,
        elapsed_secs = started.elapsed().as_secs_f64(),
        output = %output_path.display(),
        "Export finished"
    );
    Ok(output_path)
}
