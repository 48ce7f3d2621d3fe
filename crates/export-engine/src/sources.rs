//! Source extraction.
//!
//! Translates timeline-level references (media IDs, center-relative
//! positions, relative timing) into the pixel/second-resolved,
//! filesystem-resolved descriptors the overlay compilers and strategy
//! selector consume. Media missing from the in-memory registry is hydrated
//! on demand from per-project storage; hydration failures exclude the item
//! with a warning, never abort the export.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_timeline_model::{
    ElementKind, MediaItem, MediaKind, MediaRegistry, StickerAsset, StickerElement,
    TimelineElement, TimelineSnapshot, TrackKind,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::image_overlay::ImageSourceInput;
use crate::sticker_overlay::StickerSourceForFilter;

/// A filter-ready video input descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSourceInput {
    pub path: PathBuf,

    /// Timeline second at which this clip starts.
    pub start_time: f64,

    /// Untrimmed source duration placed on the timeline.
    pub duration: f64,

    pub trim_start: f64,
    pub trim_end: f64,
}

/// A validated audio input descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFileInput {
    pub path: PathBuf,

    pub start_time: f64,

    pub trim_start: f64,
    pub trim_end: f64,

    pub muted: bool,
}

/// Lazy hydration of media items from persistent per-project storage.
///
/// The registry snapshot is read-only; anything it lacks is looked up here.
pub trait MediaHydrator: Send + Sync {
    fn hydrate(
        &self,
        media_id: &str,
    ) -> impl Future<Output = ClipforgeResult<Option<MediaItem>>> + Send;
}

/// Hydrator for callers with no persistent storage (tests, previews).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHydrator;

impl MediaHydrator for NullHydrator {
    async fn hydrate(&self, _media_id: &str) -> ClipforgeResult<Option<MediaItem>> {
        Ok(None)
    }
}

/// Reads `media/{id}.json` documents under a project directory.
#[derive(Debug, Clone)]
pub struct ProjectStorageHydrator {
    project_dir: PathBuf,
}

impl ProjectStorageHydrator {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }
}

impl MediaHydrator for ProjectStorageHydrator {
    async fn hydrate(&self, media_id: &str) -> ClipforgeResult<Option<MediaItem>> {
        let path = self
            .project_dir
            .join("media")
            .join(format!("{media_id}.json"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let item: MediaItem = serde_json::from_str(&content)?;
        Ok(Some(item))
    }
}

/// Registry lookup with hydration fallback and per-run memoization.
pub struct MediaResolver<'a, H> {
    registry: &'a MediaRegistry,
    hydrator: &'a H,
    cache: HashMap<String, Option<MediaItem>>,
}

impl<'a, H: MediaHydrator> MediaResolver<'a, H> {
    pub fn new(registry: &'a MediaRegistry, hydrator: &'a H) -> Self {
        Self {
            registry,
            hydrator,
            cache: HashMap::new(),
        }
    }

    /// Resolve a media id, hydrating from storage when the registry misses.
    /// Failures resolve to `None` after a logged warning.
    pub async fn resolve(&mut self, media_id: &str) -> Option<MediaItem> {
        if let Some(item) = self.registry.get(media_id) {
            return Some(item.clone());
        }
        if let Some(cached) = self.cache.get(media_id) {
            return cached.clone();
        }

        let resolved = match self.hydrator.hydrate(media_id).await {
            Ok(Some(item)) => {
                tracing::debug!(media_id, "Hydrated media item from project storage");
                Some(item)
            }
            Ok(None) => {
                tracing::warn!(media_id, "Media item not found in registry or storage; excluding");
                None
            }
            Err(err) => {
                tracing::warn!(media_id, error = %err, "Media hydration failed; excluding");
                None
            }
        };
        self.cache.insert(media_id.to_string(), resolved.clone());
        resolved
    }
}

/// Extract video input descriptors from the timeline's media tracks.
pub async fn extract_video_sources<H: MediaHydrator>(
    timeline: &TimelineSnapshot,
    registry: &MediaRegistry,
    hydrator: &H,
) -> Vec<VideoSourceInput> {
    let mut resolver = MediaResolver::new(registry, hydrator);
    let mut sources = Vec::new();

    for track in timeline.tracks.iter().filter(|t| t.kind == TrackKind::Media) {
        for element in track.elements.iter().filter(|e| !e.hidden) {
            let ElementKind::Media(media_ref) = &element.kind else {
                continue;
            };
            let Some(item) = resolver.resolve(&media_ref.media_id).await else {
                continue;
            };
            if item.kind != MediaKind::Video {
                continue;
            }
            let Some(path) = item.local_path else {
                tracing::warn!(media_id = %item.id, "Video has no local file; excluding");
                continue;
            };
            sources.push(VideoSourceInput {
                path,
                start_time: element.start_time,
                duration: element.duration,
                trim_start: element.trim_start,
                trim_end: element.trim_end,
            });
        }
    }

    sources
}

/// Extract and validate audio inputs.
///
/// Candidates fan out over parallel existence/stream probes; probes settle
/// together, successes are kept in timeline order, and failures are logged
/// and dropped.
pub async fn extract_audio_inputs<H: MediaHydrator>(
    timeline: &TimelineSnapshot,
    registry: &MediaRegistry,
    hydrator: &H,
) -> Vec<AudioFileInput> {
    let mut resolver = MediaResolver::new(registry, hydrator);
    let mut candidates = Vec::new();

    for track in timeline.tracks.iter() {
        for element in track.elements.iter().filter(|e| !e.hidden) {
            let ElementKind::Media(media_ref) = &element.kind else {
                continue;
            };
            let Some(item) = resolver.resolve(&media_ref.media_id).await else {
                continue;
            };
            if item.kind != MediaKind::Audio {
                continue;
            }
            let Some(path) = item.local_path else {
                tracing::warn!(media_id = %item.id, "Audio has no local file; excluding");
                continue;
            };
            candidates.push(AudioFileInput {
                path,
                start_time: element.start_time,
                trim_start: element.trim_start,
                trim_end: element.trim_end,
                muted: media_ref.muted || track.muted,
            });
        }
    }

    let mut probes = JoinSet::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        probes.spawn(async move {
            match probe_audio_file(&candidate.path).await {
                Ok(()) => Some((idx, candidate)),
                Err(err) => {
                    tracing::warn!(
                        path = %candidate.path.display(),
                        error = %err,
                        "Audio probe failed; excluding"
                    );
                    None
                }
            }
        });
    }

    let mut settled = Vec::new();
    while let Some(joined) = probes.join_next().await {
        if let Ok(Some(entry)) = joined {
            settled.push(entry);
        }
    }
    settled.sort_by_key(|(idx, _)| *idx);
    settled.into_iter().map(|(_, input)| input).collect()
}

/// Probe an audio file for existence and a decodable audio stream.
pub async fn probe_audio_file(path: &Path) -> ClipforgeResult<()> {
    if !path.exists() {
        return Err(ClipforgeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=codec_type",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| ClipforgeError::resolution(format!("ffprobe failed to start: {e}")))?;

    if !output.status.success() {
        return Err(ClipforgeError::resolution(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.lines().any(|line| line.trim() == "audio") {
        Ok(())
    } else {
        Err(ClipforgeError::resolution("file has no audio stream"))
    }
}

/// Extract sticker descriptors: sorted by paint order, timing-resolved,
/// vectors rasterized into the export work dir.
pub async fn extract_sticker_sources(
    timeline: &TimelineSnapshot,
    work_dir: &Path,
    export_duration: f64,
) -> Vec<StickerSourceForFilter> {
    let canvas = timeline.canvas;

    let mut stickers: Vec<(i32, usize, &TimelineElement, &StickerElement)> = Vec::new();
    for (_, _, element) in timeline.visible_elements() {
        if let ElementKind::Sticker(payload) = &element.kind {
            let order = stickers.len();
            stickers.push((payload.z_index, order, element, payload));
        }
    }
    // Lowest z paints first; insertion order breaks ties deterministically.
    stickers.sort_by_key(|(z, order, ..)| (*z, *order));

    let mut sources = Vec::new();
    for (_, _, element, payload) in stickers {
        let (start_time, end_time) = sticker_window(element, export_duration);

        let path = match resolve_sticker_file(payload, work_dir) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(
                    sticker = %payload.asset.id,
                    error = %err,
                    "Sticker source unavailable; skipping"
                );
                continue;
            }
        };

        let x = (canvas.width as f64 / 2.0 + payload.x - payload.width as f64 / 2.0).round() as i64;
        let y =
            (canvas.height as f64 / 2.0 + payload.y - payload.height as f64 / 2.0).round() as i64;

        sources.push(StickerSourceForFilter {
            path,
            x,
            y,
            width: payload.width,
            height: payload.height,
            z_index: payload.z_index,
            opacity: payload.opacity,
            rotation: payload.rotation,
            start_time,
            end_time,
        });
    }

    sources
}

/// Resolve a sticker's active window.
///
/// A zero-length window means timing was deliberately left unset: the
/// sticker spans the whole export, silently. An inverted or non-finite
/// window means the timing lookup itself failed: same fallback, but logged.
fn sticker_window(element: &TimelineElement, export_duration: f64) -> (f64, f64) {
    let (start, end) = element.window();
    if !start.is_finite() || !end.is_finite() || end < start {
        tracing::warn!(
            element = %element.id,
            "Sticker timing lookup failed; defaulting to full export duration"
        );
        return (0.0, export_duration);
    }
    if end - start <= 0.0 {
        return (0.0, export_duration);
    }
    (start, end)
}

/// Whether a sticker asset is a vector (SVG) source, judged by content
/// type, data-URI prefix, or file extension.
pub fn is_svg_source(asset: &StickerAsset) -> bool {
    if asset
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.eq_ignore_ascii_case("image/svg+xml"))
    {
        return true;
    }
    if asset
        .url
        .as_deref()
        .is_some_and(|url| url.starts_with("data:image/svg"))
    {
        return true;
    }
    asset
        .local_path
        .as_deref()
        .and_then(Path::extension)
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn resolve_sticker_file(payload: &StickerElement, work_dir: &Path) -> ClipforgeResult<PathBuf> {
    let asset = &payload.asset;

    if is_svg_source(asset) {
        let data = svg_bytes(asset)?;
        let out_path = work_dir.join(format!("{}.png", asset.id));
        rasterize_svg(&data, payload.width, payload.height, &out_path)?;
        return Ok(out_path);
    }

    let path = asset
        .local_path
        .clone()
        .ok_or_else(|| ClipforgeError::resolution("sticker has no local file"))?;
    if !path.exists() {
        return Err(ClipforgeError::FileNotFound { path });
    }
    Ok(path)
}

fn svg_bytes(asset: &StickerAsset) -> ClipforgeResult<Vec<u8>> {
    if let Some(path) = &asset.local_path {
        return Ok(std::fs::read(path)?);
    }
    if let Some(url) = &asset.url {
        for prefix in ["data:image/svg+xml;utf8,", "data:image/svg+xml,"] {
            if let Some(payload) = url.strip_prefix(prefix) {
                return Ok(payload.as_bytes().to_vec());
            }
        }
    }
    Err(ClipforgeError::resolution(
        "sticker has neither a local copy nor inline SVG data",
    ))
}

/// Rasterize SVG data to a PNG at the sticker's target pixel size. The
/// downstream encoder's vector support is limited, so this always happens
/// before handoff.
fn rasterize_svg(data: &[u8], width: u32, height: u32, out_path: &Path) -> ClipforgeResult<()> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(data, &options)
        .map_err(|e| ClipforgeError::resolution(format!("failed to parse SVG: {e}")))?;

    let width = width.max(1);
    let height = height.max(1);
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ClipforgeError::resolution("failed to allocate raster buffer"))?;

    let size = tree.size();
    let transform = resvg::tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // The raster buffer is premultiplied; the encoder wants straight alpha.
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    let buffer = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| ClipforgeError::resolution("rasterized sticker buffer size mismatch"))?;
    buffer
        .save(out_path)
        .map_err(|e| ClipforgeError::resolution(format!("failed to write rasterized sticker: {e}")))?;
    Ok(())
}

/// Extract image overlay descriptors.
pub async fn extract_image_sources<H: MediaHydrator>(
    timeline: &TimelineSnapshot,
    registry: &MediaRegistry,
    hydrator: &H,
) -> Vec<ImageSourceInput> {
    let mut resolver = MediaResolver::new(registry, hydrator);
    let mut sources = Vec::new();

    for (_, _, element) in timeline.visible_elements() {
        let ElementKind::Image(image) = &element.kind else {
            continue;
        };
        let Some(item) = resolver.resolve(&image.media_id).await else {
            continue;
        };
        if item.kind != MediaKind::Image {
            tracing::warn!(media_id = %item.id, "Image element references non-image media; excluding");
            continue;
        }
        let Some(path) = item.local_path else {
            tracing::warn!(media_id = %item.id, "Image has no local file; excluding");
            continue;
        };
        if let Err(err) = image::image_dimensions(&path) {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Image failed format probing; excluding"
            );
            continue;
        }
        sources.push(ImageSourceInput {
            path,
            start_time: element.start_time,
            duration: element.effective_duration(),
        });
    }

    sources
}

/// Canonicalize a container/format name for comparisons and filenames
/// (e.g. the JPEG MIME subtype becomes the three-letter extension).
pub fn canonical_format(name: &str) -> String {
    let lowered = name.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "jpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        "tiff" => "tif".to_string(),
        "quicktime" => "mov".to_string(),
        "x-matroska" | "matroska" => "mkv".to_string(),
        _ => lowered,
    }
}
