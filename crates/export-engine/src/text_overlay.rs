//! Text overlay filter compilation.
//!
//! All non-hidden text and markdown elements across all tracks compile into
//! a chain of drawtext stages. Markdown is stripped to plain text first and
//! then shares the text path. Stage order is (track index ascending, element
//! index ascending) — the layering law: background tracks paint first.

use std::f64::consts::PI;

use clipforge_common::error::ClipforgeResult;
use clipforge_timeline_model::{ElementKind, TextAlign, TimelineSnapshot};

use crate::escape::{color_to_ffmpeg, escape_filter_path, escape_filter_text};
use crate::fonts::{resolve_font, FontConfig, Platform};
use crate::graph::{format_number, FilterCall, FilterGraph, FilterStage};

/// A drawtext-ready overlay collected from the timeline.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub font: FontConfig,
    pub font_size: u32,
    pub color: String,
    pub background_color: Option<String>,
    pub align: TextAlign,

    /// Offsets from canvas center, in pixels.
    pub x: f64,
    pub y: f64,

    pub opacity: f64,

    /// Rotation in degrees, clockwise.
    pub rotation: f64,

    /// Active window in timeline seconds, trims applied.
    pub start_time: f64,
    pub end_time: f64,
}

/// Collect drawtext-ready overlays from the timeline in layering order.
///
/// Font resolution requires a determinable platform; this is the one fatal
/// precondition on the text path.
pub fn collect_text_overlays(
    timeline: &TimelineSnapshot,
    platform: Option<Platform>,
) -> ClipforgeResult<Vec<TextOverlay>> {
    let mut overlays = Vec::new();

    for (_, _, element) in timeline.visible_elements() {
        let (text, style) = match &element.kind {
            ElementKind::Text(style) => (style.content.clone(), style),
            ElementKind::Markdown(style) => (strip_markdown(&style.content), style),
            _ => continue,
        };

        let font = resolve_font(&style.font_family, style.font_weight, style.font_style, platform)?;
        let (start_time, end_time) = element.window();

        overlays.push(TextOverlay {
            text,
            font,
            font_size: style.font_size,
            color: style.color.clone(),
            background_color: style.background_color.clone(),
            align: style.text_align,
            x: style.x,
            y: style.y,
            opacity: style.opacity,
            rotation: style.rotation,
            start_time,
            end_time,
        });
    }

    Ok(overlays)
}

/// Compile the text overlay chain. Empty input yields the empty string.
pub fn compile_text_filter(overlays: &[TextOverlay]) -> String {
    let mut graph = FilterGraph::new();

    for (idx, overlay) in overlays.iter().enumerate() {
        let n = idx + 1;
        let base = if idx == 0 {
            "0:v".to_string()
        } else {
            format!("v{idx}")
        };

        let mut call = FilterCall::new("drawtext")
            .param("text", format!("'{}'", escape_filter_text(&overlay.text)));

        call = match &overlay.font {
            FontConfig::Fontconfig { name } => call.param("font", format!("'{name}'")),
            FontConfig::File { path } => call.param(
                "fontfile",
                format!("'{}'", escape_filter_path(&path.to_string_lossy())),
            ),
        };

        call = call
            .param("fontsize", overlay.font_size.to_string())
            .param("fontcolor", color_to_ffmpeg(&overlay.color))
            .param("borderw", "2")
            .param("bordercolor", "black@0.5");

        if overlay.opacity < 1.0 {
            call = call.param("alpha", format_number(overlay.opacity));
        }
        if overlay.rotation != 0.0 {
            let radians = overlay.rotation * PI / 180.0;
            call = call.param("angle", format!("{radians:.6}"));
        }
        if let Some(background) = &overlay.background_color {
            call = call
                .param("box", "1")
                .param("boxcolor", color_to_ffmpeg(background))
                .param("boxborderw", "8");
        }

        call = call
            .param("x", horizontal_anchor(overlay.align, overlay.x))
            .param("y", format!("(h-text_h)/2{}", signed_offset(overlay.y)))
            .param(
                "enable",
                format!(
                    "'between(t,{},{})'",
                    format_number(overlay.start_time),
                    format_number(overlay.end_time)
                ),
            );

        let mut stage = FilterStage::new().input(base).call(call);
        if idx + 1 < overlays.len() {
            stage = stage.output(format!("v{n}"));
        }
        graph.push(stage);
    }

    graph.render()
}

/// Horizontal anchor expression: the alignment decides which edge of the
/// rendered text sits at canvas-center + offset.
fn horizontal_anchor(align: TextAlign, offset: f64) -> String {
    let offset = signed_offset(offset);
    match align {
        TextAlign::Left => format!("w/2{offset}"),
        TextAlign::Center => format!("(w-text_w)/2{offset}"),
        TextAlign::Right => format!("w/2{offset}-text_w"),
    }
}

fn signed_offset(value: f64) -> String {
    if value < 0.0 {
        format!("-{}", format_number(-value))
    } else {
        format!("+{}", format_number(value))
    }
}

/// Strip markdown markup to plain text.
///
/// Handles the constructs the editor's markdown elements actually produce:
/// headings, emphasis, inline code, code fences, links, images, blockquotes,
/// and list markers. Single underscores survive (snake_case identifiers are
/// common in captions).
pub fn strip_markdown(input: &str) -> String {
    let mut out_lines = Vec::new();
    let mut in_fence = false;

    for line in input.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out_lines.push(line.to_string());
            continue;
        }
        out_lines.push(strip_inline(strip_block_prefix(trimmed)));
    }

    out_lines.join("\n")
}

fn strip_block_prefix(line: &str) -> &str {
    let mut rest = line;

    while let Some(stripped) = rest.strip_prefix('>') {
        rest = stripped.trim_start();
    }

    if rest.starts_with('#') {
        rest = rest.trim_start_matches('#').trim_start();
    }

    for marker in ["- ", "* ", "+ "] {
        if let Some(stripped) = rest.strip_prefix(marker) {
            return stripped;
        }
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(stripped) = rest[digits..].strip_prefix(". ") {
            return stripped;
        }
    }

    rest
}

fn strip_inline(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '!' if chars.get(i + 1) == Some(&'[') => {
                if let Some((text, next)) = parse_link(&chars, i + 1) {
                    out.push_str(&text);
                    i = next;
                } else {
                    out.push('!');
                    i += 1;
                }
            }
            '[' => {
                if let Some((text, next)) = parse_link(&chars, i) {
                    out.push_str(&text);
                    i = next;
                } else {
                    out.push('[');
                    i += 1;
                }
            }
            '*' | '`' => i += 1,
            '~' if chars.get(i + 1) == Some(&'~') => i += 2,
            '_' if chars.get(i + 1) == Some(&'_') => i += 2,
            ch => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

/// Parse `[text](url)` starting at the opening bracket; returns the link
/// text (recursively stripped) and the index past the closing paren.
fn parse_link(chars: &[char], open: usize) -> Option<(String, usize)> {
    let mut close = open + 1;
    while close < chars.len() && chars[close] != ']' {
        close += 1;
    }
    if close >= chars.len() || chars.get(close + 1) != Some(&'(') {
        return None;
    }

    let mut paren = close + 2;
    while paren < chars.len() && chars[paren] != ')' {
        paren += 1;
    }
    if paren >= chars.len() {
        return None;
    }

    let text: String = chars[open + 1..close].iter().collect();
    Some((strip_inline(&text), paren + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_timeline_model::{FontStyle, FontWeight};

    fn overlay(text: &str) -> TextOverlay {
        TextOverlay {
            text: text.to_string(),
            font: FontConfig::Fontconfig {
                name: "Liberation Sans".to_string(),
            },
            font_size: 48,
            color: "#ffffff".to_string(),
            background_color: None,
            align: TextAlign::Center,
            x: 0.0,
            y: 0.0,
            opacity: 1.0,
            rotation: 0.0,
            start_time: 0.0,
            end_time: 5.0,
        }
    }

    #[test]
    fn test_basic_drawtext_stage() {
        let chain = compile_text_filter(&[overlay("Hello")]);
        assert!(chain.starts_with("[0:v]drawtext=text='Hello'"));
        assert!(chain.contains("font='Liberation Sans'"));
        assert!(chain.contains("fontsize=48"));
        assert!(chain.contains("fontcolor=0xffffff"));
        assert!(chain.contains("x=(w-text_w)/2+0"));
        assert!(chain.contains("enable='between(t,0,5)'"));
    }

    #[test]
    fn test_text_is_escaped() {
        let chain = compile_text_filter(&[overlay("a:b=c")]);
        assert!(chain.contains("text='a\\:b\\=c'"));
    }

    #[test]
    fn test_alignment_changes_horizontal_anchor() {
        let mut left = overlay("L");
        left.align = TextAlign::Left;
        left.x = 40.0;
        let mut right = overlay("R");
        right.align = TextAlign::Right;
        right.x = -25.0;

        let chain = compile_text_filter(&[left, right]);
        assert!(chain.contains("x=w/2+40"));
        assert!(chain.contains("x=w/2-25-text_w"));
    }

    #[test]
    fn test_opacity_and_rotation_params() {
        let mut faded = overlay("F");
        faded.opacity = 0.6;
        faded.rotation = 90.0;
        let chain = compile_text_filter(&[faded]);
        assert!(chain.contains("alpha=0.6"));
        assert!(chain.contains("angle=1.570796"));
    }

    #[test]
    fn test_background_box_params() {
        let mut boxed = overlay("B");
        boxed.background_color = Some("#202020".to_string());
        let chain = compile_text_filter(&[boxed]);
        assert!(chain.contains("box=1:boxcolor=0x202020:boxborderw=8"));
    }

    #[test]
    fn test_chain_labels_thread_through() {
        let chain = compile_text_filter(&[overlay("a"), overlay("b"), overlay("c")]);
        assert!(chain.contains("[v1];[v1]"));
        assert!(chain.contains("[v2];[v2]"));
        assert!(!chain.contains("[v3]"));
    }

    #[test]
    fn test_empty_input_is_noop() {
        assert_eq!(compile_text_filter(&[]), "");
    }

    #[test]
    fn test_strip_markdown_headings_and_emphasis() {
        assert_eq!(strip_markdown("# Title"), "Title");
        assert_eq!(strip_markdown("**bold** and *italic*"), "bold and italic");
        assert_eq!(strip_markdown("__bold__ and ~~gone~~"), "bold and gone");
    }

    #[test]
    fn test_strip_markdown_links_and_images() {
        assert_eq!(
            strip_markdown("See [the docs](https://example.com)"),
            "See the docs"
        );
        assert_eq!(strip_markdown("![alt text](img.png)"), "alt text");
        assert_eq!(strip_markdown("[**nested**](x)"), "nested");
    }

    #[test]
    fn test_strip_markdown_lists_and_quotes() {
        assert_eq!(strip_markdown("- item\n1. other"), "item\nother");
        assert_eq!(strip_markdown("> quoted"), "quoted");
    }

    #[test]
    fn test_strip_markdown_inline_code_and_fences() {
        assert_eq!(strip_markdown("`code` here"), "code here");
        assert_eq!(strip_markdown("```\nraw\n```"), "raw");
    }

    #[test]
    fn test_strip_markdown_keeps_snake_case() {
        assert_eq!(strip_markdown("use snake_case"), "use snake_case");
    }

    #[test]
    fn test_windows_fontfile_is_path_escaped() {
        let mut win = overlay("W");
        win.font = FontConfig::File {
            path: std::path::PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
        };
        let chain = compile_text_filter(&[win]);
        assert!(chain.contains("fontfile='C\\:/Windows/Fonts/arial.ttf'"));
    }

    #[test]
    fn test_collect_respects_layering_and_resolves_fonts() {
        use clipforge_timeline_model::{
            CanvasSize, TextElement, TimelineElement, Track, TrackKind,
        };

        let text = |content: &str| TextElement {
            content: content.to_string(),
            font_family: "Arial".to_string(),
            font_size: 48,
            color: "#ffffff".to_string(),
            background_color: None,
            text_align: TextAlign::Center,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            x: 0.0,
            y: 0.0,
            opacity: 1.0,
            rotation: 0.0,
        };

        let element = |id: &str, kind: ElementKind| TimelineElement {
            id: id.to_string(),
            start_time: 1.0,
            duration: 4.0,
            trim_start: 0.5,
            trim_end: 0.0,
            hidden: false,
            kind,
        };

        let timeline = TimelineSnapshot {
            tracks: vec![
                Track {
                    id: "back".to_string(),
                    kind: TrackKind::Text,
                    muted: false,
                    elements: vec![element("a", ElementKind::Text(text("behind")))],
                },
                Track {
                    id: "front".to_string(),
                    kind: TrackKind::Text,
                    muted: false,
                    elements: vec![element("b", ElementKind::Markdown(text("# front")))],
                },
            ],
            canvas: CanvasSize {
                width: 1920,
                height: 1080,
            },
            fps: 30,
        };

        let overlays = collect_text_overlays(&timeline, Some(Platform::Linux)).unwrap();
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].text, "behind");
        assert_eq!(overlays[1].text, "front");
        // Trim shortens the active window.
        assert!((overlays[0].start_time - 1.0).abs() < 1e-9);
        assert!((overlays[0].end_time - 4.5).abs() < 1e-9);
    }
}
