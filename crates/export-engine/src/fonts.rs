//! Platform-aware font resolution for drawtext stages.
//!
//! Unix-like platforms address fonts through the system font table by name;
//! Windows has no such lookup for the encoder, so fonts are referenced by
//! explicit file path under the system font directory. Guessing the platform
//! would silently corrupt font file paths, so resolution fails hard when the
//! platform cannot be determined.

use std::path::PathBuf;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_timeline_model::{FontStyle, FontWeight};

/// Target platform for font resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Detect the platform from the compile target.
    pub fn detect() -> ClipforgeResult<Self> {
        if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::MacOs)
        } else if cfg!(target_os = "windows") {
            Ok(Platform::Windows)
        } else {
            Err(ClipforgeError::config(
                "platform could not be determined for font resolution",
            ))
        }
    }
}

/// Resolved font reference for a drawtext stage.
#[derive(Debug, Clone, PartialEq)]
pub enum FontConfig {
    /// Font-table lookup by name (Unix-like platforms). The name may carry a
    /// `:style=...` suffix.
    Fontconfig { name: String },

    /// Explicit font file (Windows).
    File { path: PathBuf },
}

/// Windows font file variants for one family.
struct FontFiles {
    regular: &'static str,
    bold: Option<&'static str>,
    italic: Option<&'static str>,
    bold_italic: Option<&'static str>,
}

const WINDOWS_FONT_DIR: &str = "C:/Windows/Fonts";

fn default_windows_files() -> FontFiles {
    FontFiles {
        regular: "arial.ttf",
        bold: Some("arialbd.ttf"),
        italic: Some("ariali.ttf"),
        bold_italic: Some("arialbi.ttf"),
    }
}

/// Resolve a font family to a platform-appropriate reference.
///
/// The platform must either be supplied explicitly or be detectable from the
/// compile target; anything else is a configuration error.
pub fn resolve_font(
    family: &str,
    weight: FontWeight,
    style: FontStyle,
    platform: Option<Platform>,
) -> ClipforgeResult<FontConfig> {
    let platform = match platform {
        Some(p) => p,
        None => Platform::detect()?,
    };

    let normalized = normalize_family(family);

    match platform {
        Platform::Linux | Platform::MacOs => {
            let base = unix_alias(platform, &normalized)
                .map(str::to_string)
                .unwrap_or(normalized);
            let name = match style_suffix(weight, style) {
                Some(suffix) => format!("{base}:style={suffix}"),
                None => base,
            };
            Ok(FontConfig::Fontconfig { name })
        }
        Platform::Windows => {
            let files = windows_files(&normalized).unwrap_or_else(default_windows_files);
            let file = select_variant(files, weight, style);
            Ok(FontConfig::File {
                path: PathBuf::from(format!("{WINDOWS_FONT_DIR}/{file}")),
            })
        }
    }
}

fn normalize_family(family: &str) -> String {
    family
        .chars()
        .filter(|ch| *ch != '"' && *ch != '\'')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

fn style_suffix(weight: FontWeight, style: FontStyle) -> Option<&'static str> {
    match (weight, style) {
        (FontWeight::Bold, FontStyle::Italic) => Some("Bold Italic"),
        (FontWeight::Bold, FontStyle::Normal) => Some("Bold"),
        (FontWeight::Normal, FontStyle::Italic) => Some("Italic"),
        (FontWeight::Normal, FontStyle::Normal) => None,
    }
}

/// Alias table mapping common Windows family names to native equivalents.
fn unix_alias(platform: Platform, family: &str) -> Option<&'static str> {
    match platform {
        Platform::MacOs => match family {
            "arial" | "helvetica" => Some("Helvetica"),
            "times new roman" => Some("Times"),
            "courier new" => Some("Courier"),
            "comic sans ms" => Some("Comic Sans MS"),
            "impact" => Some("Impact"),
            "georgia" => Some("Georgia"),
            "verdana" => Some("Verdana"),
            "tahoma" => Some("Tahoma"),
            "trebuchet ms" => Some("Trebuchet MS"),
            _ => None,
        },
        Platform::Linux => match family {
            "arial" | "helvetica" => Some("Liberation Sans"),
            "times new roman" => Some("Liberation Serif"),
            "courier new" => Some("Liberation Mono"),
            "comic sans ms" => Some("DejaVu Sans"),
            "impact" => Some("DejaVu Sans"),
            "georgia" => Some("DejaVu Serif"),
            "verdana" => Some("DejaVu Sans"),
            "tahoma" => Some("DejaVu Sans"),
            "trebuchet ms" => Some("DejaVu Sans"),
            _ => None,
        },
        Platform::Windows => None,
    }
}

fn windows_files(family: &str) -> Option<FontFiles> {
    let files = match family {
        "arial" | "helvetica" => FontFiles {
            regular: "arial.ttf",
            bold: Some("arialbd.ttf"),
            italic: Some("ariali.ttf"),
            bold_italic: Some("arialbi.ttf"),
        },
        "times new roman" => FontFiles {
            regular: "times.ttf",
            bold: Some("timesbd.ttf"),
            italic: Some("timesi.ttf"),
            bold_italic: Some("timesbi.ttf"),
        },
        "courier new" => FontFiles {
            regular: "cour.ttf",
            bold: Some("courbd.ttf"),
            italic: Some("couri.ttf"),
            bold_italic: Some("courbi.ttf"),
        },
        "verdana" => FontFiles {
            regular: "verdana.ttf",
            bold: Some("verdanab.ttf"),
            italic: Some("verdanai.ttf"),
            bold_italic: Some("verdanaz.ttf"),
        },
        "georgia" => FontFiles {
            regular: "georgia.ttf",
            bold: Some("georgiab.ttf"),
            italic: Some("georgiai.ttf"),
            bold_italic: Some("georgiaz.ttf"),
        },
        "comic sans ms" => FontFiles {
            regular: "comic.ttf",
            bold: Some("comicbd.ttf"),
            italic: Some("comici.ttf"),
            bold_italic: Some("comicz.ttf"),
        },
        "trebuchet ms" => FontFiles {
            regular: "trebuc.ttf",
            bold: Some("trebucbd.ttf"),
            italic: Some("trebucit.ttf"),
            bold_italic: Some("trebucbi.ttf"),
        },
        "tahoma" => FontFiles {
            regular: "tahoma.ttf",
            bold: Some("tahomabd.ttf"),
            italic: None,
            bold_italic: None,
        },
        "impact" => FontFiles {
            regular: "impact.ttf",
            bold: None,
            italic: None,
            bold_italic: None,
        },
        _ => return None,
    };
    Some(files)
}

/// Most specific matching variant wins; missing variants degrade toward
/// regular.
fn select_variant(files: FontFiles, weight: FontWeight, style: FontStyle) -> &'static str {
    match (weight, style) {
        (FontWeight::Bold, FontStyle::Italic) => files
            .bold_italic
            .or(files.bold)
            .or(files.italic)
            .unwrap_or(files.regular),
        (FontWeight::Bold, FontStyle::Normal) => files.bold.unwrap_or(files.regular),
        (FontWeight::Normal, FontStyle::Italic) => files.italic.unwrap_or(files.regular),
        (FontWeight::Normal, FontStyle::Normal) => files.regular,
    }
}
