//! Escaping for the encoder's filter-graph argument grammar.
//!
//! Inside a filter argument, `:` delimits parameters, `,` and `;` separate
//! stages and segments, and `\`, `[`, `]`, `'`, `%`, `=` are otherwise
//! syntactically significant. These functions are total: any input string
//! produces an embeddable output string.

/// Escape arbitrary text for embedding in a filter argument value.
///
/// Backslashes are escaped first (a single pass guarantees later escape
/// insertions are never re-escaped). Newlines become the literal `\n`;
/// carriage returns are dropped since the grammar has no use for them.
pub fn escape_filter_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => {}
            '\n' => out.push_str("\\n"),
            ':' | ',' | ';' | '[' | ']' | '\'' | '%' | '=' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a filesystem path for embedding in a filter argument value.
///
/// Backslash separators are normalized to forward slashes (the encoder
/// accepts them on every platform), then drive-letter colons and quotes are
/// escaped.
pub fn escape_filter_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '\\' => out.push('/'),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out
}

/// Convert a `#rrggbb` hex color to the encoder's `0x` form.
///
/// No validation of the hex payload is performed; malformed input propagates
/// unchanged behind the prefix.
pub fn color_to_ffmpeg(hex: &str) -> String {
    format!("0x{}", hex.strip_prefix('#').unwrap_or(hex))
}
