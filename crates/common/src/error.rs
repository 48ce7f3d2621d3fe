//! Error types shared across Clipforge crates.

use std::path::PathBuf;

/// Top-level error type for Clipforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Resolution failure: {message}")]
    Resolution { message: String },

    #[error("Filter compilation error: {message}")]
    Filter { message: String },

    #[error("Encoder invocation failed: {message}")]
    Encoder { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

impl ClipforgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution {
            message: msg.into(),
        }
    }

    pub fn filter(msg: impl Into<String>) -> Self {
        Self::Filter {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

/// Outcome of an operation with a documented soft-fail policy.
///
/// Distinguishes a value the operation genuinely produced from a value it
/// substituted after recovering from a failure. Callers that care only about
/// the value use [`Resolution::into_value`]; callers that must not confuse a
/// fallback with a real success match on the variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The operation produced this value normally.
    Resolved(T),

    /// The operation failed and substituted its documented fallback.
    Fallback { value: T, reason: String },
}

impl<T> Resolution<T> {
    /// Unwrap to the carried value, discarding provenance.
    pub fn into_value(self) -> T {
        match self {
            Resolution::Resolved(value) => value,
            Resolution::Fallback { value, .. } => value,
        }
    }

    /// Borrow the carried value regardless of provenance.
    pub fn value(&self) -> &T {
        match self {
            Resolution::Resolved(value) => value,
            Resolution::Fallback { value, .. } => value,
        }
    }

    /// Whether this outcome is the documented fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}
