//! Error types shared across Clipdeck crates.

use std::path::PathBuf;

/// Top-level error type for Clipdeck operations.
///
/// Data problems inside a timeline (a clip pointing at an unknown asset,
/// an asset that failed to decode) are not errors at render time; they
/// degrade to placeholders. This type covers the failures that do
/// propagate: loading, configuration, and I/O.
#[derive(Debug, thiserror::Error)]
pub enum ClipdeckError {
    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Failed to load asset {asset_id}: {message}")]
    AssetLoad { asset_id: String, message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

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

/// Result type alias using ClipdeckError.
pub type ClipdeckResult<T> = Result<T, ClipdeckError>;

impl ClipdeckError {
    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn asset_load(asset_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AssetLoad {
            asset_id: asset_id.into(),
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether a later attempt at the same operation could succeed.
    ///
    /// Asset loads and I/O are retried by the texture pool; the rest are
    /// permanent for the given input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AssetLoad { .. } | Self::Io(_))
    }
}
