//! Project document: assets plus timeline in one JSON file.
//!
//! Persistence proper belongs to the editing application; this format
//! exists so tools and tests can hand a complete timeline to the preview
//! core.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::AssetLibrary;
use crate::timeline::Timeline;

/// Current document schema version.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Canvas size stored with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Top-level project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Preview canvas, when the document pins one.
    #[serde(default)]
    pub canvas: Option<CanvasSize>,

    /// Assets referenced by the timeline.
    #[serde(default)]
    pub assets: AssetLibrary,

    /// Tracks and clips.
    #[serde(default)]
    pub timeline: Timeline,
}

impl ProjectDocument {
    /// Create an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: DOCUMENT_VERSION.to_string(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
            canvas: None,
            assets: AssetLibrary::new(),
            timeline: Timeline::new(),
        }
    }

    /// Load a document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DocumentError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document: ProjectDocument =
            serde_json::from_str(&json).map_err(|e| DocumentError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        if document.version != DOCUMENT_VERSION {
            return Err(DocumentError::ValidationError {
                message: format!(
                    "unsupported document version '{}' (expected {DOCUMENT_VERSION})",
                    document.version
                ),
            });
        }
        Ok(document)
    }

    /// Save the document as pretty-printed JSON, refreshing `modified_at`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        self.modified_at = chrono::Utc::now().to_rfc3339();
        let json = serde_json::to_string_pretty(self).map_err(|e| DocumentError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| DocumentError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Report clips whose asset is not in the library.
    ///
    /// Missing assets are not fatal for rendering (the clip shows an error
    /// placeholder), but tools surface them.
    pub fn validate_assets(&self) -> Vec<String> {
        self.timeline
            .all_clips()
            .filter(|clip| !self.assets.contains(&clip.asset_id))
            .map(|clip| format!("clip '{}' references unknown asset '{}'", clip.id, clip.asset_id))
            .collect()
    }
}

/// Errors that can occur when working with documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid document: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetType};
    use crate::clip::Clip;

    fn sample() -> ProjectDocument {
        let mut doc = ProjectDocument::new("Holiday");
        doc.assets
            .insert(Asset::new("beach", AssetType::Image, "beach.png"));
        doc.timeline = Timeline::single_track(vec![
            Clip::new("c1", "beach", 0.0, 4.0),
            Clip::new("c2", "missing", 4.0, 2.0),
        ]);
        doc
    }

    #[test]
    fn test_document_save_and_load() {
        let path = std::env::temp_dir()
            .join("clipdeck_test_document")
            .join("project.json");
        let _ = std::fs::remove_file(&path);

        let mut doc = sample();
        doc.save(&path).unwrap();

        let loaded = ProjectDocument::load(&path).unwrap();
        assert_eq!(loaded.name, "Holiday");
        assert_eq!(loaded.assets.len(), 1);
        assert_eq!(loaded.timeline.clip_count(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_assets_reports_missing() {
        let errors = sample().validate_assets();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let path = std::env::temp_dir().join("clipdeck_test_document_v9.json");
        let mut value = serde_json::to_value(sample()).unwrap();
        value["version"] = serde_json::json!("9.0");
        std::fs::write(&path, value.to_string()).unwrap();

        let err = ProjectDocument::load(&path).unwrap_err();
        assert!(matches!(err, DocumentError::ValidationError { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ProjectDocument::load("/nonexistent/clipdeck/doc.json").unwrap_err();
        assert!(matches!(err, DocumentError::IoError { .. }));
    }
}
