pub mod frame;
pub mod info;
pub mod play;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipdeck_common::config::AppConfig;
use clipdeck_compositor::{PreviewSession, Selection};
use clipdeck_resource_pool::FileTextureLoader;
use clipdeck_timeline_model::ProjectDocument;

pub(crate) fn load_document(path: &Path) -> anyhow::Result<ProjectDocument> {
    ProjectDocument::load(path).map_err(|e| anyhow::anyhow!("Failed to load document: {e}"))
}

/// Build a preview session whose relative media paths resolve next to the document.
pub(crate) fn open_session(
    mut config: AppConfig,
    path: &Path,
    document: ProjectDocument,
) -> PreviewSession {
    if let Some(canvas) = document.canvas {
        config.canvas.width = canvas.width;
        config.canvas.height = canvas.height;
    }
    let media_root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(media_root = %media_root.display(), "resolving media next to document");
    let loader = Arc::new(FileTextureLoader::new(media_root));
    PreviewSession::new(&config, document.timeline, document.assets, loader)
}

pub(crate) fn selection(ids: Vec<String>) -> Selection {
    ids.into_iter().collect()
}
