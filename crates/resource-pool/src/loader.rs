//! Texture loading seam.
//!
//! The texture pool is the only caller of a [`TextureLoader`]. Loads are
//! asynchronous and may fail; the pool caches failures and retries later.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clipdeck_common::error::{ClipdeckError, ClipdeckResult};
use clipdeck_timeline_model::asset::{Asset, AssetType};

use crate::bitmap::{DecodedBitmap, MAX_SURFACE_DIMENSION};

/// Fetches and decodes the picture for an asset.
#[async_trait]
pub trait TextureLoader: Send + Sync {
    /// Fetch and decode. Errors cover network, I/O and decode failures.
    async fn load(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap>;

    /// Release device resources backing a bitmap leaving the pool.
    ///
    /// Called synchronously on eviction, clear and shutdown.
    fn release(&self, _asset_id: &str, _bitmap: &DecodedBitmap) {}
}

/// Loads assets from the local filesystem.
///
/// Images are decoded with the `image` crate. Video assets have no frame
/// decoder here; they load as a blank surface sized from their filmstrip
/// metadata (or size hints) so layout is still correct.
#[derive(Debug, Clone)]
pub struct FileTextureLoader {
    root: PathBuf,
}

impl FileTextureLoader {
    /// Resolve relative source paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, source_url: &str) -> PathBuf {
        let trimmed = source_url.strip_prefix("file://").unwrap_or(source_url);
        let path = Path::new(trimmed);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn load_image(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap> {
        let path = self.resolve(&asset.source_url);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            ClipdeckError::asset_load(&asset.id, format!("cannot read {}: {e}", path.display()))
        })?;

        let asset_id = asset.id.clone();
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| ClipdeckError::asset_load(&asset_id, format!("decode task failed: {e}")))?
            .map_err(|e| ClipdeckError::asset_load(&asset_id, format!("decode failed: {e}")))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedBitmap::from_rgba(width, height, rgba.into_raw())
            .ok_or_else(|| ClipdeckError::asset_load(&asset.id, "decoded buffer size mismatch"))
    }

    fn video_surrogate(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap> {
        let size = asset
            .filmstrip
            .map(|f| (f.frame_width, f.frame_height))
            .or_else(|| asset.width.zip(asset.height));
        match size {
            Some((w, h)) if w > 0 && h > 0 => DecodedBitmap::try_blank(w, h).ok_or_else(|| {
                ClipdeckError::asset_load(
                    &asset.id,
                    format!("video frame size {w}x{h} exceeds the {MAX_SURFACE_DIMENSION}px surface limit"),
                )
            }),
            _ => Err(ClipdeckError::asset_load(
                &asset.id,
                "video asset has no filmstrip or size metadata",
            )),
        }
    }
}

#[async_trait]
impl TextureLoader for FileTextureLoader {
    async fn load(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap> {
        tracing::debug!(asset_id = %asset.id, source = %asset.source_url, "loading texture");
        match asset.asset_type {
            AssetType::Image => self.load_image(asset).await,
            AssetType::Video => self.video_surrogate(asset),
            AssetType::Audio => Err(ClipdeckError::unsupported(format!(
                "audio asset '{}' has no picture",
                asset.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipdeck_timeline_model::asset::Filmstrip;

    #[test]
    fn test_resolve_strips_file_scheme() {
        let loader = FileTextureLoader::new("/media");
        assert_eq!(loader.resolve("file:///abs/a.png"), PathBuf::from("/abs/a.png"));
        assert_eq!(loader.resolve("rel/a.png"), PathBuf::from("/media/rel/a.png"));
    }

    #[tokio::test]
    async fn test_video_surrogate_uses_filmstrip_size() {
        let loader = FileTextureLoader::new(".");
        let mut asset = Asset::new("v1", AssetType::Video, "clip.mp4");
        asset.filmstrip = Some(Filmstrip {
            frame_count: 10,
            frame_width: 160,
            frame_height: 90,
        });
        let bitmap = loader.load(&asset).await.unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (160, 90));
    }

    #[tokio::test]
    async fn test_oversized_filmstrip_is_load_error() {
        let loader = FileTextureLoader::new(".");
        let mut asset = Asset::new("v2", AssetType::Video, "clip.mp4");
        asset.filmstrip = Some(Filmstrip {
            frame_count: 1,
            frame_width: u32::MAX,
            frame_height: u32::MAX,
        });
        let err = loader.load(&asset).await.unwrap_err();
        assert!(matches!(err, ClipdeckError::AssetLoad { .. }));
    }

    #[tokio::test]
    async fn test_audio_is_refused() {
        let loader = FileTextureLoader::new(".");
        let asset = Asset::new("a1", AssetType::Audio, "song.wav");
        assert!(loader.load(&asset).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_image_is_load_error() {
        let loader = FileTextureLoader::new(std::env::temp_dir());
        let asset = Asset::new("i1", AssetType::Image, "clipdeck-does-not-exist.png");
        let err = loader.load(&asset).await.unwrap_err();
        assert!(matches!(err, ClipdeckError::AssetLoad { .. }));
    }

    #[tokio::test]
    async fn test_decodes_png_from_disk() {
        let path = std::env::temp_dir().join("clipdeck_loader_test.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let loader = FileTextureLoader::new(std::env::temp_dir());
        let asset = Asset::new("red", AssetType::Image, "clipdeck_loader_test.png");
        let bitmap = loader.load(&asset).await.unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 3));
        assert_eq!(&bitmap.pixels()[..4], &[255, 0, 0, 255]);

        std::fs::remove_file(&path).ok();
    }
}
