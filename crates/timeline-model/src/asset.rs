//! Media assets referenced by clips.
//!
//! Assets are owned by the surrounding application's asset library and are
//! immutable once loaded. The preview core only reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable asset identifier.
pub type AssetId = String;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
}

impl AssetType {
    /// Whether clips of this asset produce a picture.
    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

/// Filmstrip thumbnail metadata produced by the thumbnail workers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filmstrip {
    /// Number of thumbnails in the strip.
    pub frame_count: u32,
    /// Width of a single thumbnail in pixels.
    pub frame_width: u32,
    /// Height of a single thumbnail in pixels.
    pub frame_height: u32,
}

/// An imported media asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier referenced by clips.
    pub id: AssetId,

    /// Media kind.
    #[serde(rename = "type")]
    pub asset_type: AssetType,

    /// Human-readable label shown in placeholder messages.
    #[serde(default)]
    pub name: String,

    /// Where the media is fetched from (URL or local path).
    pub source_url: String,

    /// Intrinsic media duration in seconds (images have none).
    #[serde(default)]
    pub duration: Option<f64>,

    /// Pixel size hint, when known before decoding.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,

    /// Filmstrip metadata for video assets.
    #[serde(default)]
    pub filmstrip: Option<Filmstrip>,

    /// True while the asset is a stand-in for media still being produced.
    #[serde(default)]
    pub is_placeholder: bool,
}

impl Asset {
    /// Create an asset with only the required fields set.
    pub fn new(
        id: impl Into<AssetId>,
        asset_type: AssetType,
        source_url: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            asset_type,
            source_url: source_url.into(),
            duration: None,
            width: None,
            height: None,
            filmstrip: None,
            is_placeholder: false,
        }
    }

    /// Label for user-facing messages, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Read-only lookup of assets by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Asset>", into = "Vec<Asset>")]
pub struct AssetLibrary {
    assets: BTreeMap<AssetId, Asset>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.id.clone(), asset);
    }

    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate assets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }
}

impl From<Vec<Asset>> for AssetLibrary {
    fn from(assets: Vec<Asset>) -> Self {
        let mut library = AssetLibrary::new();
        for asset in assets {
            library.insert(asset);
        }
        library
    }
}

impl From<AssetLibrary> for Vec<Asset> {
    fn from(library: AssetLibrary) -> Self {
        library.assets.into_values().collect()
    }
}

impl FromIterator<Asset> for AssetLibrary {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let mut library = AssetLibrary::new();
        for asset in iter {
            library.insert(asset);
        }
        library
    }
}
