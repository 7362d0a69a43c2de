//! Declarative frame output.
//!
//! A [`Scene`] is the full list of drawables for one query time. A thin
//! adapter reconciles it against whatever retained renderer the host uses.

use std::collections::BTreeSet;

use clipdeck_common::config::CanvasConfig;
use clipdeck_common::events::PerformanceMode;
use clipdeck_resource_pool::sprite::{Sprite, SpriteId};
use clipdeck_timeline_model::asset::AssetId;
use clipdeck_timeline_model::clip::ClipId;
use clipdeck_timeline_model::geometry::{Bounds, Point2D};
use serde::Serialize;

use crate::text::TextStyle;

/// Preview canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.width / 2.0, self.height / 2.0)
    }
}

impl From<&CanvasConfig> for Canvas {
    fn from(config: &CanvasConfig) -> Self {
        Self::new(config.width as f64, config.height as f64)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::from(&CanvasConfig::default())
    }
}

/// Clips the host has selected. Only used to draw highlight borders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection(BTreeSet<ClipId>);

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(clip_id: impl Into<ClipId>) -> Self {
        Self(BTreeSet::from([clip_id.into()]))
    }

    pub fn insert(&mut self, clip_id: impl Into<ClipId>) {
        self.0.insert(clip_id.into());
    }

    pub fn contains(&self, clip_id: &str) -> bool {
        self.0.contains(clip_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipId> {
        self.0.iter()
    }
}

impl FromIterator<ClipId> for Selection {
    fn from_iter<I: IntoIterator<Item = ClipId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A textured quad backed by a pooled sprite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteNode {
    pub sprite_id: SpriteId,
    pub clip_id: ClipId,
    pub asset_id: AssetId,
    /// Canvas position of the texture center.
    pub position: Point2D,
    pub scale: f64,
    pub alpha: f64,
    pub z_index: i32,
    /// On-canvas extent after scaling.
    pub bounds: Bounds,
}

impl SpriteNode {
    pub(crate) fn from_sprite(sprite: &Sprite, clip_id: &str) -> Self {
        let (width, height) = sprite.texture_size();
        Self {
            sprite_id: sprite.id(),
            clip_id: clip_id.to_string(),
            asset_id: sprite.texture_key.clone().unwrap_or_default(),
            position: sprite.position,
            scale: sprite.scale,
            alpha: sprite.alpha,
            z_index: sprite.z_index,
            bounds: Bounds::centered(sprite.position, width * sprite.scale, height * sprite.scale),
        }
    }
}

/// A caption. Destroyed and rebuilt every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    pub clip_id: ClipId,
    pub text: String,
    pub position: Point2D,
    pub alpha: f64,
    pub style: TextStyle,
    pub z_index: i32,
}

/// Highlight drawn around a selected clip's sprite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionBorder {
    pub clip_id: ClipId,
    pub bounds: Bounds,
    /// Pulsing highlight; off in minimal mode.
    pub animated: bool,
}

/// Why a placeholder message is shown instead of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    NoClip,
    AssetNotFound,
    AssetLoading,
    AssetLoadFailed,
    AudioOnly,
}

impl PlaceholderKind {
    /// Whether this placeholder reports a problem rather than a state.
    pub fn is_error(self) -> bool {
        matches!(self, Self::AssetNotFound | Self::AssetLoadFailed)
    }
}

/// Centered text shown in place of a sprite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub kind: PlaceholderKind,
    /// Clip the message is about; `None` for an empty frame.
    pub clip_id: Option<ClipId>,
    pub text: String,
    pub position: Point2D,
}

/// One primitive in a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Drawable {
    Sprite(SpriteNode),
    Text(TextNode),
    Border(SelectionBorder),
    Message(StatusMessage),
}

/// Everything drawn for one query time, in draw order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub time: f64,
    pub mode: PerformanceMode,
    pub drawables: Vec<Drawable>,
}

impl Scene {
    pub fn new(time: f64, mode: PerformanceMode) -> Self {
        Self {
            time,
            mode,
            drawables: Vec::new(),
        }
    }

    pub fn push(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn sprites(&self) -> impl Iterator<Item = &SpriteNode> {
        self.drawables.iter().filter_map(|d| match d {
            Drawable::Sprite(node) => Some(node),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextNode> {
        self.drawables.iter().filter_map(|d| match d {
            Drawable::Text(node) => Some(node),
            _ => None,
        })
    }

    pub fn borders(&self) -> impl Iterator<Item = &SelectionBorder> {
        self.drawables.iter().filter_map(|d| match d {
            Drawable::Border(border) => Some(border),
            _ => None,
        })
    }

    pub fn messages(&self) -> impl Iterator<Item = &StatusMessage> {
        self.drawables.iter().filter_map(|d| match d {
            Drawable::Message(message) => Some(message),
            _ => None,
        })
    }

    /// Sprite drawn for a clip, if any.
    pub fn sprite_for(&self, clip_id: &str) -> Option<&SpriteNode> {
        self.sprites().find(|s| s.clip_id == clip_id)
    }

    /// Kind of the first placeholder message, if any.
    pub fn placeholder(&self) -> Option<PlaceholderKind> {
        self.messages().next().map(|m| m.kind)
    }

    /// One-line description for logs and the CLI.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .sprites()
            .map(|s| format!("{}@{:.2}", s.clip_id, s.alpha))
            .collect();
        let texts = self.texts().count();
        if texts > 0 {
            parts.push(format!("{texts} text"));
        }
        if self.borders().next().is_some() {
            parts.push("selected".to_string());
        }
        parts.extend(self.messages().map(|m| format!("[{}]", m.text)));
        if parts.is_empty() {
            parts.push("(empty)".to_string());
        }
        format!("t={:.3}s {} {}", self.time, self.mode, parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_center() {
        assert_eq!(Canvas::default().center(), Point2D::new(960.0, 540.0));
    }

    #[test]
    fn test_selection() {
        let mut selection = Selection::single("a");
        selection.insert("b");
        assert!(selection.contains("a") && selection.contains("b"));
        assert!(!selection.contains("c"));
        assert!(Selection::none().is_empty());
    }

    #[test]
    fn test_scene_accessors_and_serialization() {
        let mut scene = Scene::new(1.5, PerformanceMode::Normal);
        scene.push(Drawable::Message(StatusMessage {
            kind: PlaceholderKind::NoClip,
            clip_id: None,
            text: "No clip".to_string(),
            position: Point2D::ZERO,
        }));
        assert_eq!(scene.placeholder(), Some(PlaceholderKind::NoClip));
        assert_eq!(scene.sprites().count(), 0);
        assert_eq!(scene.summary(), "t=1.500s normal [No clip]");

        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["drawables"][0]["type"], "message");
        assert_eq!(json["drawables"][0]["kind"], "no_clip");
    }
}
