//! Sprite pool: a bounded free-list of reusable drawable handles.
//!
//! A frame acquires the sprites it draws and hands them back when the next
//! frame starts. Released sprites are reset to defaults and kept for reuse
//! up to the pool capacity; anything beyond that is disposed.

use std::sync::Arc;

use clipdeck_common::config::PoolConfig;
use clipdeck_common::events::PerformanceMode;
use clipdeck_timeline_model::asset::AssetId;
use clipdeck_timeline_model::geometry::Point2D;
use serde::Serialize;

use crate::bitmap::DecodedBitmap;

/// Identity of a sprite for its whole lifetime, across reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpriteId(pub u64);

/// A drawable handle with mutable transform and visual fields.
#[derive(Debug, Clone)]
pub struct Sprite {
    id: SpriteId,
    /// Asset whose texture this sprite shows.
    pub texture_key: Option<AssetId>,
    pub texture: Option<Arc<DecodedBitmap>>,
    /// Canvas position of the anchor point.
    pub position: Point2D,
    /// Normalized anchor within the texture; (0.5, 0.5) is the center.
    pub anchor: Point2D,
    /// Uniform scale applied to the texture size.
    pub scale: f64,
    pub rotation: f64,
    pub alpha: f64,
    /// RGB tint, `0xFFFFFF` for none.
    pub tint: u32,
    pub visible: bool,
    pub z_index: i32,
}

impl Sprite {
    fn new(id: SpriteId) -> Self {
        Self {
            id,
            texture_key: None,
            texture: None,
            position: Point2D::ZERO,
            anchor: Point2D::new(0.5, 0.5),
            scale: 1.0,
            rotation: 0.0,
            alpha: 1.0,
            tint: 0xFF_FF_FF,
            visible: true,
            z_index: 0,
        }
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    /// Restore every mutable field to its default, dropping the texture.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Whether all fields are at their defaults.
    pub fn is_pristine(&self) -> bool {
        self.texture.is_none()
            && self.texture_key.is_none()
            && self.position == Point2D::ZERO
            && self.anchor == Point2D::new(0.5, 0.5)
            && self.scale == 1.0
            && self.rotation == 0.0
            && self.alpha == 1.0
            && self.tint == 0xFF_FF_FF
            && self.visible
            && self.z_index == 0
    }

    /// Texture size in pixels, or zero without a texture.
    pub fn texture_size(&self) -> (f64, f64) {
        self.texture
            .as_ref()
            .map(|t| (t.width() as f64, t.height() as f64))
            .unwrap_or((0.0, 0.0))
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpritePoolStats {
    pub created: u64,
    pub reused: u64,
    pub released: u64,
    pub disposed: u64,
    pub idle: usize,
}

/// Free-list of idle sprites.
#[derive(Debug)]
pub struct SpritePool {
    free: Vec<Sprite>,
    capacity: usize,
    mode: PerformanceMode,
    next_id: u64,
    stats: SpritePoolStats,
}

impl SpritePool {
    /// Create an empty pool keeping at most `capacity` idle sprites.
    pub fn new(capacity: usize) -> Self {
        tracing::info!(capacity, "sprite pool created");
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            mode: PerformanceMode::Normal,
            next_id: 0,
            stats: SpritePoolStats::default(),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.sprite_capacity)
    }

    /// Idle-sprite cap for the current mode.
    pub fn effective_capacity(&self) -> usize {
        (self.capacity as f64 * self.mode.capacity_factor()).floor() as usize
    }

    /// Number of idle sprites ready for reuse.
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> SpritePoolStats {
        SpritePoolStats {
            idle: self.free.len(),
            ..self.stats.clone()
        }
    }

    /// Take an idle sprite, or construct one if the free-list is empty.
    pub fn acquire(&mut self) -> Sprite {
        match self.free.pop() {
            Some(sprite) => {
                self.stats.reused += 1;
                sprite
            }
            None => {
                self.next_id += 1;
                self.stats.created += 1;
                Sprite::new(SpriteId(self.next_id))
            }
        }
    }

    /// Reset a sprite and keep it if there is room; otherwise dispose it.
    pub fn release(&mut self, mut sprite: Sprite) {
        self.stats.released += 1;
        if self.free.len() < self.effective_capacity() {
            sprite.reset();
            self.free.push(sprite);
        } else {
            self.stats.disposed += 1;
            tracing::trace!(sprite = sprite.id.0, "sprite disposed");
        }
    }

    /// Switch mode, disposing idle sprites beyond the new cap.
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        self.mode = mode;
        let cap = self.effective_capacity();
        if self.free.len() > cap {
            let excess = self.free.len() - cap;
            self.free.truncate(cap);
            self.stats.disposed += excess as u64;
        }
    }

    /// Dispose every idle sprite.
    pub fn clear(&mut self) {
        self.stats.disposed += self.free.len() as u64;
        self.free.clear();
    }

    pub fn shutdown(&mut self) {
        self.clear();
        tracing::info!(created = self.stats.created, "sprite pool shut down");
    }
}
