//! Geometry primitives for canvas placement.
//!
//! All offsets are in canvas pixels relative to the canvas center, so a
//! zero offset means "centered" regardless of canvas size.

use serde::{Deserialize, Serialize};

/// Linear interpolation with `t` clamped to `[0, 1]`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// A 2D point or offset in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ZERO: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    pub fn offset(&self, by: Point2D) -> Point2D {
        Point2D {
            x: self.x + by.x,
            y: self.y + by.y,
        }
    }

    /// Snap both components to whole pixels.
    pub fn rounded(&self) -> Point2D {
        Point2D {
            x: self.x.round(),
            y: self.y.round(),
        }
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        Point2D {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
        }
    }
}

/// One end of a Ken-Burns move.
///
/// `scale` multiplies the fit-to-canvas base scale; `x`/`y` offset the
/// image center from the canvas center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KenBurnsRect {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl KenBurnsRect {
    /// Centered, unscaled.
    pub const IDENTITY: KenBurnsRect = KenBurnsRect {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    pub fn offset(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Linearly interpolate between two rects.
    pub fn lerp(a: &KenBurnsRect, b: &KenBurnsRect, t: f64) -> KenBurnsRect {
        KenBurnsRect {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
            scale: lerp(a.scale, b.scale, t),
        }
    }
}

impl Default for KenBurnsRect {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned rectangle in absolute canvas pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `center`.
    pub fn centered(center: Point2D, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Grow (or shrink, for negative values) on every side.
    pub fn inflate(&self, by: f64) -> Bounds {
        Bounds {
            x: self.x - by,
            y: self.y - by,
            width: (self.width + by * 2.0).max(0.0),
            height: (self.height + by * 2.0).max(0.0),
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}
