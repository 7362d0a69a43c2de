//! Clips and the effects attached to them.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::geometry::{KenBurnsRect, Point2D};

/// Stable clip identifier.
pub type ClipId = String;

fn default_volume() -> f64 {
    1.0
}

/// A placed instance of an asset on a track.
///
/// The clip is active over the half-open interval
/// `[start_time, start_time + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,

    /// Asset this clip plays.
    pub asset_id: AssetId,

    /// Position on the timeline (seconds, >= 0).
    pub start_time: f64,

    /// Length on the timeline (seconds, > 0).
    pub duration: f64,

    /// Playback gain in `[0, 2]`.
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Optional pan/zoom motion across the clip.
    #[serde(default)]
    pub animation: Option<KenBurns>,

    /// Optional transition into the next clip on the same track.
    #[serde(default)]
    pub transition: Option<Transition>,

    /// Captions drawn over the clip.
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
}

impl Clip {
    /// Create a plain clip with no effects.
    pub fn new(
        id: impl Into<ClipId>,
        asset_id: impl Into<AssetId>,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            asset_id: asset_id.into(),
            start_time,
            duration,
            volume: default_volume(),
            animation: None,
            transition: None,
            text_overlays: Vec::new(),
        }
    }

    pub fn with_animation(mut self, animation: KenBurns) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn with_overlay(mut self, overlay: TextOverlay) -> Self {
        self.text_overlays.push(overlay);
        self
    }

    /// Exclusive end of the active interval.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether `t` lies in `[start_time, end_time)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time()
    }

    /// Time since the clip started (may be negative or past the end).
    pub fn relative_time(&self, t: f64) -> f64 {
        t - self.start_time
    }

    /// Closed window `[start, end]` consumed by the outgoing transition.
    pub fn transition_window(&self) -> Option<(f64, f64)> {
        let transition = self.transition.as_ref()?;
        let end = self.end_time();
        Some((end - transition.duration, end))
    }
}

/// Ken-Burns pan/zoom between two rects over a clip's duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KenBurns {
    pub start_rect: KenBurnsRect,
    pub end_rect: KenBurnsRect,
}

impl KenBurns {
    pub fn new(start_rect: KenBurnsRect, end_rect: KenBurnsRect) -> Self {
        Self {
            start_rect,
            end_rect,
        }
    }

    /// Rect at a normalized progress in `[0, 1]`.
    pub fn at(&self, progress: f64) -> KenBurnsRect {
        KenBurnsRect::lerp(&self.start_rect, &self.end_rect, progress)
    }
}

/// Transition flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    CrossDissolve,
}

/// A transition attached to the outgoing clip.
///
/// It consumes the final `duration` seconds of that clip, overlapping the
/// start of the next clip in the same track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "type", default)]
    pub kind: TransitionKind,
    pub duration: f64,
}

impl Transition {
    pub fn cross_dissolve(duration: f64) -> Self {
        Self {
            kind: TransitionKind::CrossDissolve,
            duration,
        }
    }
}

/// A caption shown over part of a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,

    /// Start, relative to the clip start (seconds, >= 0).
    pub start_time: f64,

    /// Visible length (seconds, > 0).
    pub duration: f64,

    /// Offset from the canvas center in pixels.
    #[serde(default)]
    pub position: Point2D,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            duration,
            position: Point2D::ZERO,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point2D::new(x, y);
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}
