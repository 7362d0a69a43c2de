//! Fit-to-canvas placement and Ken-Burns pan/zoom.

use clipdeck_timeline_model::clip::Clip;
use clipdeck_timeline_model::geometry::Point2D;
use serde::Serialize;

use crate::scene::Canvas;

/// Where a clip's texture sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpriteTransform {
    /// Canvas position of the texture center.
    pub position: Point2D,
    /// Uniform scale applied to the texture's pixel size.
    pub scale: f64,
}

/// Largest uniform scale at which a `width` x `height` bitmap fits the
/// canvas. Degenerate sizes get 1.
pub fn fit_scale(canvas: &Canvas, width: f64, height: f64) -> f64 {
    if width <= 0.0 || height <= 0.0 {
        return 1.0;
    }
    (canvas.width / width).min(canvas.height / height)
}

/// Animation progress for a time relative to the clip start.
///
/// Clamped to `[0, 1]` for any query time. Zero-length clips stay at 0.
pub fn kenburns_progress(relative_time: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || relative_time.is_nan() {
        return 0.0;
    }
    relative_time.clamp(0.0, duration) / duration
}

/// Transform of `clip`'s texture at `relative_time`.
///
/// Without an animation the texture is centered at its fit scale.
pub fn clip_transform(
    clip: &Clip,
    relative_time: f64,
    canvas: &Canvas,
    texture_width: f64,
    texture_height: f64,
) -> SpriteTransform {
    let base = fit_scale(canvas, texture_width, texture_height);
    let center = canvas.center();

    match clip.animation.as_ref() {
        None => SpriteTransform {
            position: center,
            scale: base,
        },
        Some(animation) => {
            let rect = animation.at(kenburns_progress(relative_time, clip.duration));
            SpriteTransform {
                position: center.offset(rect.offset()),
                scale: base * rect.scale,
            }
        }
    }
}
