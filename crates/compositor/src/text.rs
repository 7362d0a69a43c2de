//! Text overlay fades and mode-dependent text styling.

use clipdeck_common::events::PerformanceMode;
use serde::Serialize;

/// Default fade-in/fade-out length for overlays (seconds).
pub const DEFAULT_FADE_SECS: f64 = 0.3;

/// Opacity of an overlay at `overlay_time` (time since the overlay began).
///
/// Returns `None` outside `[0, duration)`. Inside, the overlay fades in
/// linearly over `fade_secs`, holds at full opacity and fades out over the
/// last `fade_secs`.
pub fn overlay_alpha(overlay_time: f64, duration: f64, fade_secs: f64) -> Option<f64> {
    if !(overlay_time >= 0.0 && overlay_time < duration) {
        return None;
    }
    if fade_secs <= 0.0 {
        return Some(1.0);
    }
    let fade_in = overlay_time / fade_secs;
    let fade_out = (duration - overlay_time) / fade_secs;
    Some(fade_in.min(fade_out).clamp(0.0, 1.0))
}

/// Glyph rasterization quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontQuality {
    Full,
    Reduced,
}

/// How text nodes are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStyle {
    pub shadow: bool,
    pub font_quality: FontQuality,
}

impl TextStyle {
    pub fn for_mode(mode: PerformanceMode) -> Self {
        match mode {
            PerformanceMode::Normal => Self {
                shadow: true,
                font_quality: FontQuality::Full,
            },
            PerformanceMode::Optimized => Self {
                shadow: true,
                font_quality: FontQuality::Reduced,
            },
            PerformanceMode::Minimal => Self {
                shadow: false,
                font_quality: FontQuality::Reduced,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fade_in_hold_fade_out() {
        let alpha = |t| overlay_alpha(t, 1.0, DEFAULT_FADE_SECS).unwrap();
        assert_eq!(alpha(0.0), 0.0);
        assert!(approx(alpha(0.15), 0.5));
        assert_eq!(alpha(0.5), 1.0);
        assert!(approx(alpha(0.85), 0.5));
    }

    #[test]
    fn test_visibility_interval_is_half_open() {
        assert!(overlay_alpha(-0.01, 1.0, DEFAULT_FADE_SECS).is_none());
        assert!(overlay_alpha(1.0, 1.0, DEFAULT_FADE_SECS).is_none());
        assert!(overlay_alpha(0.999, 1.0, DEFAULT_FADE_SECS).is_some());
    }

    #[test]
    fn test_short_overlay_never_reaches_full() {
        let peak = overlay_alpha(0.2, 0.4, DEFAULT_FADE_SECS).unwrap();
        assert!(peak < 1.0);
        assert!(peak > 0.0);
    }

    #[test]
    fn test_style_by_mode() {
        assert!(TextStyle::for_mode(PerformanceMode::Normal).shadow);
        assert_eq!(
            TextStyle::for_mode(PerformanceMode::Optimized).font_quality,
            FontQuality::Reduced
        );
        assert!(!TextStyle::for_mode(PerformanceMode::Minimal).shadow);
    }
}
