//! Clip resolution: which clips are visible at a given time.
//!
//! Both lookups are pure functions of the timeline and the query time.
//! "Nothing here" is a normal answer and is signaled with `None`.

use clipdeck_timeline_model::clip::Clip;
use clipdeck_timeline_model::timeline::Timeline;

/// Two adjacent clips blending inside a transition window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveTransition<'a> {
    /// The clip carrying the transition, fading out.
    pub outgoing: &'a Clip,
    /// The next clip on the same track, fading in.
    pub incoming: &'a Clip,
    /// Blend progress in `[0, 1]`; 0 shows only the outgoing clip.
    pub progress: f64,
    /// Video track the transition was found on.
    pub track_index: usize,
}

impl ActiveTransition<'_> {
    /// Opacity of the outgoing clip.
    pub fn outgoing_alpha(&self) -> f64 {
        1.0 - self.progress
    }

    /// Opacity of the incoming clip.
    pub fn incoming_alpha(&self) -> f64 {
        self.progress
    }
}

/// First clip, scanning video tracks in index order, whose interval
/// contains `t`.
pub fn resolve_active_clip(timeline: &Timeline, t: f64) -> Option<&Clip> {
    timeline
        .video_tracks
        .iter()
        .find_map(|track| track.iter().find(|clip| clip.contains(t)))
}

/// First transition window, in track order, that contains `t` and has a
/// following clip to blend into.
///
/// The window is closed: `[end - duration, end]`. Only one transition is
/// reported even when several tracks have one in effect.
pub fn resolve_transition(timeline: &Timeline, t: f64) -> Option<ActiveTransition<'_>> {
    for (track_index, track) in timeline.video_tracks.iter().enumerate() {
        for (index, clip) in track.iter().enumerate() {
            let Some(transition) = clip.transition.as_ref() else {
                continue;
            };
            let Some((start, end)) = clip.transition_window() else {
                continue;
            };
            // A NaN `t` falls outside every window.
            if !(t >= start && t <= end) {
                continue;
            }
            let Some(incoming) = track.get(index + 1) else {
                continue;
            };

            let progress = if transition.duration > 0.0 {
                ((t - start) / transition.duration).clamp(0.0, 1.0)
            } else {
                1.0
            };

            return Some(ActiveTransition {
                outgoing: clip,
                incoming,
                progress,
                track_index,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipdeck_timeline_model::clip::Transition;

    fn two_clip_timeline() -> Timeline {
        Timeline::single_track(vec![
            Clip::new("a", "img-a", 0.0, 5.0).with_transition(Transition::cross_dissolve(1.0)),
            Clip::new("b", "img-b", 5.0, 3.0),
        ])
    }

    #[test]
    fn test_active_clip_lookup() {
        let timeline = two_clip_timeline();
        assert_eq!(resolve_active_clip(&timeline, 0.0).map(|c| c.id.as_str()), Some("a"));
        assert_eq!(resolve_active_clip(&timeline, 4.999).map(|c| c.id.as_str()), Some("a"));
        assert_eq!(resolve_active_clip(&timeline, 5.0).map(|c| c.id.as_str()), Some("b"));
        assert!(resolve_active_clip(&timeline, 8.0).is_none());
        assert!(resolve_active_clip(&timeline, -0.5).is_none());
    }

    #[test]
    fn test_transition_window_is_closed() {
        let timeline = two_clip_timeline();

        let start = resolve_transition(&timeline, 4.0).unwrap();
        assert_eq!(start.outgoing.id, "a");
        assert_eq!(start.incoming.id, "b");
        assert_eq!(start.progress, 0.0);

        let mid = resolve_transition(&timeline, 4.5).unwrap();
        assert!((mid.progress - 0.5).abs() < 1e-9);
        assert!((mid.outgoing_alpha() + mid.incoming_alpha() - 1.0).abs() < 1e-12);

        let end = resolve_transition(&timeline, 5.0).unwrap();
        assert_eq!(end.progress, 1.0);

        assert!(resolve_transition(&timeline, 3.0).is_none());
        assert!(resolve_transition(&timeline, 6.0).is_none());
    }

    #[test]
    fn test_nan_time_resolves_nothing() {
        let timeline = two_clip_timeline();
        assert!(resolve_active_clip(&timeline, f64::NAN).is_none());
        assert!(resolve_transition(&timeline, f64::NAN).is_none());
    }

    #[test]
    fn test_transition_without_next_clip_is_ignored() {
        let timeline = Timeline::single_track(vec![
            Clip::new("a", "img-a", 0.0, 5.0).with_transition(Transition::cross_dissolve(1.0)),
        ]);
        assert!(resolve_transition(&timeline, 4.5).is_none());
        assert_eq!(resolve_active_clip(&timeline, 4.5).unwrap().id, "a");
    }

    #[test]
    fn test_first_track_wins() {
        let mut timeline = two_clip_timeline();
        timeline.video_tracks.push(vec![
            Clip::new("c", "img-c", 0.0, 5.0).with_transition(Transition::cross_dissolve(2.0)),
            Clip::new("d", "img-d", 5.0, 3.0),
        ]);

        let active = resolve_transition(&timeline, 4.5).unwrap();
        assert_eq!(active.track_index, 0);
        assert_eq!(active.outgoing.id, "a");

        // Only track 1 is in its window here.
        let active = resolve_transition(&timeline, 3.5).unwrap();
        assert_eq!(active.track_index, 1);
        assert_eq!(active.outgoing.id, "c");
    }

    #[test]
    fn test_audio_tracks_are_not_visual() {
        let mut timeline = Timeline::new();
        timeline.audio_tracks.push(vec![Clip::new("music", "song", 0.0, 10.0)]);
        assert!(resolve_active_clip(&timeline, 1.0).is_none());
    }
}
