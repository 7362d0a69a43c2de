//! Timeline: ordered video and audio tracks of clips.
//!
//! The timeline is the source of truth owned by the editing application.
//! The preview core reads it and never mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clip::Clip;

/// Tolerance for comparing clip boundaries.
const EPSILON: f64 = 1e-9;

/// One track: clips in timeline order.
pub type Track = Vec<Clip>;

/// Video and audio tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub video_tracks: Vec<Track>,

    #[serde(default)]
    pub audio_tracks: Vec<Track>,
}

/// Which family of tracks a clip lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// A problem found by [`Timeline::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineIssue {
    pub track_kind: TrackKind,
    pub track_index: usize,
    pub clip_id: String,
    pub message: String,
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} track {}, clip '{}': {}",
            self.track_kind, self.track_index, self.clip_id, self.message
        )
    }
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline with one video track holding the given clips.
    pub fn single_track(clips: Vec<Clip>) -> Self {
        Self {
            video_tracks: vec![clips],
            audio_tracks: Vec::new(),
        }
    }

    /// End of the last clip on any track.
    pub fn duration(&self) -> f64 {
        self.all_clips()
            .map(Clip::end_time)
            .fold(0.0_f64, f64::max)
    }

    /// Every clip on every track, video first.
    pub fn all_clips(&self) -> impl Iterator<Item = &Clip> {
        self.video_tracks
            .iter()
            .chain(self.audio_tracks.iter())
            .flat_map(|track| track.iter())
    }

    /// Total number of clips across all tracks.
    pub fn clip_count(&self) -> usize {
        self.all_clips().count()
    }

    /// Find a clip by id.
    pub fn find_clip(&self, clip_id: &str) -> Option<&Clip> {
        self.all_clips().find(|c| c.id == clip_id)
    }

    /// Check structural invariants. An empty result means the timeline is valid.
    pub fn validate(&self) -> Vec<TimelineIssue> {
        let mut issues = Vec::new();
        for (index, track) in self.video_tracks.iter().enumerate() {
            validate_track(TrackKind::Video, index, track, &mut issues);
        }
        for (index, track) in self.audio_tracks.iter().enumerate() {
            validate_track(TrackKind::Audio, index, track, &mut issues);
        }
        issues
    }
}

fn validate_track(kind: TrackKind, index: usize, track: &Track, issues: &mut Vec<TimelineIssue>) {
    let mut push = |clip: &Clip, message: String| {
        issues.push(TimelineIssue {
            track_kind: kind,
            track_index: index,
            clip_id: clip.id.clone(),
            message,
        });
    };

    for clip in track {
        if !clip.start_time.is_finite() || clip.start_time < 0.0 {
            push(clip, format!("start_time must be >= 0 (got {})", clip.start_time));
        }
        if !clip.duration.is_finite() || clip.duration <= 0.0 {
            push(clip, format!("duration must be > 0 (got {})", clip.duration));
        }
        if !(0.0..=2.0).contains(&clip.volume) {
            push(clip, format!("volume must be within [0, 2] (got {})", clip.volume));
        }
        if let Some(transition) = &clip.transition {
            if !(transition.duration > 0.0) {
                push(
                    clip,
                    format!("transition duration must be > 0 (got {})", transition.duration),
                );
            } else if transition.duration > clip.duration + EPSILON {
                push(
                    clip,
                    format!(
                        "transition duration {} exceeds clip duration {}",
                        transition.duration, clip.duration
                    ),
                );
            }
        }
        for overlay in &clip.text_overlays {
            if overlay.start_time < 0.0 {
                push(
                    clip,
                    format!("text overlay '{}' starts before the clip", overlay.text),
                );
            }
            if !(overlay.duration > 0.0) {
                push(
                    clip,
                    format!("text overlay '{}' must have a positive duration", overlay.text),
                );
            }
        }
    }

    for pair in track.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start_time + EPSILON < prev.start_time {
            push(
                next,
                format!("clip starts before preceding clip '{}'", prev.id),
            );
            continue;
        }

        let allowed_overlap = prev.transition.map(|t| t.duration).unwrap_or(0.0);
        let overlap = prev.end_time() - next.start_time;
        if overlap > allowed_overlap + EPSILON {
            push(
                next,
                format!(
                    "overlaps '{}' by {:.3}s (transition allows {:.3}s)",
                    prev.id, overlap, allowed_overlap
                ),
            );
        }
    }
}
