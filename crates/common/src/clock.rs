//! Playback clock and frame ticker.
//!
//! The compositor is a pure function of a query time. This module supplies
//! that time: while playing it advances monotonically from the position
//! where playback started, while paused it holds the last seek position.

use std::time::Instant;

/// Playback state of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// A playback clock that maps wall time onto timeline seconds.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,

    /// Timeline position when the clock was last anchored.
    anchor_secs: f64,

    /// Instant the anchor was taken (only meaningful while playing).
    anchor_instant: Instant,

    /// Playback speed multiplier.
    rate: f64,

    /// Optional end of the playable range; playback stops here.
    end_secs: Option<f64>,
}

impl PlaybackClock {
    /// Create a paused clock at time zero.
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Paused,
            anchor_secs: 0.0,
            anchor_instant: Instant::now(),
            rate: 1.0,
            end_secs: None,
        }
    }

    /// Limit playback to `[0, end_secs]`.
    pub fn with_end(mut self, end_secs: f64) -> Self {
        self.end_secs = Some(end_secs.max(0.0));
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Start advancing from the current position.
    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    /// Start advancing, anchored at an explicit instant.
    pub fn play_at(&mut self, now: Instant) {
        if self.state == PlaybackState::Playing {
            return;
        }
        self.anchor_instant = now;
        self.state = PlaybackState::Playing;
    }

    /// Freeze at the current position.
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if self.state == PlaybackState::Paused {
            return;
        }
        self.anchor_secs = self.time_at(now);
        self.state = PlaybackState::Paused;
    }

    /// Jump to a position. Playback continues from there if playing.
    pub fn seek(&mut self, secs: f64) {
        self.seek_at(secs, Instant::now());
    }

    pub fn seek_at(&mut self, secs: f64, now: Instant) {
        self.anchor_secs = self.clamp_to_range(secs);
        self.anchor_instant = now;
    }

    /// Change playback speed without a jump in position.
    pub fn set_rate(&mut self, rate: f64) {
        let now = Instant::now();
        self.anchor_secs = self.time_at(now);
        self.anchor_instant = now;
        self.rate = rate.max(0.0);
    }

    /// Current timeline position in seconds.
    pub fn current_time(&self) -> f64 {
        self.time_at(Instant::now())
    }

    /// Timeline position at a given instant.
    pub fn time_at(&self, now: Instant) -> f64 {
        match self.state {
            PlaybackState::Paused => self.anchor_secs,
            PlaybackState::Playing => {
                let elapsed = now.saturating_duration_since(self.anchor_instant);
                self.clamp_to_range(self.anchor_secs + elapsed.as_secs_f64() * self.rate)
            }
        }
    }

    /// Whether playback has reached the end of the range.
    pub fn at_end_at(&self, now: Instant) -> bool {
        match self.end_secs {
            Some(end) => self.time_at(now) >= end,
            None => false,
        }
    }

    fn clamp_to_range(&self, secs: f64) -> f64 {
        let secs = secs.max(0.0);
        match self.end_secs {
            Some(end) => secs.min(end),
            None => secs,
        }
    }

    /// Convert seconds to a frame index at the given rate.
    pub fn secs_to_frame(secs: f64, fps: u32) -> u64 {
        (secs.max(0.0) * fps as f64).floor() as u64
    }

    /// Convert a frame index to its start time in seconds.
    pub fn frame_to_secs(frame: u64, fps: u32) -> f64 {
        frame as f64 / fps as f64
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame rate controller for the per-display-frame render ticker.
///
/// Time is divided into slots of one frame interval; at most one tick is
/// allowed per slot. A late tick does not push the next slot back.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_slot: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_slot: None,
        }
    }

    /// Check if `current_ns` falls in a slot that has not ticked yet.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        let slot = current_ns / self.target_interval_ns;
        match self.last_slot {
            Some(last) if slot <= last => false,
            _ => {
                self.last_slot = Some(slot);
                true
            }
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
