//! Render request collapsing.
//!
//! State changes (seek, selection, mode, invalidation) only record the
//! latest wanted state and bump a generation counter. The render loop takes
//! at most one request per turn, so bursts of changes produce one frame for
//! the newest state. A frame rendered for an older generation is discarded
//! when committed.

use clipdeck_common::events::PerformanceMode;

use crate::scene::Selection;

/// Snapshot of what the next frame should show.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub time: f64,
    pub selection: Selection,
    pub mode: PerformanceMode,
    pub generation: u64,
}

impl RenderRequest {
    pub fn ticket(&self) -> RenderTicket {
        RenderTicket {
            generation: self.generation,
        }
    }
}

/// Proof of which generation a frame was rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket {
    pub generation: u64,
}

/// Collapses state changes into render requests.
#[derive(Debug)]
pub struct RenderScheduler {
    time: f64,
    selection: Selection,
    mode: PerformanceMode,
    generation: u64,
    pending: bool,
    committed: Option<u64>,
    superseded: u64,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderScheduler {
    /// A scheduler at time zero with a first render pending.
    pub fn new() -> Self {
        Self {
            time: 0.0,
            selection: Selection::none(),
            mode: PerformanceMode::Normal,
            generation: 1,
            pending: true,
            committed: None,
            superseded: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a render is owed for the latest state.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Renders that were discarded because a newer state arrived.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    fn bump(&mut self) {
        self.generation += 1;
        self.pending = true;
    }

    /// Move to a new query time. Repeating the current time is a no-op.
    pub fn seek(&mut self, time: f64) {
        if time.to_bits() != self.time.to_bits() {
            self.time = time;
            self.bump();
        }
    }

    pub fn select(&mut self, selection: Selection) {
        if selection != self.selection {
            self.selection = selection;
            self.bump();
        }
    }

    pub fn set_mode(&mut self, mode: PerformanceMode) {
        if mode != self.mode {
            self.mode = mode;
            self.bump();
        }
    }

    /// Request a re-render of the unchanged state, e.g. after a texture load.
    pub fn invalidate(&mut self) {
        self.bump();
    }

    /// Take the pending request, if any.
    pub fn take(&mut self) -> Option<RenderRequest> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(RenderRequest {
            time: self.time,
            selection: self.selection.clone(),
            mode: self.mode,
            generation: self.generation,
        })
    }

    /// Whether `ticket` still describes the latest state.
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Accept a finished frame. Returns `false` if it was superseded.
    pub fn commit(&mut self, ticket: RenderTicket) -> bool {
        let newer = self.committed.map_or(true, |last| ticket.generation > last);
        if !self.is_current(ticket) || !newer {
            self.superseded += 1;
            tracing::trace!(
                generation = ticket.generation,
                latest = self.generation,
                "superseded frame discarded"
            );
            return false;
        }
        self.committed = Some(ticket.generation);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_of_seeks_collapses_to_latest() {
        let mut scheduler = RenderScheduler::new();
        scheduler.take();
        scheduler.seek(1.0);
        scheduler.seek(2.0);
        scheduler.seek(3.0);

        let request = scheduler.take().unwrap();
        assert_eq!(request.time, 3.0);
        assert!(scheduler.take().is_none());
    }

    #[test]
    fn test_repeated_state_does_not_rerender() {
        let mut scheduler = RenderScheduler::new();
        scheduler.take();
        scheduler.seek(0.0);
        scheduler.set_mode(PerformanceMode::Normal);
        scheduler.select(Selection::none());
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_stale_frame_is_discarded() {
        let mut scheduler = RenderScheduler::new();
        let old = scheduler.take().unwrap().ticket();
        scheduler.seek(5.0);
        let new = scheduler.take().unwrap().ticket();

        assert!(!scheduler.commit(old));
        assert!(scheduler.commit(new));
        assert!(!scheduler.commit(new));
        assert_eq!(scheduler.superseded(), 2);
    }

    #[test]
    fn test_invalidate_keeps_state() {
        let mut scheduler = RenderScheduler::new();
        scheduler.seek(1.5);
        scheduler.select(Selection::single("a"));
        scheduler.take();
        scheduler.invalidate();
        let request = scheduler.take().unwrap();
        assert_eq!(request.time, 1.5);
        assert!(request.selection.contains("a"));
    }
}
