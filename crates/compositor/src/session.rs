//! Preview session: the single-threaded render loop around the compositor.
//!
//! The session owns the pools, the scheduler and an optional subscription
//! to the performance bus. Hosts drive it in two ways:
//!
//! - discrete changes (`seek`, `select`, `set_mode`) followed by
//!   [`PreviewSession::render_pending`];
//! - an event loop awaiting [`PreviewSession::next_wakeup`], which returns
//!   when a texture load finishes, a performance event arrives or the
//!   failed-asset retry timer fires.
//!
//! [`PreviewSession::play_range`] ticks the clock at the configured frame
//! rate and renders each tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clipdeck_common::clock::{PlaybackClock, RateController};
use clipdeck_common::config::AppConfig;
use clipdeck_common::error::{ClipdeckError, ClipdeckResult};
use clipdeck_common::events::{
    EventBus, EventSubscriber, PerformanceEvent, PerformanceMode, Severity,
};
use clipdeck_resource_pool::loader::TextureLoader;
use clipdeck_resource_pool::sprite::SpritePool;
use clipdeck_resource_pool::texture::{CompletionOutcome, TexturePool, TexturePoolConfig};
use clipdeck_timeline_model::asset::{AssetId, AssetLibrary};
use clipdeck_timeline_model::timeline::Timeline;
use serde::Serialize;
use tokio::time::{Interval, MissedTickBehavior};

use crate::compositor::{Compositor, FrameInput};
use crate::scene::{Scene, Selection};
use crate::scheduler::RenderScheduler;

/// Why [`PreviewSession::next_wakeup`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Wakeup {
    /// A texture load finished and was applied.
    TextureLoaded(CompletionOutcome),
    /// A performance event arrived and was handled.
    Performance(PerformanceEvent),
    /// The retry timer fired; these failed assets will be fetched again.
    RetryDue(Vec<AssetId>),
}

/// Totals for one [`PreviewSession::play_range`] run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackSummary {
    pub from: f64,
    pub to: f64,
    pub frames: u64,
    /// Frames that showed at least one placeholder message.
    pub placeholder_frames: u64,
    /// Ticks that landed in an already rendered frame slot.
    pub skipped_ticks: u64,
    pub wall_time_ms: u64,
}

enum Woke {
    Loaded(CompletionOutcome),
    Event(PerformanceEvent),
    RetryTick,
}

/// A timeline preview with its own pools and render scheduling.
pub struct PreviewSession {
    timeline: Timeline,
    assets: AssetLibrary,
    compositor: Compositor,
    textures: TexturePool,
    sprites: SpritePool,
    scheduler: RenderScheduler,
    events: Option<EventSubscriber>,
    retry_period: Duration,
    retry_timer: Option<Interval>,
    fps: u32,
}

impl PreviewSession {
    pub fn new(
        config: &AppConfig,
        timeline: Timeline,
        assets: AssetLibrary,
        loader: Arc<dyn TextureLoader>,
    ) -> Self {
        let pool_config = TexturePoolConfig::from(&config.pool);
        // Ticking at half the delay keeps a failure's wait under 1.5x the delay.
        let retry_period = (pool_config.retry_delay / 2).max(Duration::from_millis(1));

        tracing::info!(
            clips = timeline.clip_count(),
            assets = assets.len(),
            fps = config.render.fps,
            "preview session created"
        );

        Self {
            timeline,
            assets,
            compositor: Compositor::from_config(config),
            textures: TexturePool::new(pool_config, loader),
            sprites: SpritePool::from_config(&config.pool),
            scheduler: RenderScheduler::new(),
            events: None,
            retry_period,
            retry_timer: None,
            fps: config.render.fps.max(1),
        }
    }

    /// Listen to performance events published on `bus`.
    pub fn subscribe(&mut self, bus: &EventBus) {
        self.events = Some(bus.subscribe());
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    pub fn textures(&self) -> &TexturePool {
        &self.textures
    }

    pub fn sprites(&self) -> &SpritePool {
        &self.sprites
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// The last committed scene.
    pub fn scene(&self) -> &Scene {
        self.compositor.scene()
    }

    pub fn time(&self) -> f64 {
        self.scheduler.time()
    }

    pub fn mode(&self) -> PerformanceMode {
        self.scheduler.mode()
    }

    /// Move the preview to `time`. Non-finite times are ignored.
    pub fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            tracing::warn!(time, "ignoring seek to non-finite time");
            return;
        }
        self.scheduler.seek(time);
    }

    pub fn select(&mut self, selection: Selection) {
        self.scheduler.select(selection);
    }

    /// Switch rendering fidelity and pool sizes.
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        self.textures.set_mode(mode);
        self.sprites.set_mode(mode);
        self.scheduler.set_mode(mode);
    }

    /// Replace the previewed content.
    pub fn set_content(&mut self, timeline: Timeline, assets: AssetLibrary) {
        self.timeline = timeline;
        self.assets = assets;
        self.scheduler.invalidate();
    }

    /// React to one performance event.
    pub fn handle_event(&mut self, event: &PerformanceEvent) {
        self.textures.handle_event(event);
        match event {
            PerformanceEvent::ModeChange { mode, reason } => {
                tracing::debug!(%mode, reason = %reason, "preview mode follows governor");
                self.set_mode(*mode);
            }
            PerformanceEvent::MemoryCleanup {
                severity: Severity::Critical,
            } => {
                // On-screen sprites still hold textures; drop them too.
                self.compositor.clear(&mut self.sprites);
                self.sprites.clear();
                self.scheduler.invalidate();
            }
            PerformanceEvent::OptimizeRendering { severity } => {
                tracing::debug!(%severity, "optimize rendering requested");
                self.scheduler.invalidate();
            }
            PerformanceEvent::MemoryCleanup { .. } => {}
        }
    }

    /// Apply finished loads and queued events without waiting.
    pub fn poll(&mut self) {
        for outcome in self.textures.poll_completions() {
            if outcome.changes_frame() {
                self.scheduler.invalidate();
            }
        }
        let events = self
            .events
            .as_mut()
            .map(EventSubscriber::drain)
            .unwrap_or_default();
        for event in &events {
            self.handle_event(event);
        }
    }

    /// Render the latest requested state if a render is owed.
    ///
    /// Returns `None` when nothing changed since the last frame.
    pub fn render_pending(&mut self) -> Option<&Scene> {
        self.poll();
        let request = self.scheduler.take()?;
        let ticket = request.ticket();

        let input = FrameInput {
            timeline: &self.timeline,
            assets: &self.assets,
            time: request.time,
            selection: &request.selection,
            mode: request.mode,
        };
        self.compositor
            .render_frame(&input, &mut self.textures, &mut self.sprites);

        if self.scheduler.commit(ticket) {
            Some(self.compositor.scene())
        } else {
            None
        }
    }

    /// Render, then keep re-rendering until no texture load is in flight.
    pub async fn render_settled(&mut self) -> &Scene {
        loop {
            self.render_pending();
            if !self.textures.has_pending() {
                break;
            }
            let outcome = self.textures.next_completion().await;
            if outcome.changes_frame() {
                self.scheduler.invalidate();
            }
        }
        self.compositor.scene()
    }

    /// Wait for the next thing that may change the frame and apply it.
    pub async fn next_wakeup(&mut self) -> Wakeup {
        let period = self.retry_period;
        let retry = self.retry_timer.get_or_insert_with(|| {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });
        let loading = self.textures.has_pending();

        let woke = tokio::select! {
            outcome = self.textures.next_completion(), if loading => Woke::Loaded(outcome),
            Some(event) = recv_event(&mut self.events) => Woke::Event(event),
            _ = retry.tick() => Woke::RetryTick,
        };

        match woke {
            Woke::Loaded(outcome) => {
                if outcome.changes_frame() {
                    self.scheduler.invalidate();
                }
                Wakeup::TextureLoaded(outcome)
            }
            Woke::Event(event) => {
                self.handle_event(&event);
                Wakeup::Performance(event)
            }
            Woke::RetryTick => Wakeup::RetryDue(self.retry_failed(Instant::now())),
        }
    }

    fn retry_failed(&mut self, now: Instant) -> Vec<AssetId> {
        let due = self.textures.retry_failed(now);
        if !due.is_empty() {
            self.scheduler.invalidate();
        }
        due
    }

    /// Play `[from, to]` in real time at the configured frame rate.
    ///
    /// `on_frame` sees every committed scene. Texture loads started along
    /// the way are applied between ticks.
    pub async fn play_range<F>(&mut self, from: f64, to: f64, mut on_frame: F) -> ClipdeckResult<PlaybackSummary>
    where
        F: FnMut(&Scene),
    {
        if !from.is_finite() || !to.is_finite() || from < 0.0 || to < from {
            return Err(ClipdeckError::render(format!(
                "invalid playback range {from}..{to}"
            )));
        }

        let mut rate = RateController::new(self.fps);
        let mut clock = PlaybackClock::new().with_end(to);
        let started = Instant::now();
        clock.seek_at(from, started);
        clock.play_at(started);

        let mut ticker = tokio::time::interval(Duration::from_nanos(rate.interval_ns()));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = PlaybackSummary {
            from,
            to,
            ..PlaybackSummary::default()
        };
        tracing::info!(from, to, fps = self.fps, "playback started");

        loop {
            ticker.tick().await;
            let now = Instant::now();
            let elapsed_ns = now.saturating_duration_since(started).as_nanos() as u64;
            if !rate.should_tick(elapsed_ns) {
                summary.skipped_ticks += 1;
                continue;
            }

            self.retry_failed(now);
            self.seek(clock.time_at(now));
            if let Some(scene) = self.render_pending() {
                summary.frames += 1;
                if scene.placeholder().is_some() {
                    summary.placeholder_frames += 1;
                }
                on_frame(scene);
            }

            if clock.at_end_at(now) {
                break;
            }
        }

        clock.pause_at(Instant::now());
        summary.wall_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            frames = summary.frames,
            placeholder_frames = summary.placeholder_frames,
            wall_time_ms = summary.wall_time_ms,
            "playback finished"
        );
        Ok(summary)
    }

    /// Release every pooled resource. The session renders nothing afterwards.
    pub fn shutdown(&mut self) {
        self.compositor.clear(&mut self.sprites);
        self.sprites.shutdown();
        self.textures.shutdown();
        self.events = None;
        tracing::info!(
            frames = self.compositor.frames_rendered(),
            "preview session shut down"
        );
    }
}

async fn recv_event(events: &mut Option<EventSubscriber>) -> Option<PerformanceEvent> {
    match events {
        Some(subscriber) => subscriber.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipdeck_resource_pool::bitmap::DecodedBitmap;
    use clipdeck_timeline_model::asset::{Asset, AssetType};
    use clipdeck_timeline_model::clip::Clip;

    use crate::scene::PlaceholderKind;

    struct SolidLoader;

    #[async_trait]
    impl TextureLoader for SolidLoader {
        async fn load(&self, asset: &Asset) -> ClipdeckResult<DecodedBitmap> {
            tokio::task::yield_now().await;
            if asset.id.starts_with("broken") {
                return Err(ClipdeckError::asset_load(&asset.id, "decode error"));
            }
            Ok(DecodedBitmap::blank(640, 360))
        }
    }

    fn session(asset_id: &str) -> PreviewSession {
        let timeline = Timeline::single_track(vec![Clip::new("c1", asset_id, 0.0, 2.0)]);
        let assets: AssetLibrary = [Asset::new(asset_id, AssetType::Image, format!("{asset_id}.png"))]
            .into_iter()
            .collect();
        PreviewSession::new(&AppConfig::default(), timeline, assets, Arc::new(SolidLoader))
    }

    #[tokio::test]
    async fn test_first_render_shows_loading_then_sprite() {
        let mut session = session("img");
        session.seek(1.0);
        let scene = session.render_pending().unwrap();
        assert_eq!(scene.placeholder(), Some(PlaceholderKind::AssetLoading));

        match session.next_wakeup().await {
            Wakeup::TextureLoaded(CompletionOutcome::Loaded(id)) => assert_eq!(id, "img"),
            other => panic!("unexpected wakeup: {other:?}"),
        }
        let scene = session.render_pending().unwrap();
        assert_eq!(scene.sprite_for("c1").unwrap().scale, 3.0);
    }

    #[tokio::test]
    async fn test_unchanged_state_does_not_rerender() {
        let mut session = session("img");
        session.render_settled().await;
        assert!(session.render_pending().is_none());
        session.seek(0.5);
        assert!(session.render_pending().is_some());
    }

    #[tokio::test]
    async fn test_non_finite_seek_is_ignored() {
        let mut session = session("img");
        session.seek(1.0);
        session.render_settled().await;
        session.seek(f64::NAN);
        session.seek(f64::INFINITY);
        assert_eq!(session.time(), 1.0);
        assert!(session.render_pending().is_none());
    }

    #[tokio::test]
    async fn test_failed_asset_shows_error() {
        let mut session = session("broken");
        let scene = session.render_settled().await;
        assert_eq!(scene.placeholder(), Some(PlaceholderKind::AssetLoadFailed));
    }

    #[tokio::test]
    async fn test_mode_change_event_applies_to_pools() {
        let bus = EventBus::default();
        let mut session = session("img");
        session.subscribe(&bus);
        session.render_settled().await;

        bus.publish(PerformanceEvent::ModeChange {
            mode: PerformanceMode::Minimal,
            reason: "test".to_string(),
        });
        match session.next_wakeup().await {
            Wakeup::Performance(PerformanceEvent::ModeChange { mode, .. }) => {
                assert_eq!(mode, PerformanceMode::Minimal)
            }
            other => panic!("unexpected wakeup: {other:?}"),
        }
        assert_eq!(session.mode(), PerformanceMode::Minimal);
        assert_eq!(session.textures().mode(), PerformanceMode::Minimal);
        assert_eq!(session.render_pending().unwrap().mode, PerformanceMode::Minimal);
    }

    #[tokio::test]
    async fn test_critical_cleanup_releases_everything() {
        let mut session = session("img");
        session.render_settled().await;
        assert_eq!(session.textures().len(), 1);

        session.handle_event(&PerformanceEvent::MemoryCleanup {
            severity: Severity::Critical,
        });
        assert!(session.textures().is_empty());
        assert_eq!(session.sprites().idle(), 0);

        // The next frame fetches the texture again.
        let scene = session.render_pending().unwrap();
        assert_eq!(scene.placeholder(), Some(PlaceholderKind::AssetLoading));
    }

    #[tokio::test]
    async fn test_play_range_renders_frames() {
        let mut session = session("img");
        session.render_settled().await;

        let mut times = Vec::new();
        let summary = session
            .play_range(0.0, 0.2, |scene| times.push(scene.time))
            .await
            .unwrap();

        assert!(summary.frames >= 2);
        assert_eq!(summary.frames as usize, times.len());
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!((times.last().copied().unwrap() - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_play_range_rejects_inverted_range() {
        let mut session = session("img");
        assert!(session.play_range(2.0, 1.0, |_| {}).await.is_err());
    }
}
