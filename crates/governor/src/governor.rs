//! The performance governor state machine.
//!
//! Rules:
//! - critical on either signal → `minimal`
//! - warning on either signal (and no critical) → `optimized`
//! - both healthy → `normal`
//!
//! Automatic switching only happens while auto-optimization is enabled. A
//! manual mode set by the host disables it until re-enabled.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use clipdeck_common::config::GovernorConfig;
use clipdeck_common::events::{EventBus, PerformanceEvent, PerformanceMode, Severity};
use serde::Serialize;

use crate::signal::{PerformanceSample, SignalReport};

/// One recorded mode transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeChangeRecord {
    pub from: PerformanceMode,
    pub to: PerformanceMode,
    pub reason: String,
    pub at: DateTime<Utc>,
    /// Set by the host rather than derived from measurements.
    pub manual: bool,
}

/// Drives the rendering mode from measured signals.
#[derive(Debug)]
pub struct PerformanceGovernor {
    config: GovernorConfig,
    bus: EventBus,
    mode: PerformanceMode,
    auto_optimize: bool,
    last_sample: Option<PerformanceSample>,
    last_report: SignalReport,
    history: VecDeque<ModeChangeRecord>,
    shut_down: bool,
}

impl PerformanceGovernor {
    /// Create a governor in `normal` mode publishing on `bus`.
    pub fn new(config: GovernorConfig, bus: EventBus) -> Self {
        tracing::info!(
            auto_optimize = config.auto_optimize,
            history_limit = config.history_limit,
            "performance governor created"
        );
        Self {
            auto_optimize: config.auto_optimize,
            history: VecDeque::with_capacity(config.history_limit),
            config,
            bus,
            mode: PerformanceMode::Normal,
            last_sample: None,
            last_report: SignalReport::default(),
            shut_down: false,
        }
    }

    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    pub fn is_auto_optimizing(&self) -> bool {
        self.auto_optimize
    }

    /// Classification of the most recent sample.
    pub fn last_report(&self) -> SignalReport {
        self.last_report
    }

    pub fn last_sample(&self) -> Option<PerformanceSample> {
        self.last_sample
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ModeChangeRecord> {
        self.history.iter()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Feed a new measurement. Returns the new mode if it changed.
    pub fn observe(&mut self, sample: PerformanceSample) -> Option<PerformanceMode> {
        if self.shut_down {
            return None;
        }

        let previous = self.last_report;
        let report = SignalReport::classify(&sample, &self.config);
        self.last_sample = Some(sample);
        self.last_report = report;

        tracing::trace!(
            memory = %report.memory,
            frame_rate = %report.frame_rate,
            fps = sample.fps,
            "performance sample"
        );

        // Edge-triggered: a sustained warning must not evict again on every sample.
        if report.memory > previous.memory && report.memory > Severity::Healthy {
            self.bus.publish(PerformanceEvent::MemoryCleanup {
                severity: report.memory,
            });
        }
        if report.overall() > previous.overall() && report.overall() > Severity::Healthy {
            self.bus.publish(PerformanceEvent::OptimizeRendering {
                severity: report.overall(),
            });
        }

        if !self.auto_optimize {
            return None;
        }
        self.apply_report(report, &sample)
    }

    fn apply_report(
        &mut self,
        report: SignalReport,
        sample: &PerformanceSample,
    ) -> Option<PerformanceMode> {
        let target = report.overall().target_mode();
        if target == self.mode {
            return None;
        }
        self.transition(target, report.describe(sample), false);
        Some(target)
    }

    /// Force a mode. Disables auto-optimization until re-enabled.
    pub fn set_manual_mode(&mut self, mode: PerformanceMode, reason: impl Into<String>) {
        if self.shut_down {
            return;
        }
        self.auto_optimize = false;
        if mode != self.mode {
            self.transition(mode, reason.into(), true);
        }
    }

    /// Resume automatic switching, re-evaluating the latest sample.
    ///
    /// Returns the new mode if the re-evaluation changed it.
    pub fn enable_auto_optimization(&mut self) -> Option<PerformanceMode> {
        if self.shut_down {
            return None;
        }
        self.auto_optimize = true;
        tracing::info!("auto-optimization enabled");
        let sample = self.last_sample?;
        let report = SignalReport::classify(&sample, &self.config);
        self.apply_report(report, &sample)
    }

    pub fn disable_auto_optimization(&mut self) {
        self.auto_optimize = false;
        tracing::info!("auto-optimization disabled");
    }

    fn transition(&mut self, to: PerformanceMode, reason: String, manual: bool) {
        let from = self.mode;
        self.mode = to;

        tracing::info!(%from, %to, manual, reason = %reason, "performance mode changed");

        if self.config.history_limit > 0 {
            while self.history.len() >= self.config.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(ModeChangeRecord {
                from,
                to,
                reason: reason.clone(),
                at: Utc::now(),
                manual,
            });
        }

        self.bus
            .publish(PerformanceEvent::ModeChange { mode: to, reason });
    }

    /// Stop reacting to samples and publishing events.
    pub fn shutdown(&mut self) {
        if !self.shut_down {
            self.shut_down = true;
            tracing::info!(mode = %self.mode, "performance governor shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 1000;

    fn governor() -> (PerformanceGovernor, clipdeck_common::events::EventSubscriber) {
        let bus = EventBus::default();
        let sub = bus.subscribe();
        (PerformanceGovernor::new(GovernorConfig::default(), bus), sub)
    }

    fn healthy() -> PerformanceSample {
        PerformanceSample::new(100, LIMIT, 60.0)
    }

    #[test]
    fn test_critical_memory_with_healthy_fps_goes_minimal() {
        let (mut gov, mut sub) = governor();
        let changed = gov.observe(PerformanceSample::new(950, LIMIT, 60.0));
        assert_eq!(changed, Some(PerformanceMode::Minimal));

        let events = sub.drain();
        assert!(events.contains(&PerformanceEvent::MemoryCleanup {
            severity: Severity::Critical
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, PerformanceEvent::ModeChange { mode: PerformanceMode::Minimal, .. })));
    }

    #[test]
    fn test_warning_fps_goes_optimized() {
        let (mut gov, _sub) = governor();
        assert_eq!(
            gov.observe(PerformanceSample::new(100, LIMIT, 20.0)),
            Some(PerformanceMode::Optimized)
        );
        let record = gov.history().last().unwrap();
        assert_eq!(record.reason, "frame rate warning (20.0 fps)");
        assert!(!record.manual);
    }

    #[test]
    fn test_jitter_around_render_rate_keeps_normal_mode() {
        let (mut gov, mut sub) = governor();
        for i in 0..20 {
            let fps = if i % 2 == 0 { 29.8 } else { 30.2 };
            assert_eq!(gov.observe(PerformanceSample::new(0, 0, fps)), None);
        }
        assert_eq!(gov.mode(), PerformanceMode::Normal);
        assert_eq!(gov.history().count(), 0);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_recovery_returns_to_normal() {
        let (mut gov, _sub) = governor();
        gov.observe(PerformanceSample::new(950, LIMIT, 10.0));
        assert_eq!(gov.mode(), PerformanceMode::Minimal);
        assert_eq!(gov.observe(healthy()), Some(PerformanceMode::Normal));
        assert_eq!(gov.history().count(), 2);
    }

    #[test]
    fn test_manual_override_wins_until_auto_reenabled() {
        let (mut gov, _sub) = governor();
        gov.observe(PerformanceSample::new(950, LIMIT, 60.0));
        gov.set_manual_mode(PerformanceMode::Normal, "user request");
        assert!(!gov.is_auto_optimizing());

        assert_eq!(gov.observe(PerformanceSample::new(990, LIMIT, 5.0)), None);
        assert_eq!(gov.mode(), PerformanceMode::Normal);

        assert_eq!(gov.enable_auto_optimization(), Some(PerformanceMode::Minimal));
    }

    #[test]
    fn test_healthy_without_auto_stays_put() {
        let (mut gov, _sub) = governor();
        gov.observe(PerformanceSample::new(950, LIMIT, 60.0));
        gov.disable_auto_optimization();
        assert_eq!(gov.observe(healthy()), None);
        assert_eq!(gov.mode(), PerformanceMode::Minimal);
    }

    #[test]
    fn test_sustained_warning_publishes_cleanup_once() {
        let (mut gov, mut sub) = governor();
        for _ in 0..5 {
            gov.observe(PerformanceSample::new(800, LIMIT, 60.0));
        }
        let cleanups = sub
            .drain()
            .into_iter()
            .filter(|e| matches!(e, PerformanceEvent::MemoryCleanup { .. }))
            .count();
        assert_eq!(cleanups, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let bus = EventBus::default();
        let config = GovernorConfig {
            history_limit: 3,
            ..GovernorConfig::default()
        };
        let mut gov = PerformanceGovernor::new(config, bus);
        for i in 0..10 {
            let used = if i % 2 == 0 { 950 } else { 100 };
            gov.observe(PerformanceSample::new(used, LIMIT, 60.0));
        }
        assert_eq!(gov.history().count(), 3);
        assert_eq!(gov.history().last().unwrap().to, PerformanceMode::Normal);
    }

    #[test]
    fn test_shutdown_ignores_samples() {
        let (mut gov, mut sub) = governor();
        gov.shutdown();
        assert_eq!(gov.observe(PerformanceSample::new(990, LIMIT, 1.0)), None);
        assert!(sub.drain().is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn auto_mode_matches_worst_signal(
                samples in proptest::collection::vec((0u64..=LIMIT, 0.0f64..120.0), 1..40),
            ) {
                let (mut gov, _sub) = governor();
                let config = GovernorConfig::default();
                for (used, fps) in samples {
                    let sample = PerformanceSample::new(used, LIMIT, fps);
                    gov.observe(sample);
                    let expected = SignalReport::classify(&sample, &config).overall().target_mode();
                    prop_assert_eq!(gov.mode(), expected);
                }
            }
        }
    }
}
