//! Measured signals and their classification.

use clipdeck_common::config::GovernorConfig;
use clipdeck_common::events::Severity;
use serde::{Deserialize, Serialize};

/// One measurement reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Memory currently in use.
    pub memory_used_bytes: u64,
    /// Memory the host is allowed to use. Zero means unknown.
    pub memory_limit_bytes: u64,
    /// Measured frames per second. Non-finite means unknown.
    pub fps: f64,
}

impl PerformanceSample {
    pub fn new(memory_used_bytes: u64, memory_limit_bytes: u64, fps: f64) -> Self {
        Self {
            memory_used_bytes,
            memory_limit_bytes,
            fps,
        }
    }

    /// Memory in use as a share of the limit, if the limit is known.
    pub fn memory_ratio(&self) -> Option<f64> {
        (self.memory_limit_bytes > 0)
            .then(|| self.memory_used_bytes as f64 / self.memory_limit_bytes as f64)
    }
}

/// Per-signal classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalReport {
    pub memory: Severity,
    pub frame_rate: Severity,
}

impl SignalReport {
    /// Classify a sample against the configured thresholds.
    pub fn classify(sample: &PerformanceSample, config: &GovernorConfig) -> Self {
        let memory = match sample.memory_ratio() {
            Some(ratio) if ratio >= config.memory_critical_ratio => Severity::Critical,
            Some(ratio) if ratio >= config.memory_warning_ratio => Severity::Warning,
            _ => Severity::Healthy,
        };

        let frame_rate = if !sample.fps.is_finite() {
            Severity::Healthy
        } else if sample.fps < config.fps_critical {
            Severity::Critical
        } else if sample.fps < config.fps_warning {
            Severity::Warning
        } else {
            Severity::Healthy
        };

        Self { memory, frame_rate }
    }

    /// The more severe of the two signals.
    pub fn overall(&self) -> Severity {
        self.memory.max(self.frame_rate)
    }

    /// Human-readable explanation of the overall severity.
    pub fn describe(&self, sample: &PerformanceSample) -> String {
        let memory = || match sample.memory_ratio() {
            Some(ratio) => format!("memory {} ({:.1}% of limit)", self.memory, ratio * 100.0),
            None => format!("memory {}", self.memory),
        };
        let frame_rate = || format!("frame rate {} ({:.1} fps)", self.frame_rate, sample.fps);

        match self.overall() {
            Severity::Healthy => "memory and frame rate healthy".to_string(),
            worst if self.memory == worst && self.frame_rate == worst => {
                format!("{}, {}", memory(), frame_rate())
            }
            worst if self.memory == worst => memory(),
            _ => frame_rate(),
        }
    }
}
