//! Performance modes and the in-process performance event bus.
//!
//! The governor publishes; the texture pool and the preview session
//! subscribe. Delivery goes through a typed `tokio::sync::broadcast`
//! channel, so publishers never know who is listening.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Rendering fidelity mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    /// Full fidelity.
    #[default]
    Normal,
    /// Cheaper text rendering, reduced cache sizes.
    Optimized,
    /// No text shadows, no sub-pixel motion, smallest caches.
    Minimal,
}

impl PerformanceMode {
    /// Share of the configured pool capacity available in this mode.
    pub fn capacity_factor(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Optimized => 0.75,
            Self::Minimal => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Optimized => "optimized",
            Self::Minimal => "minimal",
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PerformanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "optimized" => Ok(Self::Optimized),
            "minimal" => Ok(Self::Minimal),
            other => Err(format!("unknown performance mode '{other}'")),
        }
    }
}

/// Severity of a measured signal. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl Severity {
    /// The mode a signal of this severity calls for.
    pub fn target_mode(self) -> PerformanceMode {
        match self {
            Self::Healthy => PerformanceMode::Normal,
            Self::Warning => PerformanceMode::Optimized,
            Self::Critical => PerformanceMode::Minimal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Messages broadcast on the performance bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerformanceEvent {
    /// Consumers should lower rendering cost.
    OptimizeRendering { severity: Severity },

    /// Consumers holding caches should shed memory.
    MemoryCleanup { severity: Severity },

    /// The governor switched modes.
    ModeChange {
        mode: PerformanceMode,
        reason: String,
    },
}

/// Default number of buffered events per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Typed publish/subscribe channel for [`PerformanceEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PerformanceEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn publish(&self, event: PerformanceEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => {
                tracing::trace!(subscribers = count, "performance event published");
                count
            }
            // No subscribers is a normal state for a headless governor.
            Err(_) => 0,
        }
    }

    /// Register a new subscriber. It only sees events published afterwards.
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Receiving end of the [`EventBus`].
#[derive(Debug)]
pub struct EventSubscriber {
    rx: broadcast::Receiver<PerformanceEvent>,
}

impl EventSubscriber {
    /// Collect every event queued so far without waiting.
    ///
    /// A subscriber that fell behind skips the overwritten events and
    /// keeps the newest ones.
    pub fn drain(&mut self) -> Vec<PerformanceEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "performance subscriber lagged");
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Wait for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<PerformanceEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "performance subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Healthy);
        assert_eq!(Severity::Warning.max(Severity::Critical), Severity::Critical);
    }

    #[test]
    fn test_mode_parse_and_display() {
        let mode: PerformanceMode = "Optimized".parse().unwrap();
        assert_eq!(mode, PerformanceMode::Optimized);
        assert_eq!(mode.to_string(), "optimized");
        assert!("turbo".parse::<PerformanceMode>().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let reached = bus.publish(PerformanceEvent::MemoryCleanup {
            severity: Severity::Warning,
        });
        assert_eq!(reached, 0);
    }

    #[test]
    fn test_subscriber_drains_in_order() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        bus.publish(PerformanceEvent::OptimizeRendering {
            severity: Severity::Warning,
        });
        bus.publish(PerformanceEvent::ModeChange {
            mode: PerformanceMode::Optimized,
            reason: "fps warning".to_string(),
        });

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], PerformanceEvent::ModeChange { .. }));
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_lagging_subscriber_keeps_newest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for _ in 0..5 {
            bus.publish(PerformanceEvent::MemoryCleanup {
                severity: Severity::Warning,
            });
        }
        bus.publish(PerformanceEvent::MemoryCleanup {
            severity: Severity::Critical,
        });
        let events = sub.drain();
        assert_eq!(
            events.last(),
            Some(&PerformanceEvent::MemoryCleanup {
                severity: Severity::Critical
            })
        );
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_bus_dropped() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
