//! Clipdeck Common Utilities
//!
//! Shared infrastructure for all Clipdeck crates:
//! - Error types and result aliases
//! - Playback clock and frame-rate ticker
//! - Performance modes and the in-process performance event bus
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use events::*;
