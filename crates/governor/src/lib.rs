//! Clipdeck Performance Governor
//!
//! Watches memory usage and frame rate and drives a three-state rendering
//! mode (`normal` → `optimized` → `minimal`, and back). The more severe of
//! the two signals wins. Mode changes are recorded with a timestamp and a
//! reason, and broadcast on the performance [`EventBus`] together with
//! cleanup and fidelity hints for the pools and the compositor.
//!
//! [`EventBus`]: clipdeck_common::events::EventBus

pub mod governor;
pub mod signal;

pub use governor::*;
pub use signal::*;
