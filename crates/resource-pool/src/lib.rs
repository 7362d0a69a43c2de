//! Clipdeck Resource Pool
//!
//! Bounded, explicitly owned caches for the preview compositor:
//!
//! - [`TexturePool`]: decoded bitmaps keyed by asset id, capped by entry
//!   count and byte budget, evicted least-recently-used first. Misses start
//!   one asynchronous load per `(asset id, source url)`; parallel requests
//!   for the same key join the load already in flight.
//! - [`SpritePool`]: a free-list of reusable drawable handles so frames do
//!   not allocate new sprites on every tick.
//!
//! Both pools are mutated from the render thread only. Loads run on tokio
//! tasks and report back through a channel that the owner drains.

pub mod bitmap;
pub mod loader;
pub mod pending;
pub mod sprite;
pub mod texture;

pub use bitmap::*;
pub use loader::*;
pub use pending::*;
pub use sprite::*;
pub use texture::*;
