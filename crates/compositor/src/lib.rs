//! Clipdeck Compositor
//!
//! Frame-accurate preview of a timeline. Given a query time the compositor
//! produces the exact drawables the exported video would show at that
//! time: fitted sprites with Ken-Burns motion, cross-dissolve blends and
//! fading captions.
//!
//! # Frame pipeline
//!
//! ```text
//! PlaybackClock ──► RenderScheduler ──► resolver ──► Compositor ──► Scene
//!                        ▲                               │
//!    seek / select ──────┘                  TexturePool ◄┤► SpritePool
//!    governor events ─────────────────────────────┘
//! ```
//!
//! The compositor never blocks on a texture. A miss renders a loading
//! placeholder and the session re-renders when the load completes.

pub mod compositor;
pub mod kenburns;
pub mod resolver;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod text;

pub use compositor::*;
pub use kenburns::*;
pub use resolver::*;
pub use scene::*;
pub use scheduler::*;
pub use session::*;
pub use text::*;
