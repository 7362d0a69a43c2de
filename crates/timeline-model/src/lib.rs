//! Clipdeck Timeline Model
//!
//! Defines the data contracts the preview core reads:
//! - **Assets:** Imported media (image, video, audio) and the library holding them
//! - **Clips:** Placed instances of assets with timing, Ken-Burns motion,
//!   transitions, and text overlays
//! - **Timeline:** Ordered video and audio tracks of clips, with validation
//! - **Documents:** The JSON project file tying assets and timeline together
//!
//! Times are seconds as `f64`. Positions are pixel offsets from the canvas
//! center.

pub mod asset;
pub mod clip;
pub mod document;
pub mod geometry;
pub mod timeline;

pub use asset::*;
pub use clip::*;
pub use document::*;
pub use geometry::*;
pub use timeline::*;
