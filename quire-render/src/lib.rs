//! # quire-render
//!
//! Back-end-agnostic output driver: walks a finished `TextLayout` through
//! the glyph atlas and hands instanced quads to a [`RenderTarget`].
//!
//! ## Architecture
//!
//! ```text
//!  TextLayout (quire-text)
//!       │
//!       ▼
//!  LayoutRenderer.show_layout()   ◀─── reserves atlas space per command (try_*)
//!       │             ▲
//!       │             └── atlas full: flush, clear, continue with the rest
//!       ▼
//!  bridge::atlas_quad / solid_quad ◀─── command + placement → QuadInstance
//!       │
//!       ▼
//!  RenderTarget.upload_atlas() / draw_quads() / draw_image()
//! ```
//!
//! ## Crate modules
//!
//! - [`vertex`]: per-instance quad data
//! - [`bridge`]: drawing command → quad conversion
//! - [`renderer`]: pass loop across atlas clears

pub mod bridge;
pub mod renderer;
pub mod vertex;

// Re-exports for convenience
pub use bridge::{atlas_quad, solid_quad};
pub use renderer::{FrameStats, LayoutRenderer, RenderError, RenderTarget};
pub use vertex::QuadInstance;
