//! Drawing command → quad conversion.
//!
//! Layout coordinates are 1/64 px; quads are in device pixels. Atlas
//! placements carry the bitmap's offset from the pen position (glyphs) or
//! the rectangle's corner (blurred rects), with `top` counting upwards.

use quire_core::{to_px, Color, Fixed};
use quire_text::AtlasPlacement;

use crate::vertex::QuadInstance;

/// Quad for an atlas-backed bitmap anchored at `(x, y)`.
///
/// `columns` is the number of atlas columns per device pixel: 3 for
/// sub-pixel glyphs, 1 otherwise.
pub fn atlas_quad(
    x: Fixed,
    y: Fixed,
    placement: &AtlasPlacement,
    columns: u32,
    color: Color,
) -> QuadInstance {
    let columns = columns.max(1) as f32;
    let [u0, v0, u1, v1] = placement.uv();
    QuadInstance::new(
        to_px(x) + placement.left as f32 / columns,
        to_px(y) - placement.top as f32,
        placement.width as f32 / columns,
        placement.height as f32,
        [u0, v0],
        [u1, v1],
        color.to_f32(),
    )
}

/// Quad for a sharp rectangle, sampling the centre of the solid region.
pub fn solid_quad(
    x: Fixed,
    y: Fixed,
    w: Fixed,
    h: Fixed,
    solid: &AtlasPlacement,
    color: Color,
) -> QuadInstance {
    let [u0, v0, u1, v1] = solid.uv();
    let centre = [(u0 + u1) / 2.0, (v0 + v1) / 2.0];
    QuadInstance::new(
        to_px(x),
        to_px(y),
        to_px(w),
        to_px(h),
        centre,
        centre,
        color.to_f32(),
    )
}

// ===================================================================
// Tests
// ===================================================================
