//! Instance data for the quads a back-end draws.
//!
//! The type derives `bytemuck::Pod` + `Zeroable` so a slice of instances
//! can be uploaded to a GPU buffer without copying.

use bytemuck::{Pod, Zeroable};

/// One textured quad sampling the glyph atlas.
///
/// Glyphs, blurred rectangles and sharp rectangles (which sample a solid
/// atlas region) all use this layout. 48 bytes per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadInstance {
    /// Top-left corner in device pixels.
    pub position: [f32; 2],
    /// Width and height in device pixels.
    pub size: [f32; 2],
    /// Atlas UV top-left.
    pub uv_min: [f32; 2],
    /// Atlas UV bottom-right.
    pub uv_max: [f32; 2],
    /// RGBA, each channel in [0.0, 1.0]; modulates atlas coverage.
    pub color: [f32; 4],
}

impl QuadInstance {
    pub fn new(
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        uv_min: [f32; 2],
        uv_max: [f32; 2],
        color: [f32; 4],
    ) -> Self {
        Self {
            position: [x, y],
            size: [w, h],
            uv_min,
            uv_max,
            color,
        }
    }

    /// Right and bottom edges.
    pub fn max(&self) -> [f32; 2] {
        [
            self.position[0] + self.size[0],
            self.position[1] + self.size[1],
        ]
    }
}

// ===================================================================
// Tests
// ===================================================================
