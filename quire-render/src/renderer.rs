//! Output driver that walks a `TextLayout` through the glyph atlas into a
//! single `show_layout()` call per frame.

use log::{debug, warn};
use quire_core::{to_px, Color, Fixed, FIXED_ONE};
use quire_text::{
    AtlasError, AtlasPlacement, GlyphAtlas, LayoutCommand, SubPixelArrangement, TextLayout,
};
use thiserror::Error;

use crate::bridge::{atlas_quad, solid_quad};
use crate::vertex::QuadInstance;

/// Side of the opaque region sharp rectangles sample, in 1/64 px.
const SOLID: Fixed = 3 * FIXED_ONE;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("command {index} does not fit an empty {size}x{size} atlas")]
    TooLarge { index: usize, size: u32 },
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

/// Whatever actually puts pixels on screen (a GPU pipeline, a software
/// rasterizer, a recorder in tests).
pub trait RenderTarget {
    /// Replace the atlas texture with `data` (`size`×`size`, one byte per
    /// texel).
    fn upload_atlas(&mut self, data: &[u8], size: u32);

    /// Draw `quads` in order, sampling the most recently uploaded atlas.
    fn draw_quads(&mut self, quads: &[QuadInstance]);

    /// Draw an external image; positions are device pixels.
    fn draw_image(&mut self, x: f32, y: f32, w: f32, h: f32, url: &str);
}

/// Counters for one `show_layout` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Atlas fill-and-draw rounds.
    pub passes: u32,
    /// Atlas texture uploads.
    pub uploads: u32,
    /// `draw_quads` calls.
    pub draw_calls: u32,
    pub quads: u32,
    pub images: u32,
    /// The atlas overflowed and was cleared at least once.
    pub atlas_cleared: bool,
}

/// One command with its pixels reserved, ready to emit.
#[derive(Clone, Copy, Debug)]
enum Reserved<'a> {
    Atlas {
        x: Fixed,
        y: Fixed,
        color: Color,
        placement: AtlasPlacement,
        columns: u32,
    },
    /// A sharp rectangle stretched over the solid region.
    Solid {
        x: Fixed,
        y: Fixed,
        w: Fixed,
        h: Fixed,
        color: Color,
    },
    Image {
        x: Fixed,
        y: Fixed,
        w: Fixed,
        h: Fixed,
        url: &'a str,
    },
}

/// Draws layouts through a persistent [`GlyphAtlas`].
///
/// The atlas survives between frames, so a layout drawn twice uploads
/// nothing the second time. When a frame needs more than the atlas holds,
/// the commands are drawn in several passes with the atlas cleared in
/// between; drawing order is always the layout's command order.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = LayoutRenderer::new(1024, SubPixelArrangement::None);
/// let stats = renderer.show_layout(&layout, 0, 0, &mut target)?;
/// ```
pub struct LayoutRenderer {
    atlas: GlyphAtlas,
    subpixel: SubPixelArrangement,
    quads: Vec<QuadInstance>,
}

impl LayoutRenderer {
    pub fn new(atlas_size: u32, subpixel: SubPixelArrangement) -> Self {
        Self {
            atlas: GlyphAtlas::new(atlas_size),
            subpixel,
            quads: Vec::new(),
        }
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn subpixel(&self) -> SubPixelArrangement {
        self.subpixel
    }

    /// Draw `layout` with its origin at `(sx, sy)` (1/64 px).
    pub fn show_layout(
        &mut self,
        layout: &TextLayout,
        sx: Fixed,
        sy: Fixed,
        target: &mut impl RenderTarget,
    ) -> Result<FrameStats, RenderError> {
        let commands = layout.commands();
        let mut stats = FrameStats::default();
        let mut reserved = Vec::new();
        let mut start = 0;

        while start < commands.len() {
            let version = self.atlas.version();
            let solid = self.atlas.rect(SOLID, SOLID, SubPixelArrangement::None, 0)?;
            if self.atlas.version() != version {
                stats.atlas_cleared = true;
            }
            // Only the solid region: nothing from earlier frames to evict.
            let fresh = self.atlas.len() == 1;

            reserved.clear();
            for (index, command) in commands.iter().enumerate().skip(start) {
                match self.reserve(command, index)? {
                    Some(r) => reserved.push(r),
                    None => break,
                }
            }

            if reserved.is_empty() {
                if fresh {
                    return Err(RenderError::TooLarge {
                        index: start,
                        size: self.atlas.size(),
                    });
                }
                debug!("atlas holds stale regions, clearing before command {start}");
                self.atlas.clear();
                stats.atlas_cleared = true;
                continue;
            }
            stats.passes += 1;

            if self.atlas.is_dirty() {
                target.upload_atlas(self.atlas.data(), self.atlas.size());
                self.atlas.mark_uploaded();
                stats.uploads += 1;
            }

            let end = start + reserved.len();
            for slot in &reserved {
                match *slot {
                    Reserved::Atlas { x, y, color, placement, columns } => {
                        if !placement.is_empty() {
                            self.quads
                                .push(atlas_quad(x + sx, y + sy, &placement, columns, color));
                        }
                    }
                    Reserved::Solid { x, y, w, h, color } => {
                        self.quads.push(solid_quad(x + sx, y + sy, w, h, &solid, color));
                    }
                    Reserved::Image { x, y, w, h, url } => {
                        self.flush(target, &mut stats);
                        target.draw_image(to_px(x + sx), to_px(y + sy), to_px(w), to_px(h), url);
                        stats.images += 1;
                    }
                }
            }
            self.flush(target, &mut stats);

            if end < commands.len() {
                warn!(
                    "glyph atlas full after {} of {} commands, clearing",
                    end,
                    commands.len()
                );
                self.atlas.clear();
                stats.atlas_cleared = true;
            }
            start = end;
        }

        debug!(
            "frame: {} passes, {} uploads, {} quads, {} images",
            stats.passes, stats.uploads, stats.quads, stats.images
        );
        Ok(stats)
    }

    /// Reserve atlas space for one command; `None` when the atlas is full.
    fn reserve<'a>(
        &mut self,
        command: &'a LayoutCommand,
        index: usize,
    ) -> Result<Option<Reserved<'a>>, RenderError> {
        let result = match *command {
            LayoutCommand::Glyph {
                x,
                y,
                ref face,
                glyph,
                color,
                blur,
            } => {
                let columns = match self.subpixel {
                    SubPixelArrangement::Rgb | SubPixelArrangement::Bgr if blur == 0 => 3,
                    _ => 1,
                };
                self.atlas.try_glyph(face, glyph, self.subpixel, blur).map(|p| {
                    p.map(|placement| Reserved::Atlas { x, y, color, placement, columns })
                })
            }
            LayoutCommand::Rect { x, y, w, h, color, blur: 0 } => {
                Ok(Some(Reserved::Solid { x, y, w, h, color }))
            }
            LayoutCommand::Rect { x, y, w, h, color, blur } => self
                .atlas
                .try_rect(w, h, SubPixelArrangement::None, blur)
                .map(|p| {
                    p.map(|placement| Reserved::Atlas {
                        x,
                        y,
                        color,
                        placement,
                        columns: 1,
                    })
                }),
            LayoutCommand::Image { x, y, w, h, ref url } => {
                Ok(Some(Reserved::Image { x, y, w, h, url }))
            }
        };

        result.map_err(|e| match e {
            AtlasError::TooLarge { size, .. } => RenderError::TooLarge { index, size },
            other => RenderError::Atlas(other),
        })
    }

    fn flush(&mut self, target: &mut impl RenderTarget, stats: &mut FrameStats) {
        if self.quads.is_empty() {
            return;
        }
        target.draw_quads(&self.quads);
        stats.draw_calls += 1;
        stats.quads += self.quads.len() as u32;
        self.quads.clear();
    }
}

impl std::fmt::Debug for LayoutRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRenderer")
            .field("atlas", &self.atlas)
            .field("subpixel", &self.subpixel)
            .finish()
    }
}

// ===================================================================
// Tests
// ===================================================================
