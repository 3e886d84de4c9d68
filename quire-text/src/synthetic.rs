//! Deterministic metric-only back-end.
//!
//! Every glyph is a solid box; metrics are fixed fractions of the em size.
//! Used by the tests and for headless measurement where the exact glyph
//! outlines do not matter.

use std::cell::Cell;
use std::rc::Rc;

use quire_core::{Fixed, FIXED_ONE};

use crate::fonts::{
    FaceMetrics, FontBackend, FontError, FontResource, FontSize, GlyphBitmap, GlyphSource,
    SubPixelArrangement,
};

/// Counters shared between a [`SyntheticBackend`] and the faces it opened.
#[derive(Debug, Default)]
pub struct SyntheticStats {
    opened: Cell<usize>,
    rasterized: Cell<usize>,
}

impl SyntheticStats {
    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    pub fn rasterized(&self) -> usize {
        self.rasterized.get()
    }
}

/// Box-glyph font back-end: advance ½ em, ascender ⅘ em, descender ⅕ em.
///
/// Any non-empty source opens; the empty source fails, which gives tests
/// a way to exercise open errors.
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    stats: Rc<SyntheticStats>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle on the counters; stays valid after the back-end is moved into
    /// a cache.
    pub fn stats(&self) -> Rc<SyntheticStats> {
        Rc::clone(&self.stats)
    }
}

impl FontBackend for SyntheticBackend {
    fn open(
        &self,
        resource: &FontResource,
        size: FontSize,
    ) -> Result<Box<dyn GlyphSource>, FontError> {
        if resource.source.is_empty() {
            return Err(FontError::Open {
                resource: String::new(),
                reason: "empty font source".into(),
            });
        }
        self.stats.opened.set(self.stats.opened.get() + 1);
        Ok(Box::new(SyntheticFace {
            em: size as Fixed,
            stats: Rc::clone(&self.stats),
        }))
    }
}

struct SyntheticFace {
    em: Fixed,
    stats: Rc<SyntheticStats>,
}

impl GlyphSource for SyntheticFace {
    fn metrics(&self) -> FaceMetrics {
        let ascender = self.em * 4 / 5;
        let descender = self.em / 5;
        FaceMetrics {
            ascender,
            descender,
            line_height: ascender + descender,
            underline_position: self.em / 10,
            underline_thickness: (self.em / 16).max(FIXED_ONE),
        }
    }

    fn glyph_index(&self, ch: char) -> Option<u32> {
        Some(ch as u32)
    }

    fn advance(&self, _glyph: u32) -> Fixed {
        self.em / 2
    }

    fn rasterize(
        &self,
        glyph: u32,
        subpixel: SubPixelArrangement,
    ) -> Result<GlyphBitmap, FontError> {
        self.stats.rasterized.set(self.stats.rasterized.get() + 1);

        let blank = char::from_u32(glyph).map_or(false, char::is_whitespace);
        if blank {
            return Ok(GlyphBitmap::default());
        }

        let columns = match subpixel {
            SubPixelArrangement::None => 1,
            SubPixelArrangement::Rgb | SubPixelArrangement::Bgr => 3,
        };
        let width = ((self.em / 2 / FIXED_ONE).max(1) as u32) * columns;
        let rows = (self.em * 4 / 5 / FIXED_ONE).max(1) as u32;
        let mut pixels = vec![255; (width * rows) as usize];
        if columns == 3 {
            // Ink starts a third into the first pixel.
            for row in pixels.chunks_exact_mut(width as usize) {
                row[0] = 0;
                row[1] = 128;
            }
        }
        Ok(GlyphBitmap {
            width,
            rows,
            left: 0,
            top: rows as i32,
            pixels,
        }
        .with_subpixel_order(subpixel))
    }
}

// ===================================================================
// Tests
// ===================================================================
