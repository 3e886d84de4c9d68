//! Glyph atlas: a CPU-side single-channel texture shared by glyph
//! bitmaps and rectangle masks.
//!
//! Regions are packed with a row-based "shelf" allocator. Each shelf's
//! height is set by the first bitmap that opens it; a bitmap that fits no
//! existing shelf opens a new one below the last.
//!
//! There is no partial eviction. When a new bitmap does not fit,
//! [`GlyphAtlas::glyph`] and [`GlyphAtlas::rect`] clear the whole atlas and
//! bump [`GlyphAtlas::version`]; every placement handed out before that is
//! stale. Renderers that must flush geometry before a clear use the
//! `try_*` variants, which never clear.

use quire_core::{Fixed, FIXED_ONE};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::fonts::{FontError, FontFace, GlyphBitmap, SubPixelArrangement};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    #[error("{width}x{height} bitmap cannot fit a {size}x{size} atlas")]
    TooLarge { width: u32, height: u32, size: u32 },

    #[error(transparent)]
    Font(#[from] FontError),
}

/// Where a bitmap lives in the atlas, in atlas pixels.
///
/// `left`/`top` offset the bitmap from the pen position (glyphs) or the
/// rectangle's top-left corner (rects); `top` counts upwards for glyphs.
/// With a sub-pixel arrangement `width` counts sub-pixel columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasPlacement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    atlas_size: u32,
}

impl AtlasPlacement {
    /// Normalized `[u_min, v_min, u_max, v_max]`.
    pub fn uv(&self) -> [f32; 4] {
        let inv = 1.0 / self.atlas_size.max(1) as f32;
        [
            self.x as f32 * inv,
            self.y as f32 * inv,
            (self.x + self.width) as f32 * inv,
            (self.y + self.height) as f32 * inv,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum AtlasKey {
    Glyph {
        face: u64,
        glyph: u32,
        subpixel: SubPixelArrangement,
        blur: u16,
    },
    Rect {
        w: Fixed,
        h: Fixed,
        subpixel: SubPixelArrangement,
        blur: u16,
    },
}

/// Shelf (row) in the atlas.
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// Fixed-size single-channel glyph and rectangle cache.
pub struct GlyphAtlas {
    size: u32,
    data: Vec<u8>,
    dirty: bool,
    version: u32,
    placements: FxHashMap<AtlasKey, AtlasPlacement>,
    shelves: Vec<Shelf>,
    padding: u32,
    /// Last bitmap that failed to fit, kept so the retry after a clear
    /// does not rasterize it again.
    pending: Option<(AtlasKey, GlyphBitmap)>,
}

impl GlyphAtlas {
    /// Square atlas of `size`×`size` pixels with 1 px padding between
    /// regions.
    pub fn new(size: u32) -> Self {
        Self::with_padding(size, 1)
    }

    pub fn with_padding(size: u32, padding: u32) -> Self {
        Self {
            size,
            data: vec![0u8; (size as usize) * (size as usize)],
            dirty: false,
            version: 0,
            placements: FxHashMap::default(),
            shelves: Vec::new(),
            padding,
            pending: None,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Coverage bytes, row-major, `size * size` long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Incremented by every clear.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Data changed since the last [`mark_uploaded`](Self::mark_uploaded).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    /// Number of cached placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Drop everything. All placements handed out so far become invalid.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.placements.clear();
        self.shelves.clear();
        self.version = self.version.wrapping_add(1);
        self.dirty = true;
    }

    /// Placement for a glyph, clearing the atlas if it is full.
    ///
    /// A positive `blur` forces grey-scale rendering and grows the bitmap
    /// by `blur` pixels on every side.
    pub fn glyph(
        &mut self,
        face: &FontFace,
        glyph: u32,
        subpixel: SubPixelArrangement,
        blur: u16,
    ) -> Result<AtlasPlacement, AtlasError> {
        let key = glyph_key(face, glyph, subpixel, blur);
        self.get_or_clear(key, |sp| rasterize_glyph(face, glyph, sp, blur))
    }

    /// Like [`glyph`](Self::glyph) but never clears: `Ok(None)` when full.
    pub fn try_glyph(
        &mut self,
        face: &FontFace,
        glyph: u32,
        subpixel: SubPixelArrangement,
        blur: u16,
    ) -> Result<Option<AtlasPlacement>, AtlasError> {
        let key = glyph_key(face, glyph, subpixel, blur);
        self.try_get(key, |sp| rasterize_glyph(face, glyph, sp, blur))
    }

    /// Placement for a filled `w`×`h` (1/64 px) rectangle mask, clearing
    /// the atlas if it is full.
    pub fn rect(
        &mut self,
        w: Fixed,
        h: Fixed,
        subpixel: SubPixelArrangement,
        blur: u16,
    ) -> Result<AtlasPlacement, AtlasError> {
        let key = rect_key(w, h, subpixel, blur);
        self.get_or_clear(key, |sp| Ok(rect_mask(w, h, sp, blur)))
    }

    pub fn try_rect(
        &mut self,
        w: Fixed,
        h: Fixed,
        subpixel: SubPixelArrangement,
        blur: u16,
    ) -> Result<Option<AtlasPlacement>, AtlasError> {
        let key = rect_key(w, h, subpixel, blur);
        self.try_get(key, |sp| Ok(rect_mask(w, h, sp, blur)))
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    fn get_or_clear(
        &mut self,
        key: AtlasKey,
        render: impl Fn(SubPixelArrangement) -> Result<GlyphBitmap, AtlasError>,
    ) -> Result<AtlasPlacement, AtlasError> {
        if let Some(placement) = self.try_get(key, &render)? {
            return Ok(placement);
        }
        log::warn!(
            "glyph atlas full ({} regions), clearing (version {} -> {})",
            self.placements.len(),
            self.version,
            self.version.wrapping_add(1)
        );
        self.clear();
        match self.try_get(key, &render)? {
            Some(placement) => Ok(placement),
            None => Err(self.too_large(key)),
        }
    }

    fn try_get(
        &mut self,
        key: AtlasKey,
        render: impl Fn(SubPixelArrangement) -> Result<GlyphBitmap, AtlasError>,
    ) -> Result<Option<AtlasPlacement>, AtlasError> {
        if let Some(placement) = self.placements.get(&key) {
            return Ok(Some(*placement));
        }

        let bitmap = match self.pending.take() {
            Some((pending_key, bitmap)) if pending_key == key => bitmap,
            other => {
                self.pending = other;
                render(key_subpixel(&key))?
            }
        };

        let padded_w = bitmap.width + self.padding;
        let padded_h = bitmap.rows + self.padding;
        if padded_w > self.size || padded_h > self.size {
            return Err(AtlasError::TooLarge {
                width: bitmap.width,
                height: bitmap.rows,
                size: self.size,
            });
        }

        if bitmap.is_empty() {
            let placement = self.placement(0, 0, &bitmap);
            self.placements.insert(key, placement);
            return Ok(Some(placement));
        }

        let Some((x, y)) = self.allocate(bitmap.width, bitmap.rows) else {
            self.pending = Some((key, bitmap));
            return Ok(None);
        };
        self.blit(x, y, &bitmap);
        let placement = self.placement(x, y, &bitmap);
        self.placements.insert(key, placement);
        self.dirty = true;
        Ok(Some(placement))
    }

    fn too_large(&mut self, key: AtlasKey) -> AtlasError {
        let (width, height) = self
            .pending
            .as_ref()
            .filter(|(k, _)| *k == key)
            .map_or((0, 0), |(_, b)| (b.width, b.rows));
        AtlasError::TooLarge {
            width,
            height,
            size: self.size,
        }
    }

    fn placement(&self, x: u32, y: u32, bitmap: &GlyphBitmap) -> AtlasPlacement {
        AtlasPlacement {
            x,
            y,
            width: bitmap.width,
            height: bitmap.rows,
            left: bitmap.left,
            top: bitmap.top,
            atlas_size: self.size,
        }
    }

    /// Allocate a region using shelf packing.
    fn allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let padded_w = width + self.padding;
        let padded_h = height + self.padding;

        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.size {
                let at = (shelf.cursor_x, shelf.y);
                shelf.cursor_x += padded_w;
                return Some(at);
            }
        }

        let shelf_y = self.shelves.last().map_or(0, |s| s.y + s.height);
        if shelf_y + padded_h > self.size || padded_w > self.size {
            return None;
        }
        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });
        Some((0, shelf_y))
    }

    fn blit(&mut self, x: u32, y: u32, bitmap: &GlyphBitmap) {
        let w = bitmap.width as usize;
        for row in 0..bitmap.rows as usize {
            let src = &bitmap.pixels[row * w..(row + 1) * w];
            let dst = (y as usize + row) * self.size as usize + x as usize;
            self.data[dst..dst + w].copy_from_slice(src);
        }
    }
}

impl std::fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("size", &self.size)
            .field("version", &self.version)
            .field("regions", &self.placements.len())
            .field("shelves", &self.shelves.len())
            .finish()
    }
}

/// Blurred entries are always grey-scale.
fn effective_subpixel(subpixel: SubPixelArrangement, blur: u16) -> SubPixelArrangement {
    if blur > 0 {
        SubPixelArrangement::None
    } else {
        subpixel
    }
}

fn glyph_key(face: &FontFace, glyph: u32, subpixel: SubPixelArrangement, blur: u16) -> AtlasKey {
    AtlasKey::Glyph {
        face: face.id(),
        glyph,
        subpixel: effective_subpixel(subpixel, blur),
        blur,
    }
}

fn rect_key(w: Fixed, h: Fixed, subpixel: SubPixelArrangement, blur: u16) -> AtlasKey {
    AtlasKey::Rect {
        w,
        h,
        subpixel: effective_subpixel(subpixel, blur),
        blur,
    }
}

fn key_subpixel(key: &AtlasKey) -> SubPixelArrangement {
    match key {
        AtlasKey::Glyph { subpixel, .. } | AtlasKey::Rect { subpixel, .. } => *subpixel,
    }
}

fn rasterize_glyph(
    face: &FontFace,
    glyph: u32,
    subpixel: SubPixelArrangement,
    blur: u16,
) -> Result<GlyphBitmap, AtlasError> {
    let bitmap = face.rasterize(glyph, subpixel)?;
    Ok(blurred(bitmap, blur))
}

fn rect_mask(w: Fixed, h: Fixed, subpixel: SubPixelArrangement, blur: u16) -> GlyphBitmap {
    let columns = match subpixel {
        SubPixelArrangement::None => 1,
        SubPixelArrangement::Rgb | SubPixelArrangement::Bgr => 3,
    };
    let to_px = |v: Fixed| ((v.max(0) + FIXED_ONE - 1) / FIXED_ONE) as u32;
    let width = to_px(w) * columns;
    let rows = to_px(h);
    let mask = GlyphBitmap {
        width,
        rows,
        left: 0,
        top: 0,
        pixels: vec![255; (width * rows) as usize],
    };
    blurred(mask, blur)
}

/// Pad by `radius` on each side and apply a separable box blur.
fn blurred(bitmap: GlyphBitmap, radius: u16) -> GlyphBitmap {
    if radius == 0 || bitmap.is_empty() {
        return bitmap;
    }
    let r = radius as usize;
    let w = bitmap.width as usize + 2 * r;
    let h = bitmap.rows as usize + 2 * r;

    let mut padded = vec![0u8; w * h];
    for row in 0..bitmap.rows as usize {
        let src = &bitmap.pixels[row * bitmap.width as usize..(row + 1) * bitmap.width as usize];
        let dst = (row + r) * w + r;
        padded[dst..dst + src.len()].copy_from_slice(src);
    }

    GlyphBitmap {
        width: w as u32,
        rows: h as u32,
        left: bitmap.left - radius as i32,
        top: bitmap.top + radius as i32,
        pixels: box_blur(&padded, w, h, r),
    }
}

fn box_blur(pixels: &[u8], w: usize, h: usize, r: usize) -> Vec<u8> {
    let window = (2 * r + 1) as u32;
    let mut horizontal = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(w - 1);
            let sum: u32 = pixels[y * w + lo..=y * w + hi].iter().map(|&p| p as u32).sum();
            horizontal[y * w + x] = (sum / window) as u8;
        }
    }
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let lo = y.saturating_sub(r);
        let hi = (y + r).min(h - 1);
        for x in 0..w {
            let sum: u32 = (lo..=hi).map(|yy| horizontal[yy * w + x] as u32).sum();
            out[y * w + x] = (sum / window) as u8;
        }
    }
    out
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontCache, FontResource};
    use crate::synthetic::SyntheticBackend;
    use std::rc::Rc;

    // Synthetic 20 px face: glyph bitmaps are 10×16.
    fn face() -> (Rc<FontFace>, Rc<crate::synthetic::SyntheticStats>) {
        let backend = SyntheticBackend::new();
        let stats = backend.stats();
        let cache = FontCache::new(backend);
        (cache.face(&FontResource::new("box"), 1280).unwrap(), stats)
    }

    const NONE: SubPixelArrangement = SubPixelArrangement::None;

    #[test]
    fn test_atlas_creation() {
        let atlas = GlyphAtlas::new(256);
        assert_eq!(atlas.size(), 256);
        assert_eq!(atlas.data().len(), 256 * 256);
        assert!(atlas.is_empty());
        assert!(!atlas.is_dirty());
        assert_eq!(atlas.version(), 0);
    }

    #[test]
    fn test_same_key_same_placement() {
        let (face, stats) = face();
        let mut atlas = GlyphAtlas::new(256);
        let a = atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap();
        let b = atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!((a.width, a.height, a.top), (10, 16, 16));
        assert_eq!(atlas.version(), 0);
        assert_eq!(atlas.len(), 1);
        assert_eq!(stats.rasterized(), 1);
        assert!(atlas.is_dirty());
    }

    #[test]
    fn test_blit_copies_pixels() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(64);
        let p = atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap();
        assert_eq!((p.x, p.y), (0, 0));
        assert_eq!(atlas.data()[0], 255);
        assert_eq!(atlas.data()[9], 255);
        // Padding column stays empty.
        assert_eq!(atlas.data()[10], 0);
    }

    #[test]
    fn test_shelf_packing() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(64);
        // 11 px per padded glyph: five per shelf.
        let placements: Vec<_> = ('a'..='f')
            .map(|c| atlas.glyph(&face, c as u32, NONE, 0).unwrap())
            .collect();
        assert_eq!(placements[4].x, 44);
        assert_eq!((placements[5].x, placements[5].y), (0, 17));
        assert_eq!(atlas.shelves.len(), 2);
    }

    #[test]
    fn test_overflow_clears_exactly_once() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(64);
        // Capacity is 5 × 3 = 15 glyphs.
        for c in 'a'..='o' {
            atlas.glyph(&face, c as u32, NONE, 0).unwrap();
        }
        assert_eq!(atlas.version(), 0);
        assert_eq!(atlas.len(), 15);

        let p = atlas.glyph(&face, 'p' as u32, NONE, 0).unwrap();
        assert_eq!(atlas.version(), 1);
        assert_eq!(atlas.len(), 1);
        assert_eq!((p.x, p.y), (0, 0));
    }

    #[test]
    fn test_rasterizes_again_after_clear() {
        let (face, stats) = face();
        let mut atlas = GlyphAtlas::new(64);
        atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap();
        for c in 'b'..='p' {
            atlas.glyph(&face, c as u32, NONE, 0).unwrap();
        }
        assert_eq!(atlas.version(), 1);
        assert_eq!(stats.rasterized(), 16);
        atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap();
        assert_eq!(stats.rasterized(), 17);
    }

    #[test]
    fn test_try_never_clears() {
        let (face, stats) = face();
        let mut atlas = GlyphAtlas::new(64);
        for c in 'a'..='o' {
            assert!(atlas.try_glyph(&face, c as u32, NONE, 0).unwrap().is_some());
        }
        assert_eq!(atlas.try_glyph(&face, 'p' as u32, NONE, 0).unwrap(), None);
        assert_eq!(atlas.version(), 0);
        assert_eq!(atlas.len(), 15);

        // The failed bitmap is reused after an explicit clear.
        atlas.clear();
        assert!(atlas.try_glyph(&face, 'p' as u32, NONE, 0).unwrap().is_some());
        assert_eq!(stats.rasterized(), 16);
    }

    #[test]
    fn test_too_large() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(8);
        let err = atlas.glyph(&face, 'a' as u32, NONE, 0).unwrap_err();
        assert_eq!(
            err,
            AtlasError::TooLarge {
                width: 10,
                height: 16,
                size: 8
            }
        );
        assert!(atlas.try_glyph(&face, 'a' as u32, NONE, 0).is_err());
    }

    #[test]
    fn test_whitespace_glyph_takes_no_space() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(64);
        let p = atlas.glyph(&face, ' ' as u32, NONE, 0).unwrap();
        assert!(p.is_empty());
        assert!(atlas.shelves.is_empty());
    }

    #[test]
    fn test_subpixel_and_blur() {
        let (face, _) = face();
        let mut atlas = GlyphAtlas::new(256);
        let lcd = atlas.glyph(&face, 'a' as u32, SubPixelArrangement::Rgb, 0).unwrap();
        assert_eq!(lcd.width, 30);

        let soft = atlas.glyph(&face, 'a' as u32, SubPixelArrangement::Rgb, 2).unwrap();
        assert_eq!((soft.width, soft.height), (14, 20));
        assert_eq!((soft.left, soft.top), (-2, 18));
        // Sub-pixel mode is irrelevant once blurred.
        assert_eq!(soft, atlas.glyph(&face, 'a' as u32, NONE, 2).unwrap());
    }

    #[test]
    fn test_rect_masks() {
        let mut atlas = GlyphAtlas::new(64);
        let sharp = atlas.rect(640, 100, NONE, 0).unwrap();
        assert_eq!((sharp.width, sharp.height), (10, 2));
        let blurred = atlas.rect(640, 100, NONE, 3).unwrap();
        assert_eq!((blurred.width, blurred.height), (16, 8));
        assert_eq!((blurred.left, blurred.top), (-3, 3));
        assert_eq!(atlas.len(), 2);
    }

    #[test]
    fn test_box_blur_spreads_evenly() {
        let mut pixels = vec![0u8; 9];
        pixels[4] = 255;
        let out = box_blur(&pixels, 3, 3, 1);
        assert!(out.iter().all(|&p| p == 28));
    }

    #[test]
    fn test_uv() {
        let p = AtlasPlacement {
            x: 64,
            y: 0,
            width: 64,
            height: 128,
            left: 0,
            top: 0,
            atlas_size: 256,
        };
        assert_eq!(p.uv(), [0.25, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_mark_uploaded() {
        let mut atlas = GlyphAtlas::new(64);
        atlas.rect(64, 64, NONE, 0).unwrap();
        assert!(atlas.is_dirty());
        atlas.mark_uploaded();
        assert!(!atlas.is_dirty());
        atlas.clear();
        assert!(atlas.is_dirty());
    }
}
