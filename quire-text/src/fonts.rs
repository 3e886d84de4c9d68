//! Font resources, families and the shared face cache.
//!
//! ## Architecture
//!
//! ```text
//! FontFamily ("serif")
//!   ├── members: Vec<FontResource>        (file + style axes, in add order)
//!   └── resolve(size, axes) ──┐
//!                             ▼
//! FontCache (Rc, shared by every family)
//!   ├── backend: Box<dyn FontBackend>     (font-kit, synthetic, ...)
//!   └── faces: (source, size) → Rc<FontFace>
//! ```
//!
//! A face is opened once per `(source, size)` and shared by every layout
//! that uses it. Faces get a process-unique id so caches keyed on them
//! (the glyph atlas) never confuse two faces of the same file at different
//! sizes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use quire_core::Fixed;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Font size in 1/64 pixel (the em square).
pub type FontSize = u32;

// ── Axes ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim() {
            "normal" => Some(Self::Normal),
            "italic" => Some(Self::Italic),
            "oblique" => Some(Self::Oblique),
            _ => None,
        }
    }

    pub fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

impl FontVariant {
    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim() {
            "normal" => Some(Self::Normal),
            "small-caps" => Some(Self::SmallCaps),
            _ => None,
        }
    }

    pub fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::SmallCaps => "small-caps",
        }
    }
}

/// Font stretch / width class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

impl FontStretch {
    pub fn from_css(value: &str) -> Option<Self> {
        let stretch = match value.trim() {
            "ultra-condensed" => Self::UltraCondensed,
            "extra-condensed" => Self::ExtraCondensed,
            "condensed" => Self::Condensed,
            "semi-condensed" => Self::SemiCondensed,
            "normal" => Self::Normal,
            "semi-expanded" => Self::SemiExpanded,
            "expanded" => Self::Expanded,
            "extra-expanded" => Self::ExtraExpanded,
            "ultra-expanded" => Self::UltraExpanded,
            _ => return None,
        };
        Some(stretch)
    }

    pub fn as_css(self) -> &'static str {
        match self {
            Self::UltraCondensed => "ultra-condensed",
            Self::ExtraCondensed => "extra-condensed",
            Self::Condensed => "condensed",
            Self::SemiCondensed => "semi-condensed",
            Self::Normal => "normal",
            Self::SemiExpanded => "semi-expanded",
            Self::Expanded => "expanded",
            Self::ExtraExpanded => "extra-expanded",
            Self::UltraExpanded => "ultra-expanded",
        }
    }
}

pub const WEIGHT_NORMAL: u16 = 400;
pub const WEIGHT_BOLD: u16 = 700;

/// Parse a CSS `font-weight`: `normal`, `bold` or a number in 1..=1000.
pub fn weight_from_css(value: &str) -> Option<u16> {
    match value.trim() {
        "normal" => Some(WEIGHT_NORMAL),
        "bold" => Some(WEIGHT_BOLD),
        n => n.parse::<u16>().ok().filter(|w| (1..=1000).contains(w)),
    }
}

/// The four axes a face is selected on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontAxes {
    pub style: FontStyle,
    pub variant: FontVariant,
    pub weight: u16,
    pub stretch: FontStretch,
}

impl Default for FontAxes {
    fn default() -> Self {
        Self {
            style: FontStyle::Normal,
            variant: FontVariant::Normal,
            weight: WEIGHT_NORMAL,
            stretch: FontStretch::Normal,
        }
    }
}

impl FontAxes {
    /// Parse the four CSS values; `None` if any of them is not understood.
    pub fn from_css(style: &str, variant: &str, weight: &str, stretch: &str) -> Option<Self> {
        Some(Self {
            style: FontStyle::from_css(style)?,
            variant: FontVariant::from_css(variant)?,
            weight: weight_from_css(weight)?,
            stretch: FontStretch::from_css(stretch)?,
        })
    }
}

impl fmt::Display for FontAxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.style.as_css(),
            self.variant.as_css(),
            self.weight,
            self.stretch.as_css()
        )
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("cannot open font '{resource}': {reason}")]
    Open { resource: String, reason: String },

    #[error("cannot rasterize glyph {glyph} of '{resource}': {reason}")]
    Rasterize {
        resource: String,
        glyph: u32,
        reason: String,
    },

    #[error("no face in family '{family}' matches {axes}")]
    NoMatch { family: String, axes: FontAxes },
}

// ── Back-end traits ─────────────────────────────────────────────────

/// Vertical metrics of a sized face, all in 1/64 px.
///
/// `descender` and `underline_position` are positive *below* the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceMetrics {
    pub ascender: Fixed,
    pub descender: Fixed,
    pub line_height: Fixed,
    pub underline_position: Fixed,
    pub underline_thickness: Fixed,
}

/// How a glyph is rasterized for LCD screens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubPixelArrangement {
    #[default]
    None,
    Rgb,
    Bgr,
}

/// An 8-bit coverage bitmap.
///
/// `left`/`top` place the bitmap relative to the pen position on the
/// baseline (`top` counts upwards). With a sub-pixel arrangement the
/// bitmap is three columns per device pixel, stored in R, G, B order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub rows: u32,
    pub left: i32,
    pub top: i32,
    pub pixels: Vec<u8>,
}

impl GlyphBitmap {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    /// Reorder a sub-pixel bitmap sampled left to right into channel order.
    /// A BGR panel has blue on the left, so the outer samples of every
    /// pixel trade places.
    pub fn with_subpixel_order(mut self, subpixel: SubPixelArrangement) -> Self {
        if subpixel == SubPixelArrangement::Bgr && !self.is_empty() && self.width % 3 == 0 {
            for row in self.pixels.chunks_exact_mut(self.width as usize) {
                for pixel in row.chunks_exact_mut(3) {
                    pixel.swap(0, 2);
                }
            }
        }
        self
    }
}

/// A font file opened at one size.
pub trait GlyphSource {
    fn metrics(&self) -> FaceMetrics;
    fn glyph_index(&self, ch: char) -> Option<u32>;
    fn advance(&self, glyph: u32) -> Fixed;
    fn rasterize(&self, glyph: u32, subpixel: SubPixelArrangement)
        -> Result<GlyphBitmap, FontError>;
}

/// Opens font resources. The cache calls this at most once per
/// `(source, size)`.
pub trait FontBackend {
    fn open(&self, resource: &FontResource, size: FontSize)
        -> Result<Box<dyn GlyphSource>, FontError>;
}

// ── Resources and faces ─────────────────────────────────────────────

/// A font file (or other back-end identifier) plus the axes it covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FontResource {
    pub source: String,
    pub axes: FontAxes,
}

impl FontResource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            axes: FontAxes::default(),
        }
    }

    pub fn with_axes(mut self, axes: FontAxes) -> Self {
        self.axes = axes;
        self
    }
}

/// An opened, sized face. Shared through `Rc`; compare by id.
pub struct FontFace {
    id: u64,
    resource: FontResource,
    size: FontSize,
    metrics: FaceMetrics,
    source: Box<dyn GlyphSource>,
}

impl FontFace {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn resource(&self) -> &FontResource {
        &self.resource
    }

    pub fn size(&self) -> FontSize {
        self.size
    }

    pub fn metrics(&self) -> &FaceMetrics {
        &self.metrics
    }

    pub fn ascender(&self) -> Fixed {
        self.metrics.ascender
    }

    pub fn descender(&self) -> Fixed {
        self.metrics.descender
    }

    /// Glyph for `ch`, `0` (the missing glyph) if the face lacks it.
    pub fn glyph_index(&self, ch: char) -> u32 {
        self.source.glyph_index(ch).unwrap_or(0)
    }

    pub fn advance(&self, glyph: u32) -> Fixed {
        self.source.advance(glyph)
    }

    pub fn char_advance(&self, ch: char) -> Fixed {
        self.advance(self.glyph_index(ch))
    }

    pub fn rasterize(
        &self,
        glyph: u32,
        subpixel: SubPixelArrangement,
    ) -> Result<GlyphBitmap, FontError> {
        self.source.rasterize(glyph, subpixel)
    }
}

impl PartialEq for FontFace {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FontFace {}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("id", &self.id)
            .field("source", &self.resource.source)
            .field("size", &self.size)
            .finish()
    }
}

// ── Cache ───────────────────────────────────────────────────────────

/// Opened faces keyed by `(source, size)`.
///
/// Single-threaded: hand out `Rc<FontCache>`; interior mutability keeps
/// lookups available through shared references.
pub struct FontCache {
    backend: Box<dyn FontBackend>,
    faces: RefCell<FxHashMap<(String, FontSize), Rc<FontFace>>>,
    next_id: Cell<u64>,
}

impl FontCache {
    pub fn new(backend: impl FontBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            faces: RefCell::new(FxHashMap::default()),
            next_id: Cell::new(1),
        }
    }

    /// Convenience for the usual `Rc` handle.
    pub fn shared(backend: impl FontBackend + 'static) -> Rc<Self> {
        Rc::new(Self::new(backend))
    }

    /// Get or open the face for `resource` at `size`.
    pub fn face(&self, resource: &FontResource, size: FontSize) -> Result<Rc<FontFace>, FontError> {
        let key = (resource.source.clone(), size);
        if let Some(face) = self.faces.borrow().get(&key) {
            return Ok(Rc::clone(face));
        }

        let source = self.backend.open(resource, size)?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let face = Rc::new(FontFace {
            id,
            resource: resource.clone(),
            size,
            metrics: source.metrics(),
            source,
        });
        log::info!(
            "opened font '{}' at {}/64 px (face #{id})",
            resource.source,
            size
        );
        self.faces.borrow_mut().insert(key, Rc::clone(&face));
        Ok(face)
    }

    /// Number of distinct faces opened so far.
    pub fn len(&self) -> usize {
        self.faces.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FontCache({} faces)", self.len())
    }
}

// ── Family ──────────────────────────────────────────────────────────

/// Named set of resources differing in style axes.
#[derive(Clone)]
pub struct FontFamily {
    name: String,
    cache: Rc<FontCache>,
    members: Vec<FontResource>,
}

impl FontFamily {
    pub fn new(name: impl Into<String>, cache: Rc<FontCache>) -> Self {
        Self {
            name: name.into(),
            cache,
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, resource: FontResource) {
        self.members.push(resource);
    }

    pub fn members(&self) -> &[FontResource] {
        &self.members
    }

    /// Pick the member closest to `axes` and open it at `size`.
    ///
    /// On style, variant and stretch a member is eligible if it matches
    /// exactly or is `normal` there; among the eligible, exact matches beat
    /// normal ones in the order stretch, style, variant, and the weight
    /// closest to the request wins. Ties keep the earliest added member.
    pub fn resolve(&self, size: FontSize, axes: &FontAxes) -> Result<Rc<FontFace>, FontError> {
        match best_match(&self.members, axes) {
            Some(resource) => self.cache.face(resource, size),
            None => Err(FontError::NoMatch {
                family: self.name.clone(),
                axes: *axes,
            }),
        }
    }
}

impl fmt::Debug for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFamily")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

// ── Matching internals ──────────────────────────────────────────────

fn best_match<'a>(members: &'a [FontResource], want: &FontAxes) -> Option<&'a FontResource> {
    let mut best = None;
    let mut best_score = u32::MAX;

    for member in members {
        if let Some(score) = match_score(&member.axes, want) {
            if score < best_score {
                best_score = score;
                best = Some(member);
                if score == 0 {
                    break;
                }
            }
        }
    }

    best
}

/// Lower is better; `None` when some axis neither matches nor is normal.
///
/// Stretch fallback dominates (×100000), then style (×10000), then
/// variant (×1000); weight distance (0..=999) breaks the rest.
fn match_score(have: &FontAxes, want: &FontAxes) -> Option<u32> {
    let stretch = axis_distance(have.stretch, want.stretch, FontStretch::Normal)?;
    let style = axis_distance(have.style, want.style, FontStyle::Normal)?;
    let variant = axis_distance(have.variant, want.variant, FontVariant::Normal)?;
    let weight = (have.weight as i32 - want.weight as i32).unsigned_abs();

    Some(stretch * 100_000 + style * 10_000 + variant * 1_000 + weight)
}

fn axis_distance<T: PartialEq>(have: T, want: T, normal: T) -> Option<u32> {
    if have == want {
        Some(0)
    } else if have == normal {
        Some(1)
    } else {
        None
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticBackend;

    fn axes(style: FontStyle, weight: u16) -> FontAxes {
        FontAxes {
            style,
            weight,
            ..FontAxes::default()
        }
    }

    fn family(members: &[(&str, FontAxes)]) -> FontFamily {
        let mut family = FontFamily::new("serif", FontCache::shared(SyntheticBackend::new()));
        for (source, a) in members {
            family.add(FontResource::new(*source).with_axes(*a));
        }
        family
    }

    #[test]
    fn test_axes_from_css() {
        let a = FontAxes::from_css("italic", "small-caps", "bold", "condensed").unwrap();
        assert_eq!(a.style, FontStyle::Italic);
        assert_eq!(a.variant, FontVariant::SmallCaps);
        assert_eq!(a.weight, 700);
        assert_eq!(a.stretch, FontStretch::Condensed);
        assert!(FontAxes::from_css("slanted", "normal", "normal", "normal").is_none());
        assert_eq!(weight_from_css("300"), Some(300));
        assert_eq!(weight_from_css("0"), None);
        assert_eq!(weight_from_css("heavy"), None);
    }

    #[test]
    fn test_exact_match_wins() {
        let f = family(&[
            ("regular", axes(FontStyle::Normal, 400)),
            ("italic", axes(FontStyle::Italic, 400)),
        ]);
        let face = f.resolve(1024, &axes(FontStyle::Italic, 400)).unwrap();
        assert_eq!(face.resource().source, "italic");
    }

    #[test]
    fn test_falls_back_to_normal_style() {
        let f = family(&[("regular", axes(FontStyle::Normal, 400))]);
        let face = f.resolve(1024, &axes(FontStyle::Italic, 400)).unwrap();
        assert_eq!(face.resource().source, "regular");
    }

    #[test]
    fn test_no_eligible_member() {
        let f = family(&[("italic", axes(FontStyle::Italic, 400))]);
        let err = f.resolve(1024, &axes(FontStyle::Normal, 400)).unwrap_err();
        assert!(matches!(err, FontError::NoMatch { .. }));
        assert!(err.to_string().contains("normal/normal/400/normal"));
    }

    #[test]
    fn test_closest_weight() {
        let f = family(&[
            ("light", axes(FontStyle::Normal, 300)),
            ("bold", axes(FontStyle::Normal, 700)),
            ("black", axes(FontStyle::Normal, 900)),
        ]);
        let face = f.resolve(1024, &axes(FontStyle::Normal, 800)).unwrap();
        // 700 and 900 are equally close; the earlier member wins.
        assert_eq!(face.resource().source, "bold");
        let face = f.resolve(1024, &axes(FontStyle::Normal, 400)).unwrap();
        assert_eq!(face.resource().source, "light");
    }

    #[test]
    fn test_style_beats_weight() {
        let f = family(&[
            ("regular-bold", axes(FontStyle::Normal, 700)),
            ("italic-light", axes(FontStyle::Italic, 300)),
        ]);
        let face = f.resolve(1024, &axes(FontStyle::Italic, 700)).unwrap();
        assert_eq!(face.resource().source, "italic-light");
    }

    #[test]
    fn test_cache_deduplicates_by_source_and_size() {
        let cache = FontCache::shared(SyntheticBackend::new());
        let r = FontResource::new("a.ttf");
        let a = cache.face(&r, 1024).unwrap();
        let b = cache.face(&r, 1024).unwrap();
        let c = cache.face(&r, 2048).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_ne!(a.id(), c.id());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_open_failure_propagates() {
        let cache = FontCache::shared(SyntheticBackend::new());
        let err = cache.face(&FontResource::new(""), 1024).unwrap_err();
        assert!(matches!(err, FontError::Open { .. }));
        assert!(cache.is_empty());
    }
}
