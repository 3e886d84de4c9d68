//! Font back-end over `font-kit`: opens font files from disk and finds
//! installed families by name.

use font_kit::canvas::{Canvas, Format, RasterizationOptions};
use font_kit::family_name::FamilyName;
use font_kit::font::Font;
use font_kit::handle::Handle;
use font_kit::hinting::HintingOptions;
use font_kit::properties::{Properties, Stretch, Style, Weight};
use font_kit::source::SystemSource;
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::{vec2f, vec2i};

use quire_core::{Fixed, FIXED_ONE};

use crate::fonts::{
    FaceMetrics, FontAxes, FontBackend, FontError, FontResource, FontSize, FontStretch, FontStyle,
    GlyphBitmap, GlyphSource, SubPixelArrangement,
};

/// Opens `FontResource::source` as a path to a font file.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemFontBackend;

impl FontBackend for SystemFontBackend {
    fn open(
        &self,
        resource: &FontResource,
        size: FontSize,
    ) -> Result<Box<dyn GlyphSource>, FontError> {
        let font = Font::from_path(&resource.source, 0).map_err(|e| FontError::Open {
            resource: resource.source.clone(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(SystemFace::new(font, resource.source.clone(), size)))
    }
}

struct SystemFace {
    font: Font,
    source: String,
    /// Em size in pixels, the unit font-kit rasterizes in.
    point_size: f32,
    /// Font units → 1/64 px.
    scale: f32,
}

impl SystemFace {
    fn new(font: Font, source: String, size: FontSize) -> Self {
        let units_per_em = font.metrics().units_per_em.max(1) as f32;
        Self {
            font,
            source,
            point_size: size as f32 / FIXED_ONE as f32,
            scale: size as f32 / units_per_em,
        }
    }

    fn fixed(&self, font_units: f32) -> Fixed {
        (font_units * self.scale).round() as Fixed
    }

    fn raster_error(&self, glyph: u32, reason: impl ToString) -> FontError {
        FontError::Rasterize {
            resource: self.source.clone(),
            glyph,
            reason: reason.to_string(),
        }
    }
}

impl GlyphSource for SystemFace {
    fn metrics(&self) -> FaceMetrics {
        let m = self.font.metrics();
        let ascender = self.fixed(m.ascent);
        let descender = self.fixed(-m.descent);
        FaceMetrics {
            ascender,
            descender,
            line_height: ascender + descender + self.fixed(m.line_gap),
            underline_position: self.fixed(-m.underline_position),
            underline_thickness: self.fixed(m.underline_thickness).max(1),
        }
    }

    fn glyph_index(&self, ch: char) -> Option<u32> {
        self.font.glyph_for_char(ch)
    }

    fn advance(&self, glyph: u32) -> Fixed {
        self.font
            .advance(glyph)
            .map(|v| self.fixed(v.x()))
            .unwrap_or(0)
    }

    fn rasterize(
        &self,
        glyph: u32,
        subpixel: SubPixelArrangement,
    ) -> Result<GlyphBitmap, FontError> {
        let columns = match subpixel {
            SubPixelArrangement::None => 1,
            SubPixelArrangement::Rgb | SubPixelArrangement::Bgr => 3,
        };
        let stretch = Transform2F::from_scale(vec2f(columns as f32, 1.0));
        let bounds = self
            .font
            .raster_bounds(
                glyph,
                self.point_size,
                stretch,
                HintingOptions::None,
                RasterizationOptions::GrayscaleAa,
            )
            .map_err(|e| self.raster_error(glyph, e))?;

        if bounds.width() <= 0 || bounds.height() <= 0 {
            return Ok(GlyphBitmap::default());
        }

        // Sub-pixel bitmaps start and end on device pixel boundaries.
        let origin_x = bounds.origin_x().div_euclid(columns) * columns;
        let width = (bounds.max_x() - origin_x + columns - 1) / columns * columns;
        let rows = bounds.height();
        let origin = vec2i(origin_x, bounds.origin_y());

        let mut canvas = Canvas::new(vec2i(width, rows), Format::A8);
        let place = Transform2F::from_translation(-origin.to_f32()) * stretch;
        self.font
            .rasterize_glyph(
                &mut canvas,
                glyph,
                self.point_size,
                place,
                HintingOptions::None,
                RasterizationOptions::GrayscaleAa,
            )
            .map_err(|e| self.raster_error(glyph, e))?;

        let mut pixels = Vec::with_capacity((width * rows) as usize);
        for row in canvas.pixels.chunks(canvas.stride).take(rows as usize) {
            pixels.extend_from_slice(&row[..width as usize]);
        }

        Ok(GlyphBitmap {
            width: width as u32,
            rows: rows as u32,
            left: origin_x / columns,
            top: -bounds.origin_y(),
            pixels,
        }
        .with_subpixel_order(subpixel))
    }
}

/// Locate an installed font for `family` closest to `axes`.
///
/// Generic CSS names (`serif`, `sans-serif`, `sans`, `monospace`,
/// `cursive`, `fantasy`) map to the platform defaults. Only file-backed
/// fonts are returned, since resources are identified by path.
pub fn find_system_font(family: &str, axes: &FontAxes) -> Option<FontResource> {
    let name = match family.trim().to_ascii_lowercase().as_str() {
        "serif" => FamilyName::Serif,
        "sans" | "sans-serif" => FamilyName::SansSerif,
        "monospace" => FamilyName::Monospace,
        "cursive" => FamilyName::Cursive,
        "fantasy" => FamilyName::Fantasy,
        _ => FamilyName::Title(family.trim().to_string()),
    };

    let mut properties = Properties::new();
    properties.style = match axes.style {
        FontStyle::Normal => Style::Normal,
        FontStyle::Italic => Style::Italic,
        FontStyle::Oblique => Style::Oblique,
    };
    properties.weight = Weight(axes.weight as f32);
    properties.stretch = Stretch(stretch_factor(axes.stretch));

    match SystemSource::new().select_best_match(&[name], &properties) {
        Ok(Handle::Path { path, .. }) => {
            log::debug!("system font for '{family}' ({axes}): {}", path.display());
            Some(FontResource::new(path.to_string_lossy().into_owned()).with_axes(*axes))
        }
        Ok(Handle::Memory { .. }) => {
            log::debug!("system font for '{family}' is memory-backed, skipped");
            None
        }
        Err(e) => {
            log::debug!("no system font for '{family}': {e:?}");
            None
        }
    }
}

/// CSS stretch keyword → font-kit width factor.
fn stretch_factor(stretch: FontStretch) -> f32 {
    match stretch {
        FontStretch::UltraCondensed => 0.5,
        FontStretch::ExtraCondensed => 0.625,
        FontStretch::Condensed => 0.75,
        FontStretch::SemiCondensed => 0.875,
        FontStretch::Normal => 1.0,
        FontStretch::SemiExpanded => 1.125,
        FontStretch::Expanded => 1.25,
        FontStretch::ExtraExpanded => 1.5,
        FontStretch::UltraExpanded => 2.0,
    }
}

// ===================================================================
// Tests
// ===================================================================
