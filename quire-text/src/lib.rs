//! # quire-text
//!
//! Fonts, attributed text and the paragraph layouter for the quire
//! typesetting engine, plus the glyph atlas hardware back-ends draw from.
//!
//! ## Architecture
//!
//! ```text
//! FontFamily ──resolve──► FontCache ──open──► FontBackend (font-kit / synthetic)
//!                              │
//!                              ▼ Rc<FontFace>
//! AttributedText (chars + spans) ──► layout_paragraph(shape, props) ──► TextLayout
//!                                                                          │
//!                                    GlyphAtlas ◄── glyph(face, index) ────┘
//! ```
//!
//! - **`fonts`**: Font axes, resources, families and the shared face cache.
//! - **`system`**: `font-kit` back-end and installed-font lookup.
//! - **`synthetic`**: Deterministic box-glyph back-end.
//! - **`attributed`**: Text with per-codepoint attribute spans.
//! - **`hyphen`**: Hyphenation providers.
//! - **`paragraph`**: Greedy and optimal line breaking, alignment.
//! - **`layout`**: Drawing commands and their container.
//! - **`atlas`**: Glyph/rect texture atlas with whole-atlas eviction.

pub mod atlas;
pub mod attributed;
pub mod fonts;
pub mod hyphen;
pub mod layout;
pub mod paragraph;
pub mod synthetic;
pub mod system;

// Re-exports for ergonomic use.
pub use atlas::{AtlasError, AtlasPlacement, GlyphAtlas};
pub use attributed::{
    normalize_whitespace, AttributeFlags, AttributeSpan, AttributedText, CodepointAttributes,
    TextShadow,
};
pub use fonts::{
    weight_from_css, FaceMetrics, FontAxes, FontBackend, FontCache, FontError, FontFace,
    FontFamily, FontResource, FontSize, FontStretch, FontStyle, FontVariant, GlyphBitmap,
    GlyphSource, SubPixelArrangement,
};
pub use hyphen::{DictionaryHyphenator, EnglishHyphenator, Hyphenator, SOFT_HYPHEN};
pub use layout::{LayoutCommand, TextLayout};
pub use paragraph::{layout_paragraph, Align, LayoutProperties};
pub use synthetic::{SyntheticBackend, SyntheticStats};
pub use system::{find_system_font, SystemFontBackend};
