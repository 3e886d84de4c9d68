//! Persisted layout format.
//!
//! A finished [`TextLayout`] is written as JSON: extents, the fonts its
//! glyphs use (listed once, in first-use order, as `file`/`size`) and the
//! command list, glyphs referring to fonts by index. Loading reopens every
//! font through a [`FontCache`]; nothing is laid out again.

use std::rc::Rc;

use log::debug;
use quire_core::{Color, Fixed, LayoutError};
use quire_text::{FontCache, FontFace, FontResource, FontSize, LayoutCommand, TextLayout};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLayout {
    height: Fixed,
    left: Fixed,
    right: Fixed,
    fonts: Vec<PersistedFont>,
    commands: Vec<PersistedCommand>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedFont {
    file: String,
    size: FontSize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PersistedCommand {
    Glyph {
        x: Fixed,
        y: Fixed,
        #[serde(rename = "glyphIndex")]
        glyph_index: u32,
        font: usize,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
        #[serde(default, skip_serializing_if = "is_zero")]
        blur: u16,
    },
    Rect {
        x: Fixed,
        y: Fixed,
        w: Fixed,
        h: Fixed,
        r: u8,
        g: u8,
        b: u8,
        a: u8,
        #[serde(default, skip_serializing_if = "is_zero")]
        blur: u16,
    },
    Image {
        x: Fixed,
        y: Fixed,
        url: String,
        #[serde(default)]
        w: Fixed,
        #[serde(default)]
        h: Fixed,
    },
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

/// Serialize `layout` to pretty-printed JSON.
pub fn save_layout(layout: &TextLayout) -> Result<String, LayoutError> {
    let mut fonts = Vec::new();
    let mut font_index: FxHashMap<u64, usize> = FxHashMap::default();
    let mut commands = Vec::with_capacity(layout.commands().len());

    for command in layout.commands() {
        commands.push(match command {
            LayoutCommand::Glyph {
                x,
                y,
                face,
                glyph,
                color,
                blur,
            } => {
                let font = *font_index.entry(face.id()).or_insert_with(|| {
                    fonts.push(PersistedFont {
                        file: face.resource().source.clone(),
                        size: face.size(),
                    });
                    fonts.len() - 1
                });
                PersistedCommand::Glyph {
                    x: *x,
                    y: *y,
                    glyph_index: *glyph,
                    font,
                    r: color.r,
                    g: color.g,
                    b: color.b,
                    a: color.a,
                    blur: *blur,
                }
            }
            LayoutCommand::Rect {
                x,
                y,
                w,
                h,
                color,
                blur,
            } => PersistedCommand::Rect {
                x: *x,
                y: *y,
                w: *w,
                h: *h,
                r: color.r,
                g: color.g,
                b: color.b,
                a: color.a,
                blur: *blur,
            },
            LayoutCommand::Image { x, y, w, h, url } => PersistedCommand::Image {
                x: *x,
                y: *y,
                url: url.clone(),
                w: *w,
                h: *h,
            },
        });
    }

    let persisted = PersistedLayout {
        height: layout.height(),
        left: layout.left(),
        right: layout.right(),
        fonts,
        commands,
    };
    serde_json::to_string_pretty(&persisted).map_err(|e| LayoutError::Format(e.to_string()))
}

/// Read a layout written by [`save_layout`], reopening its fonts in `cache`.
pub fn load_layout(json: &str, cache: &FontCache) -> Result<TextLayout, LayoutError> {
    let persisted: PersistedLayout =
        serde_json::from_str(json).map_err(|e| LayoutError::Format(e.to_string()))?;

    let faces = persisted
        .fonts
        .iter()
        .map(|font| {
            cache
                .face(&FontResource::new(font.file.as_str()), font.size)
                .map_err(|e| LayoutError::FontLoad {
                    message: e.to_string(),
                    path: font.file.clone(),
                })
        })
        .collect::<Result<Vec<Rc<FontFace>>, _>>()?;

    let mut layout = TextLayout::with_height(persisted.height);
    for command in persisted.commands {
        let command = match command {
            PersistedCommand::Glyph {
                x,
                y,
                glyph_index,
                font,
                r,
                g,
                b,
                a,
                blur,
            } => {
                let face = faces.get(font).ok_or_else(|| {
                    LayoutError::Format(format!(
                        "font index {font} out of range ({} fonts)",
                        faces.len()
                    ))
                })?;
                LayoutCommand::Glyph {
                    x,
                    y,
                    face: Rc::clone(face),
                    glyph: glyph_index,
                    color: Color::rgba(r, g, b, a),
                    blur,
                }
            }
            PersistedCommand::Rect {
                x,
                y,
                w,
                h,
                r,
                g,
                b,
                a,
                blur,
            } => LayoutCommand::Rect {
                x,
                y,
                w,
                h,
                color: Color::rgba(r, g, b, a),
                blur,
            },
            PersistedCommand::Image { x, y, url, w, h } => LayoutCommand::Image { x, y, w, h, url },
        };
        layout.push(command, 0, 0);
    }
    layout.set_left(persisted.left);
    layout.set_right(persisted.right);

    debug!(
        "loaded layout: {} commands, {} fonts",
        layout.commands().len(),
        faces.len()
    );
    Ok(layout)
}

// ===================================================================
// Tests
// ===================================================================
