//! Document tree layouter: XHTML block structure → [`TextLayout`].
//!
//! The tree is walked once in document order. Each block is boxed
//! (margin, border, padding, background) around content laid out in the
//! inset column; paragraph content is collected into [`AttributedText`] and
//! handed to the paragraph layouter.

use std::rc::Rc;

use cssparser::{ParseError, Parser, ParserInput};
use log::debug;
use quire_core::{parse_length, Color, Fixed, LayoutError, MarkupNode, NodeKind, Shape, XmlDocument};
use quire_text::{
    layout_paragraph, normalize_whitespace, weight_from_css, Align, AttributeFlags,
    AttributedText, CodepointAttributes, FontAxes, FontError, FontFace, FontSize, FontStretch,
    FontStyle, FontVariant, LayoutCommand, TextLayout, TextShadow,
};

use crate::cascade::StyleSheet;

/// Marker drawn in the gutter of every list item.
const BULLET: &str = "\u{2022}";

/// Block elements the layouter knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockKind {
    /// `p` and `h1`..`h6`.
    Paragraph,
    /// `ul`.
    List,
    /// Accepted but not laid out.
    Table,
    Body,
    /// `html`, the document element.
    Root,
}

impl BlockKind {
    fn of(name: &str) -> Option<Self> {
        match name {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(BlockKind::Paragraph),
            "ul" => Some(BlockKind::List),
            "table" => Some(BlockKind::Table),
            "body" => Some(BlockKind::Body),
            "html" => Some(BlockKind::Root),
            _ => None,
        }
    }
}

/// Parse `text` and lay it out into `shape`.
pub fn layout_xhtml(
    text: &str,
    sheet: &StyleSheet,
    shape: &Shape,
) -> Result<TextLayout, LayoutError> {
    let document = XmlDocument::parse(text)?;
    layout_document(document.root(), sheet, shape)
}

/// Lay out an already parsed document. `root` is the document node whose
/// only element child must be `html`.
pub fn layout_document<N: MarkupNode>(
    root: N,
    sheet: &StyleSheet,
    shape: &Shape,
) -> Result<TextLayout, LayoutError> {
    let mut html = None;
    for child in root.children() {
        match child.kind() {
            NodeKind::Element if BlockKind::of(child.name()) == Some(BlockKind::Root) && html.is_none() => {
                html = Some(child)
            }
            NodeKind::Element => {
                return Err(LayoutError::structure(
                    "top level tag must be a single 'html' tag",
                    child.path(),
                ))
            }
            NodeKind::Text if is_blank(child) => {}
            NodeKind::Text => {
                return Err(LayoutError::structure(
                    "text is not allowed outside the 'html' tag",
                    child.path(),
                ))
            }
            NodeKind::Other => {}
        }
    }
    let html = html.ok_or_else(|| LayoutError::structure("document has no 'html' tag", "/"))?;

    let layout = layout_block(BlockKind::Root, sheet, html, shape, 0)?;
    debug!(
        "document laid out: {} commands, height {}",
        layout.commands().len(),
        layout.height()
    );
    Ok(layout)
}

/// The document element: an optional `head`, ignored, and an optional
/// `body` laid out from `y`.
fn layout_html<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
) -> Result<TextLayout, LayoutError> {
    let mut head = false;
    let mut body = None;
    for child in node.children() {
        match child.kind() {
            NodeKind::Element if child.name() == "head" && !head => head = true,
            NodeKind::Element if child.name() == "body" && body.is_none() => {
                body = Some(boxed(sheet, child, shape, y, BlockKind::Body)?);
            }
            NodeKind::Element => {
                return Err(LayoutError::structure(
                    "only up to one 'head' and up to one 'body' tag are allowed inside the 'html' tag",
                    child.path(),
                ))
            }
            NodeKind::Text if is_blank(child) => {}
            NodeKind::Text => {
                return Err(LayoutError::structure(
                    "text is not allowed directly inside the 'html' tag",
                    child.path(),
                ))
            }
            NodeKind::Other => {}
        }
    }
    Ok(body.unwrap_or_else(|| TextLayout::with_height(y)))
}

fn layout_block<N: MarkupNode>(
    kind: BlockKind,
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
) -> Result<TextLayout, LayoutError> {
    match kind {
        BlockKind::Paragraph => layout_p(sheet, node, shape, y),
        BlockKind::List => layout_ul(sheet, node, shape, y),
        BlockKind::Table => Ok(TextLayout::with_height(y)),
        BlockKind::Body => layout_body(sheet, node, shape, y),
        BlockKind::Root => layout_html(sheet, node, shape, y),
    }
}

// ── Box model ──────────────────────────────────────────────────────

/// Lay out `node` as `kind` inside its margin, border and padding.
///
/// The top margin collapses against the bottom margin of the preceding
/// sibling element only. Borders and background are prepended so they are
/// drawn beneath the content.
fn boxed<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
    kind: BlockKind,
) -> Result<TextLayout, LayoutError> {
    let padding = length(sheet, node, "padding")?;
    let border = length(sheet, node, "border-width")?;
    let margin = length(sheet, node, "margin")?;
    let above = match node.previous_element() {
        Some(previous) => length(sheet, previous, "margin")?,
        None => 0,
    };
    let top_margin = margin.max(above) - above;
    let inset = padding + border + margin;

    let mut layout = layout_block(
        kind,
        sheet,
        node,
        &shape.inset(inset, inset),
        y + padding + border + top_margin,
    )?;
    layout.set_height(layout.height() + inset);

    let top = y + top_margin;
    let left = shape.left(top, top);
    let right = shape.right(top, top);
    let height = layout.height();

    if border > 0 {
        let color = match sheet.resolve(node, "border-color", "") {
            "" => color(sheet, node, "color")?,
            value => Color::parse(value)
                .ok_or_else(|| LayoutError::invalid_value("border-color", value, node.path()))?,
        };
        if color.is_visible() {
            let side = height - y - margin - top_margin;
            let strips = [
                (left + margin, top, right - left - 2 * margin, border),
                (left + margin, height - border - margin, right - left - 2 * margin, border),
                (right - border - margin, top, border, side),
                (left + margin, top, border, side),
            ];
            for (x, y, w, h) in strips {
                layout.push_front(LayoutCommand::rect(x, y, w, h, color), x, x + w);
            }
        }
    }

    let background = color(sheet, node, "background-color")?;
    if background.is_visible() {
        let x = left + border + margin;
        let w = right - left - 2 * border - 2 * margin;
        let h = height - y - 2 * border - margin - top_margin;
        layout.push_front(
            LayoutCommand::rect(x, top + border, w, h, background),
            x,
            x + w,
        );
    }

    Ok(layout)
}

// ── Blocks ─────────────────────────────────────────────────────────

fn layout_body<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
) -> Result<TextLayout, LayoutError> {
    let mut layout = TextLayout::with_height(y);
    for child in node.children() {
        match child.kind() {
            NodeKind::Element => match BlockKind::of(child.name()) {
                Some(BlockKind::Table) => {}
                Some(kind @ (BlockKind::Paragraph | BlockKind::List)) => {
                    let block = boxed(sheet, child, shape, layout.height(), kind)?;
                    layout.append(block);
                }
                Some(BlockKind::Body | BlockKind::Root) | None => {
                    return Err(LayoutError::structure(
                        "only 'p', 'h1'-'h6', 'ul' and 'table' tags are allowed within a 'body' tag",
                        child.path(),
                    ))
                }
            },
            NodeKind::Text if is_blank(child) => {}
            NodeKind::Text => {
                return Err(LayoutError::structure(
                    "text must be inside a block within the 'body' tag",
                    child.path(),
                ))
            }
            NodeKind::Other => {}
        }
    }
    Ok(layout)
}

fn layout_p<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
) -> Result<TextLayout, LayoutError> {
    let mut text = AttributedText::new();
    collect_inline(sheet, node, &mut text)?;

    let mut props = sheet.layout_properties();
    props.align = alignment(sheet, node)?;
    props.indent = length(sheet, node, "text-indent")?;
    props.ltr = is_ltr(sheet, node)?;
    Ok(layout_paragraph(&text, shape, &props, y))
}

fn layout_ul<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    shape: &Shape,
    y: Fixed,
) -> Result<TextLayout, LayoutError> {
    let mut layout = TextLayout::with_height(y);
    let marker_color = color(sheet, node, "color")?;
    let ltr = is_ltr(sheet, node)?;
    let mut props = sheet.layout_properties();
    props.align = Align::Center;

    for item in node.children() {
        match item.kind() {
            NodeKind::Element if item.name() == "li" => {}
            NodeKind::Element => {
                return Err(LayoutError::structure(
                    "only 'li' tags allowed within 'ul' tag",
                    item.path(),
                ))
            }
            NodeKind::Text if is_blank(item) => continue,
            NodeKind::Text => {
                return Err(LayoutError::structure(
                    "text must be inside an 'li' tag",
                    item.path(),
                ))
            }
            NodeKind::Other => continue,
        }

        let font = font_for(sheet, item)?;
        let top = layout.height();
        let padding = length(sheet, item, "padding")?;
        let indent = font.ascender();
        let marker = AttributedText::from_text(BULLET, CodepointAttributes::new(font, marker_color));

        let (gutter, body) = if ltr {
            (shape.strip_left(padding, padding + indent), shape.inset(indent, 0))
        } else {
            (shape.strip_right(padding + indent, padding), shape.inset(0, indent))
        };
        layout.append(layout_paragraph(&marker, &gutter, &props, top + padding));
        layout.append(boxed(sheet, item, &body, top, BlockKind::Paragraph)?);
    }
    Ok(layout)
}

// ── Inline content ─────────────────────────────────────────────────

fn collect_inline<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
    text: &mut AttributedText,
) -> Result<(), LayoutError> {
    for child in node.children() {
        match child.kind() {
            NodeKind::Text => {
                let raw = child.text().unwrap_or_default();
                let normalized = normalize_whitespace(raw, text.last_char());
                if !normalized.is_empty() {
                    text.push_str(&normalized, attributes_for(sheet, node)?);
                }
            }
            NodeKind::Element => match child.name() {
                "i" | "b" | "em" | "strong" | "span" | "div" => {
                    collect_inline(sheet, child, text)?
                }
                "br" => text.push_char('\n', attributes_for(sheet, node)?),
                _ => {
                    return Err(LayoutError::structure(
                        "within paragraphs only text and 'i', 'b', 'em', 'strong', 'span', \
                         'div' and 'br' tags are allowed",
                        child.path(),
                    ))
                }
            },
            NodeKind::Other => {}
        }
    }
    Ok(())
}

fn attributes_for<N: MarkupNode>(
    sheet: &StyleSheet,
    node: N,
) -> Result<CodepointAttributes, LayoutError> {
    let font = font_for(sheet, node)?;
    let color = color(sheet, node, "color")?;

    let flags = match sheet.resolve(node, "text-decoration", "") {
        "underline" => AttributeFlags::UNDERLINE,
        "none" | "" => AttributeFlags::empty(),
        other => return Err(LayoutError::invalid_value("text-decoration", other, node.path())),
    };

    let shadow_value = sheet.resolve(node, "text-shadow", "");
    let shadows = parse_shadows(shadow_value, color).ok_or_else(|| {
        LayoutError::invalid_value("text-shadow", shadow_value, node.path())
    })?;

    Ok(CodepointAttributes::new(font, color)
        .with_lang(language(node))
        .with_flags(flags)
        .with_shadows(shadows))
}

/// `lang` of the nearest ancestor that sets it.
fn language<N: MarkupNode>(node: N) -> String {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if let Some(lang) = current.attribute("lang").filter(|l| !l.is_empty()) {
            return lang.to_string();
        }
        cursor = current.parent();
    }
    String::new()
}

/// Comma-separated `dx dy [blur] [color]` layers; `none` is no shadow.
fn parse_shadows(value: &str, fallback: Color) -> Option<Vec<TextShadow>> {
    let value = value.trim();
    if value == "none" || value.is_empty() {
        return Some(Vec::new());
    }
    value
        .split(',')
        .map(|layer| {
            let mut lengths = Vec::new();
            let mut color = None;
            for token in layer.split_whitespace() {
                if let Some(length) = parse_length(token) {
                    lengths.push(length);
                } else if color.is_none() {
                    color = Some(Color::parse(token)?);
                } else {
                    return None;
                }
            }
            let (dx, dy, blur) = match lengths[..] {
                [dx, dy] => (dx, dy, 0),
                [dx, dy, blur] if blur >= 0 => (dx, dy, blur),
                _ => return None,
            };
            Some(TextShadow {
                dx,
                dy,
                blur: u16::try_from((blur + 63) / 64).ok()?,
                color: color.unwrap_or(fallback),
            })
        })
        .collect()
}

// ── Cascade value helpers ──────────────────────────────────────────

fn length<N: MarkupNode>(sheet: &StyleSheet, node: N, attribute: &str) -> Result<Fixed, LayoutError> {
    let value = sheet.resolve(node, attribute, "");
    parse_length(value).ok_or_else(|| LayoutError::invalid_value(attribute, value, node.path()))
}

fn color<N: MarkupNode>(sheet: &StyleSheet, node: N, attribute: &str) -> Result<Color, LayoutError> {
    let value = sheet.resolve(node, attribute, "");
    Color::parse(value).ok_or_else(|| LayoutError::invalid_value(attribute, value, node.path()))
}

fn is_ltr<N: MarkupNode>(sheet: &StyleSheet, node: N) -> Result<bool, LayoutError> {
    match sheet.resolve(node, "direction", "") {
        "ltr" => Ok(true),
        "rtl" => Ok(false),
        other => Err(LayoutError::invalid_value("direction", other, node.path())),
    }
}

/// `text-align`; for `justify` the last line follows `text-align-last`,
/// or the direction when that is unset.
fn alignment<N: MarkupNode>(sheet: &StyleSheet, node: N) -> Result<Align, LayoutError> {
    let ltr = is_ltr(sheet, node)?;
    match sheet.resolve(node, "text-align", "") {
        "left" => Ok(Align::Left),
        "right" => Ok(Align::Right),
        "center" => Ok(Align::Center),
        "justify" => match sheet.resolve(node, "text-align-last", "") {
            "left" => Ok(Align::JustifyLeft),
            "right" => Ok(Align::JustifyRight),
            "" if ltr => Ok(Align::JustifyLeft),
            "" => Ok(Align::JustifyRight),
            other => Err(LayoutError::invalid_value("text-align-last", other, node.path())),
        },
        "" if ltr => Ok(Align::Left),
        "" => Ok(Align::Right),
        other => Err(LayoutError::invalid_value("text-align", other, node.path())),
    }
}

/// Resolve the face for `node` from its font-* attributes.
///
/// `font-family` is a CSS family list: families are tried in order and a
/// family that is not registered, or has no face for the requested axes,
/// passes the request on to the next one.
fn font_for<N: MarkupNode>(sheet: &StyleSheet, node: N) -> Result<Rc<FontFace>, LayoutError> {
    let families = sheet.resolve(node, "font-family", "");
    let style = sheet.resolve(node, "font-style", "");
    let variant = sheet.resolve(node, "font-variant", "");
    let weight = sheet.resolve(node, "font-weight", "");
    let stretch = sheet.resolve(node, "font-stretch", "");
    let size_value = sheet.resolve(node, "font-size", "");

    let invalid = |attribute: &str, value: &str| LayoutError::invalid_value(attribute, value, node.path());
    let size = parse_length(size_value)
        .filter(|size| *size > 0)
        .ok_or_else(|| invalid("font-size", size_value))?;
    let axes = FontAxes {
        style: FontStyle::from_css(style).ok_or_else(|| invalid("font-style", style))?,
        variant: FontVariant::from_css(variant).ok_or_else(|| invalid("font-variant", variant))?,
        weight: weight_from_css(weight).ok_or_else(|| invalid("font-weight", weight))?,
        stretch: FontStretch::from_css(stretch).ok_or_else(|| invalid("font-stretch", stretch))?,
    };
    let names = family_names(families).ok_or_else(|| invalid("font-family", families))?;

    for name in &names {
        let Some(family) = sheet.find_family(name) else {
            debug!("{}: family '{name}' is not registered, trying the next", node.path());
            continue;
        };
        match family.resolve(size as FontSize, &axes) {
            Ok(face) => return Ok(face),
            Err(FontError::NoMatch { .. }) => {
                debug!("{}: family '{name}' has no {axes} face, trying the next", node.path());
            }
            Err(err) => {
                return Err(LayoutError::FontLoad {
                    message: err.to_string(),
                    path: node.path(),
                })
            }
        }
    }

    Err(LayoutError::StyleResolution {
        family: families.to_string(),
        style: style.to_string(),
        variant: variant.to_string(),
        weight: weight.to_string(),
        stretch: stretch.to_string(),
        path: node.path(),
    })
}

/// Names in a `font-family` list. Each entry is a quoted string or a run
/// of identifiers joined by single spaces.
fn family_names(value: &str) -> Option<Vec<String>> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|p| p.parse_comma_separated(read_family))
        .ok()
}

fn read_family<'i>(input: &mut Parser<'i, '_>) -> Result<String, ParseError<'i, ()>> {
    let name = match input.try_parse(|p| p.expect_string().map(|s| s.to_string())) {
        Ok(quoted) => quoted,
        Err(_) => {
            let mut words = Vec::new();
            while let Ok(word) = input.try_parse(|p| p.expect_ident().map(|w| w.to_string())) {
                words.push(word);
            }
            if words.is_empty() {
                return Err(input.new_custom_error(()));
            }
            words.join(" ")
        }
    };
    input.expect_exhausted()?;
    Ok(name)
}

/// Whether `value` is acceptable for `attribute`, using the same readings
/// the layouter applies. Attributes it does not interpret pass unchecked.
pub(crate) fn is_valid_value(attribute: &str, value: &str) -> bool {
    match attribute {
        "color" | "background-color" | "border-color" => Color::parse(value).is_some(),
        "margin" | "padding" | "border-width" | "text-indent" => parse_length(value).is_some(),
        "font-size" => parse_length(value).is_some_and(|size| size > 0),
        "font-family" => family_names(value).is_some(),
        "font-style" => FontStyle::from_css(value).is_some(),
        "font-variant" => FontVariant::from_css(value).is_some(),
        "font-weight" => weight_from_css(value).is_some(),
        "font-stretch" => FontStretch::from_css(value).is_some(),
        "text-align" => matches!(value, "left" | "right" | "center" | "justify"),
        "text-align-last" => matches!(value, "left" | "right"),
        "direction" => matches!(value, "ltr" | "rtl"),
        "text-decoration" => matches!(value, "none" | "underline"),
        "text-shadow" => parse_shadows(value, Color::BLACK).is_some(),
        _ => true,
    }
}

fn is_blank<N: MarkupNode>(node: N) -> bool {
    node.text().map_or(true, |t| t.trim().is_empty())
}

// ===================================================================
// Tests
// ===================================================================
