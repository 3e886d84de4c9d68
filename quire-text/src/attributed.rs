//! Attributed text: a character sequence plus contiguous attribute spans.

use std::rc::Rc;

use bitflags::bitflags;
use quire_core::{Color, Fixed};

use crate::fonts::FontFace;

bitflags! {
    /// Per-codepoint decoration switches.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttributeFlags: u8 {
        const UNDERLINE = 1 << 0;
    }
}

/// One CSS `text-shadow` layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextShadow {
    pub dx: Fixed,
    pub dy: Fixed,
    /// Blur radius in whole pixels.
    pub blur: u16,
    pub color: Color,
}

/// Everything the layouter needs to draw one codepoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CodepointAttributes {
    pub font: Rc<FontFace>,
    pub color: Color,
    /// BCP 47 language tag, empty if unknown.
    pub lang: String,
    pub flags: AttributeFlags,
    /// Drawn back to front before the glyph itself.
    pub shadows: Vec<TextShadow>,
}

impl CodepointAttributes {
    pub fn new(font: Rc<FontFace>, color: Color) -> Self {
        Self {
            font,
            color,
            lang: String::new(),
            flags: AttributeFlags::empty(),
            shadows: Vec::new(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_flags(mut self, flags: AttributeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_shadows(mut self, shadows: Vec<TextShadow>) -> Self {
        self.shadows = shadows;
        self
    }
}

/// Attributes covering `chars[start..end]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeSpan {
    pub start: usize,
    pub end: usize,
    pub attributes: CodepointAttributes,
}

/// Characters plus spans that cover them exactly once, in order.
#[derive(Clone, Debug, Default)]
pub struct AttributedText {
    chars: Vec<char>,
    spans: Vec<AttributeSpan>,
}

impl AttributedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text with a single span.
    pub fn from_text(text: &str, attributes: CodepointAttributes) -> Self {
        let mut out = Self::new();
        out.push_str(text, attributes);
        out
    }

    /// Append already-normalized text. Empty input is ignored.
    pub fn push_str(&mut self, text: &str, attributes: CodepointAttributes) {
        let start = self.chars.len();
        self.chars.extend(text.chars());
        let end = self.chars.len();
        if end == start {
            return;
        }

        // Extend the last span rather than fragmenting identical runs.
        if let Some(last) = self.spans.last_mut() {
            if last.end == start && last.attributes == attributes {
                last.end = end;
                return;
            }
        }
        self.spans.push(AttributeSpan {
            start,
            end,
            attributes,
        });
    }

    pub fn push_char(&mut self, ch: char, attributes: CodepointAttributes) {
        let mut buf = [0u8; 4];
        self.push_str(ch.encode_utf8(&mut buf), attributes);
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn spans(&self) -> &[AttributeSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn last_char(&self) -> Option<char> {
        self.chars.last().copied()
    }

    pub fn attributes_at(&self, index: usize) -> Option<&CodepointAttributes> {
        let i = self.spans.partition_point(|s| s.end <= index);
        self.spans
            .get(i)
            .filter(|s| s.start <= index)
            .map(|s| &s.attributes)
    }

    pub fn to_text(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Collapse runs of space, tab, CR and LF into one space.
///
/// A leading space is dropped when `previous` (the last character already
/// in the paragraph) is whitespace, so a paragraph never starts with a
/// space and never gets two in a row across element boundaries.
pub fn normalize_whitespace(input: &str, previous: Option<char>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = previous.map_or(true, is_collapsible);

    for ch in input.chars() {
        if is_collapsible(ch) {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out
}

fn is_collapsible(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontCache, FontResource};
    use crate::synthetic::SyntheticBackend;

    fn attrs(color: Color) -> CodepointAttributes {
        let cache = FontCache::new(SyntheticBackend::new());
        let face = cache.face(&FontResource::new("box"), 1024).unwrap();
        CodepointAttributes::new(face, color)
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \n\t b  ", None), "a b ");
        assert_eq!(normalize_whitespace(" b", Some('a')), " b");
        assert_eq!(normalize_whitespace(" b", Some(' ')), "b");
        assert_eq!(normalize_whitespace(" b", Some('\n')), "b");
        assert_eq!(normalize_whitespace("", Some('a')), "");
    }

    #[test]
    fn test_spans_cover_in_order() {
        let red = attrs(Color::rgb(255, 0, 0));
        let mut text = AttributedText::new();
        text.push_str("ab", red.clone());
        text.push_str("", attrs(Color::BLACK));
        text.push_str("cd", CodepointAttributes {
            color: Color::BLACK,
            ..red.clone()
        });
        assert_eq!(text.len(), 4);
        assert_eq!(text.spans().len(), 2);
        assert_eq!(text.spans()[1].start, 2);
        assert_eq!(text.attributes_at(1).unwrap().color, red.color);
        assert_eq!(text.attributes_at(3).unwrap().color, Color::BLACK);
        assert!(text.attributes_at(4).is_none());
    }

    #[test]
    fn test_identical_attributes_merge() {
        let a = attrs(Color::BLACK);
        let mut text = AttributedText::from_text("ab", a.clone());
        text.push_char('c', a);
        assert_eq!(text.spans().len(), 1);
        assert_eq!(text.spans()[0].end, 3);
        assert_eq!(text.last_char(), Some('c'));
        assert_eq!(text.to_text(), "abc");
    }
}
