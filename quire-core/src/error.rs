use thiserror::Error;

/// Every way a layout call can fail. A call either returns a complete
/// layout or exactly one of these; partial results are never handed out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The cascade produced a font combination no registered face can serve.
    #[error(
        "requested font not found (family: '{family}', style: '{style}', variant: '{variant}', \
         weight: '{weight}', stretch: '{stretch}') required here: {path}"
    )]
    StyleResolution {
        family: String,
        style: String,
        variant: String,
        weight: String,
        stretch: String,
        path: String,
    },

    /// The markup is well-formed but uses an element where it is not allowed.
    #[error("{message} ({path})")]
    MarkupStructure { message: String, path: String },

    /// The markup could not be parsed at all.
    #[error("error parsing markup at byte {offset}: {description}\n{context}")]
    MarkupParse {
        offset: usize,
        description: String,
        context: String,
    },

    /// A style value resolved for a node cannot be interpreted.
    #[error("invalid value '{value}' for '{attribute}' ({path})")]
    InvalidStyleValue {
        attribute: String,
        value: String,
        path: String,
    },

    /// A font was found but could not be opened.
    #[error("cannot load font: {message} ({path})")]
    FontLoad { message: String, path: String },

    /// A style sheet selector outside the supported grammar.
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    /// Style sheet text that is not a sequence of `selector { ... }` blocks.
    #[error("style sheet syntax error at byte {offset}: {message}")]
    CssSyntax { offset: usize, message: String },

    /// A persisted layout could not be read back.
    #[error("layout format error: {0}")]
    Format(String),
}

impl LayoutError {
    pub fn structure(message: impl Into<String>, path: impl Into<String>) -> Self {
        LayoutError::MarkupStructure {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn invalid_value(
        attribute: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        LayoutError::InvalidStyleValue {
            attribute: attribute.into(),
            value: value.into(),
            path: path.into(),
        }
    }

    /// Build a parse error with up to 20 bytes of context on either side of
    /// `offset`, joined by a `[here]` marker.
    pub fn parse(source: &str, offset: usize, description: impl Into<String>) -> Self {
        let offset = floor_char_boundary(source, offset.min(source.len()));
        let start = floor_char_boundary(source, offset.saturating_sub(20));
        let end = floor_char_boundary(source, (offset + 20).min(source.len()));
        LayoutError::MarkupParse {
            offset,
            description: description.into(),
            context: format!("{}[here]{}", &source[start..offset], &source[offset..end]),
        }
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context_window() {
        let src = "0123456789abcdefghijklmnopqrstuvwxyz0123456789";
        let err = LayoutError::parse(src, 25, "boom");
        match err {
            LayoutError::MarkupParse { offset, context, .. } => {
                assert_eq!(offset, 25);
                assert_eq!(context, "56789abcdefghijklmno[here]pqrstuvwxyz012345678");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_context_near_start() {
        let err = LayoutError::parse("<a", 1, "eof");
        assert!(err.to_string().contains("<[here]a"));
    }

    #[test]
    fn test_display_structure() {
        let err = LayoutError::structure("only 'li' allowed", "/html/body/ul/p");
        assert_eq!(err.to_string(), "only 'li' allowed (/html/body/ul/p)");
    }
}
