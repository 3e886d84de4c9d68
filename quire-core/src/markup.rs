//! Read-only markup tree abstraction.
//!
//! The layouter and the cascade never own markup; they walk any tree that
//! implements [`MarkupNode`]. [`XmlDocument`] provides one backed by
//! `roxmltree`.

use crate::error::LayoutError;

/// Node type discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    /// Document root, comments and processing instructions.
    Other,
}

/// A cheap, copyable handle to a node in a read-only markup tree.
pub trait MarkupNode: Copy {
    fn kind(&self) -> NodeKind;

    /// Tag name for elements, empty otherwise.
    fn name(&self) -> &str;

    fn attribute(&self, key: &str) -> Option<&str>;

    /// Children in document order.
    fn children(&self) -> Vec<Self>;

    fn parent(&self) -> Option<Self>;

    fn previous_sibling(&self) -> Option<Self>;

    /// Content of a text node, `None` for every other kind.
    fn text(&self) -> Option<&str>;

    fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Closest preceding sibling that is an element.
    fn previous_element(&self) -> Option<Self> {
        let mut cursor = self.previous_sibling();
        while let Some(node) = cursor {
            if node.is_element() {
                return Some(node);
            }
            cursor = node.previous_sibling();
        }
        None
    }

    /// Slash-separated element names from the root, e.g. `/html/body/p`.
    fn path(&self) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(*self);
        while let Some(node) = cursor {
            if node.is_element() {
                names.push(node.name().to_string());
            }
            cursor = node.parent();
        }
        names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        })
    }

    /// Whitespace-separated `class` attribute contains `class`.
    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|list| list.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

// ── roxmltree adapter ──────────────────────────────────────────────

/// A parsed XML/XHTML document.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    /// Parse `text`. A DOCTYPE is accepted; entity declarations in it are not
    /// expanded beyond what `roxmltree` supports.
    pub fn parse(text: &'input str) -> Result<Self, LayoutError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        match roxmltree::Document::parse_with_options(text, options) {
            Ok(doc) => Ok(Self { doc }),
            Err(e) => {
                let pos = e.pos();
                let offset = byte_offset(text, pos.row, pos.col);
                log::debug!("markup parse failed at {}:{} ({e})", pos.row, pos.col);
                Err(LayoutError::parse(text, offset, e.to_string()))
            }
        }
    }

    /// The document node; its element children are the top-level tags.
    pub fn root(&self) -> XmlNode<'_, 'input> {
        XmlNode(self.doc.root())
    }
}

/// `MarkupNode` over a `roxmltree` node.
#[derive(Clone, Copy, Debug)]
pub struct XmlNode<'a, 'input: 'a>(roxmltree::Node<'a, 'input>);

impl<'a, 'input: 'a> MarkupNode for XmlNode<'a, 'input> {
    fn kind(&self) -> NodeKind {
        if self.0.is_element() {
            NodeKind::Element
        } else if self.0.is_text() {
            NodeKind::Text
        } else {
            NodeKind::Other
        }
    }

    fn name(&self) -> &str {
        if self.0.is_element() {
            self.0.tag_name().name()
        } else {
            ""
        }
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.0.attribute(key)
    }

    fn children(&self) -> Vec<Self> {
        self.0.children().map(XmlNode).collect()
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().map(XmlNode)
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.0.prev_sibling().map(XmlNode)
    }

    fn text(&self) -> Option<&str> {
        if self.0.is_text() {
            self.0.text()
        } else {
            None
        }
    }
}

/// Convert a 1-based row/column (columns counted in chars) to a byte offset.
fn byte_offset(text: &str, row: u32, col: u32) -> usize {
    let mut offset = 0usize;
    for (i, line) in text.split_inclusive('\n').enumerate() {
        if i + 1 == row as usize {
            let col = (col as usize).saturating_sub(1);
            return offset
                + line
                    .char_indices()
                    .nth(col)
                    .map(|(b, _)| b)
                    .unwrap_or(line.len());
        }
        offset += line.len();
    }
    text.len()
}

// ===================================================================
// Tests
// ===================================================================
