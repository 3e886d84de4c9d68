//! Drawing commands and the layout container that collects them.

use std::rc::Rc;

use quire_core::{Color, Fixed};

use crate::fonts::FontFace;

/// One positioned drawing primitive. Coordinates are 1/64 px.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutCommand {
    /// A glyph with its pen position on the baseline.
    Glyph {
        x: Fixed,
        y: Fixed,
        face: Rc<FontFace>,
        glyph: u32,
        color: Color,
        /// Blur radius in whole pixels, `0` for a sharp glyph.
        blur: u16,
    },
    /// A filled rectangle with its top-left corner at `(x, y)`.
    Rect {
        x: Fixed,
        y: Fixed,
        w: Fixed,
        h: Fixed,
        color: Color,
        blur: u16,
    },
    /// A placeholder the back-end fills in; never emitted by the layouter.
    Image {
        x: Fixed,
        y: Fixed,
        w: Fixed,
        h: Fixed,
        url: String,
    },
}

impl LayoutCommand {
    pub fn rect(x: Fixed, y: Fixed, w: Fixed, h: Fixed, color: Color) -> Self {
        LayoutCommand::Rect {
            x,
            y,
            w,
            h,
            color,
            blur: 0,
        }
    }

    /// Copy moved by `(dx, dy)`.
    pub fn translated(&self, dx: Fixed, dy: Fixed) -> Self {
        let mut out = self.clone();
        match &mut out {
            LayoutCommand::Glyph { x, y, .. }
            | LayoutCommand::Rect { x, y, .. }
            | LayoutCommand::Image { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
        out
    }
}

/// Ordered drawing commands plus the vertical and horizontal extent.
///
/// `height` is the absolute y coordinate of the bottom edge, so layouts
/// produced for the same column can be merged with [`append`] without
/// moving anything. `left`/`right` bound everything drawn; they are
/// meaningful only once a command has been added.
///
/// [`append`]: TextLayout::append
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayout {
    commands: Vec<LayoutCommand>,
    height: Fixed,
    left: Fixed,
    right: Fixed,
}

impl TextLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty layout whose bottom edge is at `height`.
    pub fn with_height(height: Fixed) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[LayoutCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<LayoutCommand> {
        self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn height(&self) -> Fixed {
        self.height
    }

    pub fn left(&self) -> Fixed {
        self.left
    }

    pub fn right(&self) -> Fixed {
        self.right
    }

    pub fn set_height(&mut self, height: Fixed) {
        self.height = height;
    }

    pub fn set_left(&mut self, left: Fixed) {
        self.left = left;
    }

    pub fn set_right(&mut self, right: Fixed) {
        self.right = right;
    }

    /// Append one command, widening the extents to `[left, right]`.
    pub fn push(&mut self, command: LayoutCommand, left: Fixed, right: Fixed) {
        self.widen(left, right);
        self.commands.push(command);
    }

    /// Prepend a command so it is drawn beneath everything already here.
    pub fn push_front(&mut self, command: LayoutCommand, left: Fixed, right: Fixed) {
        self.widen(left, right);
        self.commands.insert(0, command);
    }

    /// Merge an absolutely positioned layout: its commands follow ours,
    /// extents are widened and the height becomes `other.height`.
    pub fn append(&mut self, other: TextLayout) {
        if !other.commands.is_empty() {
            self.widen(other.left, other.right);
        }
        self.commands.extend(other.commands);
        self.height = other.height;
    }

    /// Place `other`, laid out from y = 0, directly below this layout.
    pub fn stack(&mut self, other: TextLayout) {
        let dy = self.height;
        let shifted = TextLayout {
            commands: other
                .commands
                .iter()
                .map(|c| c.translated(0, dy))
                .collect(),
            height: other.height + dy,
            left: other.left,
            right: other.right,
        };
        self.append(shifted);
    }

    fn widen(&mut self, left: Fixed, right: Fixed) {
        if self.commands.is_empty() {
            self.left = left;
            self.right = right;
        } else {
            self.left = self.left.min(left);
            self.right = self.right.max(right);
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
