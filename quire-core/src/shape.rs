//! Column shapes.
//!
//! A shape answers one question: for the vertical band `[top, bottom)`,
//! which horizontal extent `(left, right)` may text occupy? Lines are
//! laid out band by band, so arbitrary outlines (circles, pull quotes,
//! text flowing around a figure) fall out of the same line breaker.
//!
//! Composition wraps instead of mutating: every wrapper holds an `Rc` to
//! the shape it refines, so nested compositions share their base and no
//! wrapper can outlive what it wraps.

use std::fmt;
use std::rc::Rc;

use crate::units::Fixed;

/// A user-supplied outline. Must return `right >= left` for every band it
/// is asked about.
pub trait ColumnShape {
    fn left(&self, top: Fixed, bottom: Fixed) -> Fixed;
    fn right(&self, top: Fixed, bottom: Fixed) -> Fixed;
}

/// Plain rectangular column `[0, width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RectangleShape {
    pub width: Fixed,
}

impl ColumnShape for RectangleShape {
    fn left(&self, _top: Fixed, _bottom: Fixed) -> Fixed {
        0
    }

    fn right(&self, _top: Fixed, _bottom: Fixed) -> Fixed {
        self.width
    }
}

/// Closed set of shape compositions.
#[derive(Clone)]
pub enum Shape {
    /// An outline supplied by the caller.
    Base(Rc<dyn ColumnShape>),
    /// Both edges moved inward.
    Inset { outer: Rc<Shape>, left: Fixed, right: Fixed },
    /// The outer shape queried `dy` further down.
    Shift { outer: Rc<Shape>, dy: Fixed },
    /// A strip measured from the outer left edge: `[l + left, l + right)`.
    StripLeft { outer: Rc<Shape>, left: Fixed, right: Fixed },
    /// A strip measured from the outer right edge: `[r - left, r - right)`.
    StripRight { outer: Rc<Shape>, left: Fixed, right: Fixed },
}

impl Shape {
    /// Rectangular column of the given width starting at x = 0.
    pub fn rectangle(width: Fixed) -> Self {
        Shape::Base(Rc::new(RectangleShape { width }))
    }

    pub fn custom(shape: impl ColumnShape + 'static) -> Self {
        Shape::Base(Rc::new(shape))
    }

    pub fn inset(&self, left: Fixed, right: Fixed) -> Self {
        Shape::Inset { outer: Rc::new(self.clone()), left, right }
    }

    pub fn shift(&self, dy: Fixed) -> Self {
        Shape::Shift { outer: Rc::new(self.clone()), dy }
    }

    pub fn strip_left(&self, left: Fixed, right: Fixed) -> Self {
        Shape::StripLeft { outer: Rc::new(self.clone()), left, right }
    }

    pub fn strip_right(&self, left: Fixed, right: Fixed) -> Self {
        Shape::StripRight { outer: Rc::new(self.clone()), left, right }
    }

    pub fn left(&self, top: Fixed, bottom: Fixed) -> Fixed {
        match self {
            Shape::Base(base) => base.left(top, bottom),
            Shape::Inset { outer, left, .. } => outer.left(top, bottom) + left,
            Shape::Shift { outer, dy } => outer.left(top + dy, bottom + dy),
            Shape::StripLeft { outer, left, .. } => outer.left(top, bottom) + left,
            Shape::StripRight { outer, left, .. } => outer.right(top, bottom) - left,
        }
    }

    pub fn right(&self, top: Fixed, bottom: Fixed) -> Fixed {
        match self {
            Shape::Base(base) => base.right(top, bottom),
            Shape::Inset { outer, right, .. } => outer.right(top, bottom) - right,
            Shape::Shift { outer, dy } => outer.right(top + dy, bottom + dy),
            Shape::StripLeft { outer, right, .. } => outer.left(top, bottom) + right,
            Shape::StripRight { outer, right, .. } => outer.right(top, bottom) - right,
        }
    }

    /// Available width for the band, never negative.
    pub fn width(&self, top: Fixed, bottom: Fixed) -> Fixed {
        (self.right(top, bottom) - self.left(top, bottom)).max(0)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Base(_) => f.write_str("Base"),
            Shape::Inset { outer, left, right } => {
                write!(f, "Inset({left}, {right}, {outer:?})")
            }
            Shape::Shift { outer, dy } => write!(f, "Shift({dy}, {outer:?})"),
            Shape::StripLeft { outer, left, right } => {
                write!(f, "StripLeft({left}, {right}, {outer:?})")
            }
            Shape::StripRight { outer, left, right } => {
                write!(f, "StripRight({left}, {right}, {outer:?})")
            }
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
