//! # quire-core
//!
//! Shared vocabulary for the quire typesetting engine: fixed-point units,
//! colours, column shapes, the read-only markup node abstraction and the
//! error type every layout entry point returns.
//!
//! ## Architecture
//!
//! ```text
//! XHTML text ──► XmlDocument (roxmltree) ──► impl MarkupNode
//!                                                 │
//!          Shape (column outline) ────────────────┤
//!                                                 ▼
//!                                     quire-layout / quire-text
//! ```
//!
//! - **`units`**: 1/64 device pixel fixed point and CSS length parsing.
//! - **`color`**: RGBA colour and CSS colour parsing.
//! - **`shape`**: band → horizontal extent functions and their wrappers.
//! - **`markup`**: `MarkupNode` trait plus the `roxmltree` adapter.
//! - **`error`**: `LayoutError`.

pub mod color;
pub mod error;
pub mod markup;
pub mod shape;
pub mod units;

// Re-exports for ergonomic use.
pub use color::Color;
pub use error::LayoutError;
pub use markup::{MarkupNode, NodeKind, XmlDocument, XmlNode};
pub use shape::{ColumnShape, RectangleShape, Shape};
pub use units::{parse_length, px, to_px, Fixed, FIXED_ONE};
