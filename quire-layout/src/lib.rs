//! # quire-layout
//!
//! Style sheets, the document tree layouter and the persisted layout format.
//!
//! ## Architecture
//!
//! ```text
//!  XHTML text ──► XmlDocument ──► layout_document(root, sheet, shape)
//!                                      │
//!     StyleSheet.resolve(node, attr) ◄─┤  per node, fresh on every call
//!     StyleSheet.find_family(name)   ◄─┤
//!                                      ▼
//!        boxed(html | body | p | ul) ──► layout_paragraph ──► TextLayout
//!                                                                 │
//!                                         save_layout / load_layout
//! ```
//!
//! ## Crate modules
//!
//! - [`cascade`]: style sheet text, rules, selectors, priorities and inheritance
//! - [`xhtml`]: block dispatch and the box model
//! - [`persist`]: JSON form of a finished layout

pub mod cascade;
pub mod persist;
pub mod xhtml;

// Re-exports for convenience
pub use cascade::{default_value, is_inheriting, Selector, StyleSheet};
pub use persist::{load_layout, save_layout};
pub use xhtml::{layout_document, layout_xhtml};
