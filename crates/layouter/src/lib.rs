//! Layout tree for a document: one layout object per rendered node plus
//! anonymous boxes, arena-allocated and addressed by [`LayoutId`].
//!
//! The tree is reconciled with the DOM after style recalc, tracks
//! `needs_layout` dirtiness up to relayout boundaries, lays out blocks,
//! lines and positioned boxes, and reports visual rects for paint
//! invalidation. Mutations are gated by the document lifecycle.

mod autosizer;
mod builder;
pub mod geometry;
mod layout;
mod object;
mod printing;
mod tree;
mod visual;

pub use autosizer::TextAutosizer;
pub use builder::StyleSource;
pub use geometry::{IntPoint, IntSize, LayoutRect};
pub use layout::LayoutOutcome;
pub use object::{LayoutId, LayoutObject, LayoutObjectKind, PaintSpace, VisualRect};
pub use tree::{LayoutTree, LayoutTreeChanges, RelayoutRequest};
pub use visual::PaintInvalidation;
