//! DOM tree and markup parser.
//!
//! The [`dom::DOM`] is an arena of nodes that also tracks per-node style
//! dirtiness. Structural mutations are gated on the owning document's
//! lifecycle and recorded as [`dom::DOMUpdate`]s for subscribers such as the
//! style engine and the layout tree. The [`parser::DocumentParser`] turns
//! markup written into an open document into tree mutations, yielding to the
//! caller whenever a `<script>` element closes.

pub mod dom;
pub mod parser;

pub use dom::{DOM, DOMNode, DOMSubscriber, DOMUpdate, DomError, NodeKind, StyleChangeType};
pub use indextree::NodeId;
pub use parser::{DocumentParser, ParserInput, PumpResult};
