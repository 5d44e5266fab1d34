use core::error::Error;
use core::fmt;
use indextree::NodeId;

/// Why a tree mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomError {
    /// The insertion would create a cycle or put a node where it cannot live.
    HierarchyRequest,
    /// A node argument does not exist or is not where the caller said it is.
    NotFound(NodeId),
    /// The document lifecycle is inside a phase that forbids tree mutations.
    LifecycleForbidsMutation,
    /// The node is a document or otherwise cannot be moved into this tree.
    WrongDocument,
}

impl fmt::Display for DomError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HierarchyRequest => formatter.write_str("hierarchy request error"),
            Self::NotFound(node) => write!(formatter, "node {node:?} not found"),
            Self::LifecycleForbidsMutation => {
                formatter.write_str("tree mutation is not allowed in the current lifecycle state")
            }
            Self::WrongDocument => formatter.write_str("node cannot be inserted into this document"),
        }
    }
}

impl Error for DomError {}
