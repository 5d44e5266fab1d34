use super::DOM;
use indextree::NodeId;

/// A record of one applied mutation, drained by the owning document and
/// forwarded to every [`DOMSubscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertNode {
        parent: NodeId,
        node: NodeId,
    },
    /// `subtree` lists the removed node and all of its descendants in tree order.
    RemoveNode {
        parent: NodeId,
        node: NodeId,
        subtree: Vec<NodeId>,
    },
    SetAttr {
        node: NodeId,
        name: String,
        old: Option<String>,
        value: Option<String>,
    },
    SetText {
        node: NodeId,
    },
    EndOfDocument,
}

/// A mirror of DOM state that must hear about every mutation.
pub trait DOMSubscriber {
    /// Observe an update after it has been applied to `dom`.
    fn apply_update(&mut self, dom: &DOM, update: &DOMUpdate);
}
