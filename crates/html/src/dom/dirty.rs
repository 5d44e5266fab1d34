use super::DOM;
use indextree::NodeId;

/// How much of a node's style must be recomputed. Ordered by strength so that
/// repeated marking keeps the strongest request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleChangeType {
    #[default]
    NoStyleChange,
    /// Only this node's style needs recomputing.
    LocalStyleChange,
    /// This node and every descendant must be recomputed.
    SubtreeStyleChange,
    /// The node's layout objects must be rebuilt as well.
    NeedsReattach,
}

impl DOM {
    /// Mark `id` dirty and flag every ancestor with `child_needs_style_recalc`.
    /// Propagation stops at the first ancestor already flagged.
    pub fn set_needs_style_recalc(&mut self, id: NodeId, change: StyleChangeType) {
        if change == StyleChangeType::NoStyleChange {
            return;
        }
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if change > node.style_change {
            node.style_change = change;
        }
        self.mark_ancestors_with_child_needs_style_recalc(id);
    }

    fn mark_ancestors_with_child_needs_style_recalc(&mut self, id: NodeId) {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            let Some(node) = self.node_mut(ancestor) else {
                break;
            };
            if node.child_needs_style_recalc {
                break;
            }
            node.child_needs_style_recalc = true;
            current = self.parent(ancestor);
        }
    }

    pub fn style_change_type(&self, id: NodeId) -> StyleChangeType {
        self.node(id)
            .map_or(StyleChangeType::NoStyleChange, |node| node.style_change)
    }

    pub fn needs_style_recalc(&self, id: NodeId) -> bool {
        self.style_change_type(id) != StyleChangeType::NoStyleChange
    }

    pub fn child_needs_style_recalc(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.child_needs_style_recalc)
    }

    pub fn clear_needs_style_recalc(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.style_change = StyleChangeType::NoStyleChange;
        }
    }

    pub fn clear_child_needs_style_recalc(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.child_needs_style_recalc = false;
        }
    }

    /// Whether any connected node is waiting for style recalc.
    pub fn needs_style_recalc_anywhere(&self) -> bool {
        self.needs_style_recalc(self.root) || self.child_needs_style_recalc(self.root)
    }

    /// First connected node still carrying a style dirty bit, in tree order.
    /// Used by debug assertions after a completed style pass.
    pub fn first_style_dirty_node(&self) -> Option<NodeId> {
        self.descendants(self.root).find(|node| {
            self.needs_style_recalc(*node) || self.child_needs_style_recalc(*node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomError;
    use lifecycle::{DocumentLifecycle, LifecycleState};
    use std::rc::Rc;

    fn chain() -> Result<(DOM, [NodeId; 3]), DomError> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        let mut dom = DOM::new(lifecycle);
        let html = dom.create_element("html");
        let body = dom.create_element("body");
        let div = dom.create_element("div");
        dom.append_child(dom.root(), html)?;
        dom.append_child(html, body)?;
        dom.append_child(body, div)?;
        for node in [dom.root(), html, body, div] {
            dom.clear_needs_style_recalc(node);
            dom.clear_child_needs_style_recalc(node);
        }
        Ok((dom, [html, body, div]))
    }

    /// Marking a leaf flags every ancestor up to the document.
    ///
    /// # Panics
    /// Panics if an ancestor is left unflagged.
    #[test]
    fn marking_propagates_to_root() -> Result<(), DomError> {
        let (mut dom, [html, body, div]) = chain()?;
        assert!(!dom.needs_style_recalc_anywhere());

        dom.set_needs_style_recalc(div, StyleChangeType::LocalStyleChange);
        assert!(dom.needs_style_recalc(div));
        assert!(!dom.child_needs_style_recalc(div));
        for ancestor in [body, html, dom.root()] {
            assert!(dom.child_needs_style_recalc(ancestor));
        }
        assert!(dom.needs_style_recalc_anywhere());
        assert_eq!(dom.first_style_dirty_node(), Some(dom.root()));
        Ok(())
    }

    /// A weaker request does not downgrade a stronger pending one.
    ///
    /// # Panics
    /// Panics if the change type is downgraded.
    #[test]
    fn strongest_change_wins() -> Result<(), DomError> {
        let (mut dom, [_, body, _]) = chain()?;
        dom.set_needs_style_recalc(body, StyleChangeType::SubtreeStyleChange);
        dom.set_needs_style_recalc(body, StyleChangeType::LocalStyleChange);
        assert_eq!(
            dom.style_change_type(body),
            StyleChangeType::SubtreeStyleChange
        );
        Ok(())
    }
}
