use html::{DOM, NodeId, StyleChangeType};
use std::collections::HashMap;

/// How far a queued invalidation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidationScope {
    SelfOnly,
    Descendants,
}

impl InvalidationScope {
    const fn style_change(self) -> StyleChangeType {
        match self {
            Self::SelfOnly => StyleChangeType::LocalStyleChange,
            Self::Descendants => StyleChangeType::SubtreeStyleChange,
        }
    }
}

/// Invalidations collected from attribute and class changes, applied to the
/// tree at the start of the next style update.
#[derive(Debug, Default)]
pub struct InvalidationQueue {
    pending: HashMap<NodeId, InvalidationScope>,
}

impl InvalidationQueue {
    /// Queue `node`, keeping the wider scope if it is already queued.
    pub fn schedule(&mut self, node: NodeId, scope: InvalidationScope) {
        let entry = self.pending.entry(node).or_insert(scope);
        if scope > *entry {
            *entry = scope;
        }
    }

    pub fn forget(&mut self, node: NodeId) {
        self.pending.remove(&node);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Mark every queued node that is still connected. Returns how many were marked.
    pub fn apply(&mut self, dom: &mut DOM) -> usize {
        let mut applied = 0;
        for (node, scope) in self.pending.drain() {
            if !dom.is_connected(node) {
                continue;
            }
            dom.set_needs_style_recalc(node, scope.style_change());
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::DomError;
    use lifecycle::{DocumentLifecycle, LifecycleState};
    use std::rc::Rc;

    /// Wider scopes win, and disconnected nodes are skipped when applying.
    ///
    /// # Panics
    /// Panics if the queue applies the wrong change.
    #[test]
    fn widest_scope_wins() -> Result<(), DomError> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        let mut dom = DOM::new(lifecycle);
        let connected = dom.create_element("div");
        let detached = dom.create_element("div");
        dom.append_child(dom.root(), connected)?;
        dom.clear_needs_style_recalc(connected);

        let mut queue = InvalidationQueue::default();
        queue.schedule(connected, InvalidationScope::Descendants);
        queue.schedule(connected, InvalidationScope::SelfOnly);
        queue.schedule(detached, InvalidationScope::SelfOnly);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.apply(&mut dom), 1);
        assert!(queue.is_empty());
        assert_eq!(
            dom.style_change_type(connected),
            StyleChangeType::SubtreeStyleChange
        );
        assert!(!dom.needs_style_recalc(detached));
        Ok(())
    }
}
