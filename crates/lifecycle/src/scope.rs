use crate::{DocumentLifecycle, LifecycleState};
use std::rc::Rc;

/// Advances the lifecycle to a final state when dropped.
///
/// Used by reentrant sub-passes: a nested layout entered from a widget
/// callback ends in `LayoutClean` no matter which phase it unwinds from. Once
/// teardown has started the final advance is skipped, since script may have
/// detached the document while the scope was live.
#[must_use = "the final state is applied when the scope is dropped"]
pub struct LifecycleScope {
    lifecycle: Rc<DocumentLifecycle>,
    final_state: LifecycleState,
}

impl LifecycleScope {
    #[inline]
    pub const fn new(lifecycle: Rc<DocumentLifecycle>, final_state: LifecycleState) -> Self {
        Self {
            lifecycle,
            final_state,
        }
    }
}

impl Drop for LifecycleScope {
    fn drop(&mut self) {
        if self.lifecycle.state() >= LifecycleState::Stopping {
            return;
        }
        self.lifecycle.advance_to(self.final_state);
    }
}

/// Marks the document as detaching layout objects for its lifetime.
#[must_use = "layout tree mutations are only allowed while the scope is alive"]
pub struct DetachScope {
    lifecycle: Rc<DocumentLifecycle>,
}

impl DetachScope {
    #[inline]
    pub fn new(lifecycle: Rc<DocumentLifecycle>) -> Self {
        lifecycle.increment_detach_count();
        Self { lifecycle }
    }
}

impl Drop for DetachScope {
    fn drop(&mut self) {
        self.lifecycle.decrement_detach_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init_logging;

    fn laid_out() -> Rc<DocumentLifecycle> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        for next in [
            LifecycleState::Inactive,
            LifecycleState::StyleClean,
            LifecycleState::InPreLayout,
            LifecycleState::StyleClean,
            LifecycleState::InPerformLayout,
            LifecycleState::AfterPerformLayout,
        ] {
            assert!(lifecycle.advance_to(next));
        }
        lifecycle
    }

    /// A nested scope unwinds to its final state, and the outer scope then
    /// redundantly arrives at the same clean state.
    ///
    /// # Panics
    /// Panics if the scopes do not restore `LayoutClean`.
    #[test]
    fn nested_scopes_unwind_to_layout_clean() {
        init_logging();
        let lifecycle = laid_out();
        {
            let _outer = LifecycleScope::new(Rc::clone(&lifecycle), LifecycleState::LayoutClean);
            {
                let _inner =
                    LifecycleScope::new(Rc::clone(&lifecycle), LifecycleState::LayoutClean);
                assert!(lifecycle.advance_to(LifecycleState::InPreLayout));
                assert!(lifecycle.advance_to(LifecycleState::StyleClean));
                assert!(lifecycle.advance_to(LifecycleState::InPerformLayout));
                assert!(lifecycle.advance_to(LifecycleState::AfterPerformLayout));
            }
            assert_eq!(lifecycle.state(), LifecycleState::LayoutClean);
        }
        assert_eq!(lifecycle.state(), LifecycleState::LayoutClean);
    }

    /// A scope dropped after teardown began leaves the teardown state alone.
    ///
    /// # Panics
    /// Panics if the scope overrides `Stopped`.
    #[test]
    fn scope_skips_after_teardown() {
        init_logging();
        let lifecycle = laid_out();
        {
            let _scope = LifecycleScope::new(Rc::clone(&lifecycle), LifecycleState::LayoutClean);
            assert!(lifecycle.advance_to(LifecycleState::Stopping));
            assert!(lifecycle.advance_to(LifecycleState::Stopped));
        }
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    /// Layout tree mutations are allowed only while a detach scope is alive.
    ///
    /// # Panics
    /// Panics if the detach gate does not follow the scope.
    #[test]
    fn detach_scope_gates_layout_tree_mutations() {
        init_logging();
        let lifecycle = laid_out();
        assert!(!lifecycle.state_allows_layout_tree_mutations());
        {
            let _outer = DetachScope::new(Rc::clone(&lifecycle));
            let _inner = DetachScope::new(Rc::clone(&lifecycle));
            assert!(lifecycle.state_allows_layout_tree_mutations());
        }
        assert!(!lifecycle.in_detach());
    }
}
