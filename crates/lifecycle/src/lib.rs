//! Document lifecycle state machine.
//!
//! Every document carries one [`DocumentLifecycle`]. The pipeline advances it
//! through style recalc, layout, compositing and paint invalidation, and the
//! rest of the engine consults it before mutating the DOM or the layout tree.
//! The lifecycle keeps its state in [`Cell`]s so that scoped helpers can hold
//! a shared handle while the owning document is mutably borrowed.

use core::cell::Cell;
use core::error::Error;
use core::fmt;
use log::error;

mod scope;
mod state;

pub use scope::{DetachScope, LifecycleScope};
pub use state::LifecycleState;

/// A transition that the lifecycle table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `advance_to` was asked for a state not reachable from the current one.
    InvalidAdvance {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// `ensure_state_at_most` was asked to rewind from a state that cannot rewind.
    InvalidRewind {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAdvance { from, to } => {
                write!(formatter, "cannot advance lifecycle from {from:?} to {to:?}")
            }
            Self::InvalidRewind { from, to } => {
                write!(formatter, "cannot rewind lifecycle from {from:?} to {to:?}")
            }
        }
    }
}

impl Error for LifecycleError {}

/// The per-document pipeline phase tracker.
#[derive(Debug)]
pub struct DocumentLifecycle {
    state: Cell<LifecycleState>,
    /// Number of live [`DetachScope`]s; layout tree mutations are legal while non-zero.
    detach_count: Cell<u32>,
    /// Total transitions applied, used by telemetry and tests.
    transitions: Cell<u64>,
}

impl Default for DocumentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLifecycle {
    /// Create a lifecycle in the `Uninitialized` state.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Cell::new(LifecycleState::Uninitialized),
            detach_count: Cell::new(0),
            transitions: Cell::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Number of transitions applied so far.
    #[inline]
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transitions.get()
    }

    /// A document is active between activation and the start of teardown.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        let state = self.state();
        state > LifecycleState::Inactive && state < LifecycleState::Stopping
    }

    #[inline]
    #[must_use]
    pub fn in_detach(&self) -> bool {
        self.detach_count.get() > 0
    }

    /// Whether the DOM tree structure may change in the current phase.
    #[inline]
    #[must_use]
    pub fn state_allows_tree_mutations(&self) -> bool {
        !matches!(
            self.state(),
            LifecycleState::InStyleRecalc
                | LifecycleState::InPerformLayout
                | LifecycleState::InCompositingUpdate
                | LifecycleState::InPaintInvalidation
        )
    }

    /// Layout objects may be created or destroyed only during style recalc or a detach.
    #[inline]
    #[must_use]
    pub fn state_allows_layout_tree_mutations(&self) -> bool {
        self.in_detach() || self.state() == LifecycleState::InStyleRecalc
    }

    /// Whether `needs_layout` bits may be set in the current phase.
    #[inline]
    #[must_use]
    pub fn state_allows_layout_invalidation(&self) -> bool {
        !matches!(
            self.state(),
            LifecycleState::InPerformLayout
                | LifecycleState::InCompositingUpdate
                | LifecycleState::InPaintInvalidation
        )
    }

    /// Whether `next` is reachable from the current state in one step.
    #[must_use]
    pub fn can_advance_to(&self, next: LifecycleState) -> bool {
        state::can_advance(self.state(), next)
    }

    /// Whether the current state may be rewound to `target`.
    #[must_use]
    pub fn can_rewind_to(&self, target: LifecycleState) -> bool {
        matches!(
            target,
            LifecycleState::VisualUpdatePending
                | LifecycleState::StyleClean
                | LifecycleState::LayoutClean
        ) && matches!(
            self.state(),
            LifecycleState::StyleClean
                | LifecycleState::AfterPerformLayout
                | LifecycleState::LayoutClean
                | LifecycleState::CompositingClean
                | LifecycleState::PaintInvalidationClean
        )
    }

    /// Advance to `next`, reporting an invalid transition without asserting.
    ///
    /// # Errors
    /// Returns [`LifecycleError::InvalidAdvance`] if the transition table does not allow it.
    pub fn try_advance_to(&self, next: LifecycleState) -> Result<(), LifecycleError> {
        let from = self.state();
        if !state::can_advance(from, next) {
            return Err(LifecycleError::InvalidAdvance { from, to: next });
        }
        self.set_state(next);
        Ok(())
    }

    /// Advance to `next`. An invalid transition is an engine bug: it asserts in
    /// debug builds and is skipped with an error log in release builds.
    pub fn advance_to(&self, next: LifecycleState) -> bool {
        let from = self.state();
        let allowed = state::can_advance(from, next);
        debug_assert!(allowed, "cannot advance lifecycle from {from:?} to {next:?}");
        if !allowed {
            error!("cannot advance lifecycle from {from:?} to {next:?}; transition skipped");
            return false;
        }
        self.set_state(next);
        true
    }

    /// Rewind to `target` if the current state is past it; no-op otherwise.
    ///
    /// # Errors
    /// Returns [`LifecycleError::InvalidRewind`] if the current state cannot rewind.
    pub fn try_ensure_state_at_most(&self, target: LifecycleState) -> Result<(), LifecycleError> {
        if self.state() <= target {
            return Ok(());
        }
        if !self.can_rewind_to(target) {
            return Err(LifecycleError::InvalidRewind {
                from: self.state(),
                to: target,
            });
        }
        self.set_state(target);
        Ok(())
    }

    /// Asserting variant of [`Self::try_ensure_state_at_most`].
    pub fn ensure_state_at_most(&self, target: LifecycleState) -> bool {
        let from = self.state();
        let allowed = from <= target || self.can_rewind_to(target);
        debug_assert!(allowed, "cannot rewind lifecycle from {from:?} to {target:?}");
        if !allowed {
            error!("cannot rewind lifecycle from {from:?} to {target:?}; rewind skipped");
            return false;
        }
        if from > target {
            self.set_state(target);
        }
        true
    }

    fn set_state(&self, next: LifecycleState) {
        self.state.set(next);
        self.transitions.set(self.transitions.get().saturating_add(1));
    }

    pub(crate) fn increment_detach_count(&self) {
        self.detach_count.set(self.detach_count.get().saturating_add(1));
    }

    pub(crate) fn decrement_detach_count(&self) {
        debug_assert!(self.detach_count.get() > 0, "unbalanced detach scope");
        self.detach_count.set(self.detach_count.get().saturating_sub(1));
    }
}
