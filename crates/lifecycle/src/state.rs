/// Pipeline phases in pass order. The derived ordering is meaningful:
/// `ensure_state_at_most` and `is_active` compare states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Inactive,

    // When the document is active, it traverses these states.
    VisualUpdatePending,

    InStyleRecalc,
    StyleClean,

    InPreLayout,
    InPerformLayout,
    AfterPerformLayout,
    LayoutClean,

    InCompositingUpdate,
    CompositingClean,

    InPaintInvalidation,
    PaintInvalidationClean,

    // Once the document starts shutting down, it cannot return to any of the
    // states above.
    Stopping,
    Stopped,
    Disposed,
}

impl LifecycleState {
    /// States that represent an in-progress phase rather than a checkpoint.
    #[inline]
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::InStyleRecalc
                | Self::InPreLayout
                | Self::InPerformLayout
                | Self::InCompositingUpdate
                | Self::InPaintInvalidation
        )
    }
}

/// The one-step transition table.
pub(crate) fn can_advance(from: LifecycleState, to: LifecycleState) -> bool {
    use LifecycleState::{
        AfterPerformLayout, CompositingClean, Disposed, InCompositingUpdate, InPaintInvalidation,
        InPerformLayout, InPreLayout, InStyleRecalc, Inactive, LayoutClean,
        PaintInvalidationClean, StyleClean, Stopped, Stopping, Uninitialized,
        VisualUpdatePending,
    };

    match from {
        Uninitialized => to == Inactive,
        Inactive => matches!(to, StyleClean | Stopping | Disposed),
        VisualUpdatePending => matches!(
            to,
            InStyleRecalc
                | StyleClean
                | InPreLayout
                | LayoutClean
                | InCompositingUpdate
                | InPaintInvalidation
                | Stopping
        ),
        InStyleRecalc => to == StyleClean,
        StyleClean => matches!(
            to,
            InStyleRecalc
                | StyleClean
                | InPreLayout
                | InPerformLayout
                | LayoutClean
                | InCompositingUpdate
                | InPaintInvalidation
                | Stopping
        ),
        // Post-layout tasks flushed from pre-layout may tear the frame down.
        InPreLayout => matches!(to, InStyleRecalc | StyleClean | InPreLayout | Stopping),
        InPerformLayout => to == AfterPerformLayout,
        // Widget geometry callbacks can synchronously relayout, or detach the frame.
        AfterPerformLayout => matches!(to, InPreLayout | LayoutClean | Stopping),
        LayoutClean => matches!(
            to,
            InStyleRecalc
                | StyleClean
                | InPreLayout
                | InPerformLayout
                | LayoutClean
                | InCompositingUpdate
                | InPaintInvalidation
                | Stopping
        ),
        InCompositingUpdate => to == CompositingClean,
        CompositingClean => matches!(
            to,
            InStyleRecalc | InPreLayout | InCompositingUpdate | InPaintInvalidation | Stopping
        ),
        InPaintInvalidation => to == PaintInvalidationClean,
        PaintInvalidationClean => matches!(
            to,
            InStyleRecalc | InPreLayout | InCompositingUpdate | InPaintInvalidation | Stopping
        ),
        Stopping => to == Stopped,
        Stopped => to == Disposed,
        Disposed => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init_logging;

    /// In-progress phases only ever lead to their clean counterpart.
    ///
    /// # Panics
    /// Panics if an in-progress phase has an unexpected exit.
    #[test]
    fn in_progress_phases_have_single_exit() {
        use LifecycleState::{
            AfterPerformLayout, CompositingClean, Disposed, InCompositingUpdate,
            InPaintInvalidation, InPerformLayout, InPreLayout, InStyleRecalc, Inactive, LayoutClean,
            PaintInvalidationClean, StyleClean, Stopped, Stopping, Uninitialized,
            VisualUpdatePending,
        };

        init_logging();
        let all = [
            Uninitialized,
            Inactive,
            VisualUpdatePending,
            InStyleRecalc,
            StyleClean,
            InPreLayout,
            InPerformLayout,
            AfterPerformLayout,
            LayoutClean,
            InCompositingUpdate,
            CompositingClean,
            InPaintInvalidation,
            PaintInvalidationClean,
            Stopping,
            Stopped,
            Disposed,
        ];
        for (from, exit) in [
            (InStyleRecalc, StyleClean),
            (InPerformLayout, AfterPerformLayout),
            (InCompositingUpdate, CompositingClean),
            (InPaintInvalidation, PaintInvalidationClean),
        ] {
            let exits: Vec<_> = all.iter().filter(|to| can_advance(from, **to)).collect();
            assert_eq!(exits, vec![&exit], "{from:?}");
        }
    }

    /// Nothing leaves `Disposed`, and nothing returns to an active state after `Stopping`.
    ///
    /// # Panics
    /// Panics if teardown can be reversed.
    #[test]
    fn teardown_is_one_way() {
        use LifecycleState::{
            Disposed, InPreLayout, LayoutClean, Stopped, Stopping, StyleClean, VisualUpdatePending,
        };

        init_logging();
        for to in [StyleClean, LayoutClean, VisualUpdatePending, InPreLayout] {
            assert!(!can_advance(Stopping, to));
            assert!(!can_advance(Stopped, to));
            assert!(!can_advance(Disposed, to));
        }
    }
}
