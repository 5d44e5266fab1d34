//! Composed style and layout updates, up to paint invalidation.

use super::{Document, PendingSheetLayout};
use crate::frame_view::FrameView;
use html::StyleChangeType;
use lifecycle::LifecycleState;
use log::{debug, error};
use tracing::info_span;

impl Document {
    /// Update style and the layout tree, then lay out if anything is owed.
    ///
    /// Calling this while the frame is performing layout is an engine bug:
    /// it asserts in debug builds and is skipped otherwise.
    pub fn update_style_and_layout(&mut self) {
        if !self.lifecycle.is_active() {
            return;
        }
        let in_perform_layout = self
            .frame_view
            .as_ref()
            .is_some_and(FrameView::is_in_perform_layout);
        debug_assert!(!in_perform_layout, "style and layout update during perform layout");
        if in_perform_layout {
            error!("style and layout update refused during perform layout");
            return;
        }
        let _span = info_span!("document.update_style_and_layout").entered();
        if self.lifecycle.state() == LifecycleState::AfterPerformLayout {
            // Geometry callbacks after layout relayout straight from pre-layout.
            if self.needs_layout_tree_update() || FrameView::needs_layout(self) {
                FrameView::layout(self, true);
            }
        } else {
            self.update_style_and_layout_tree();
            if FrameView::needs_layout(self) {
                FrameView::layout(self, true);
            }
        }
        if self.lifecycle.state() < LifecycleState::LayoutClean
            && self.lifecycle.can_advance_to(LifecycleState::LayoutClean)
        {
            self.lifecycle.advance_to(LifecycleState::LayoutClean);
        }
    }

    /// Update style and layout for a synchronous query even though
    /// render-blocking sheets are still loading. Remembers having done so,
    /// so the frame is fully repainted once the sheets arrive.
    pub fn update_style_and_layout_ignore_pending_stylesheets(&mut self, run_post_layout_tasks: bool) {
        let was_ignoring = self.styles.ignoring_pending_sheets();
        self.styles.set_ignore_pending_sheets(true);
        if self.styles.has_pending_script_blocking_sheets() {
            let body_unrendered = self
                .dom
                .body()
                .is_some_and(|body| self.layout_tree.object_for_node(body).is_none());
            let restyle = if body_unrendered
                && self.pending_sheet_layout == PendingSheetLayout::NoLayoutWithPendingSheets
            {
                debug!("laying out with pending sheets");
                self.pending_sheet_layout = PendingSheetLayout::DidLayoutWithPendingSheets;
                true
            } else {
                // Placeholder-styled nodes need their real style now.
                self.styles.placeholder_node_count() > 0
            };
            if restyle && let Some(html) = self.dom.document_element() {
                self.dom
                    .set_needs_style_recalc(html, StyleChangeType::SubtreeStyleChange);
            }
        }
        self.update_style_and_layout();
        self.styles.set_ignore_pending_sheets(was_ignoring);
        if run_post_layout_tasks {
            FrameView::flush_any_pending_post_layout_tasks(self);
        }
    }

    /// Run every phase up to `PaintInvalidationClean`, as before painting.
    pub fn update_lifecycle_to_paint_invalidation_clean(&mut self) {
        self.update_style_and_layout();
        if !self.lifecycle.is_active() || self.frame_view.is_none() {
            return;
        }
        let _span = info_span!("document.paint_invalidation_update").entered();
        if self.lifecycle.state() == LifecycleState::LayoutClean {
            self.lifecycle.advance_to(LifecycleState::InCompositingUpdate);
            self.lifecycle.advance_to(LifecycleState::CompositingClean);
        }
        if self.lifecycle.state() == LifecycleState::CompositingClean {
            self.lifecycle.advance_to(LifecycleState::InPaintInvalidation);
            FrameView::invalidate_tree(self);
            self.lifecycle
                .advance_to(LifecycleState::PaintInvalidationClean);
        }
    }
}
