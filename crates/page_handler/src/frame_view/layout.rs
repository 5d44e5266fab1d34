//! The layout pass and the tasks that run before and after it.
//!
//! A pass runs pre-layout tasks (flush leftover post-layout work, media
//! query re-evaluation, style), then geometry, then post-layout tasks.
//! Widget callbacks in the post-layout tasks may lay the frame out again;
//! such nested passes are counted and leave paint invalidation and the
//! full-invalidation flag to the outermost pass.

use super::{AnnotatedRegion, FrameView, FrameViewId, ScrollbarMode};
use crate::document::{Document, PendingSheetLayout};
use crate::events::{Event, EventTarget, EventType};
use crate::tasks::{Task, TimerKind};
use core::mem;
use html::StyleChangeType;
use layouter::LayoutId;
use lifecycle::{LifecycleScope, LifecycleState};
use log::{debug, error, trace};
use std::rc::Rc;
use style_engine::AppRegion;
use tracing::info_span;

impl FrameView {
    /// Lay out the document. With `allow_subtree` a scheduled partial
    /// relayout stays partial; otherwise it is promoted to a full layout.
    ///
    /// Refused while this view is already performing layout, and a no-op
    /// for an inactive document.
    pub fn layout(document: &mut Document, allow_subtree: bool) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.layout.in_perform_layout || !document.lifecycle.is_active() {
            trace!("layout of {:?} skipped", view.id);
            return;
        }
        let id = view.id;
        let _span = info_span!("frame_view.layout", allow_subtree).entered();
        view.layout.pending = false;
        let _scope = LifecycleScope::new(Rc::clone(&document.lifecycle), LifecycleState::LayoutClean);

        if !allow_subtree && let Some(root) = view.layout_subtree_root.take() {
            document.layout_tree.mark_containing_blocks_for_layout(root, None);
        }

        Self::perform_pre_layout_tasks(document);
        // Script run by pre-layout tasks may have detached the frame.
        let Some((root, in_subtree_layout, scheduling_was_enabled)) = Self::enter_layout(document, id)
        else {
            return;
        };

        Self::auto_size_if_enabled(document);
        if !Self::is_alive(document, id) {
            return;
        }
        let (horizontal, vertical) = Self::calculate_scrollbar_modes(document, in_subtree_layout);
        if !in_subtree_layout {
            Self::apply_scrollbar_modes_for_layout(document, horizontal, vertical);
        }
        Self::sync_layout_size(document);
        // Scheduling is off: this only folds stray requests into the pass.
        Self::process_relayout_requests(document);

        if Self::perform_layout(document, root) {
            document.layout_tree.assert_subtree_is_laid_out(root);
        }
        let Some(printing) = Self::leave_perform_layout(document, id, scheduling_was_enabled) else {
            return;
        };
        if !in_subtree_layout && !printing {
            Self::adjust_view_size(document);
        }
        Self::update_layer_positions(document);
        Self::record_layout_complete(document, id);
        Self::update_annotated_regions(document);

        Self::schedule_or_perform_post_layout_tasks(document);
        let Some(current) = Self::view_mut(document, id) else {
            return;
        };
        current.nested_layout_count = current.nested_layout_count.saturating_sub(1);
        if current.nested_layout_count > 0 {
            return;
        }
        Self::invalidate_tree(document);
    }

    /// Pick the layout root and count the nesting level. Returns the root,
    /// whether it is a partial layout, and the scheduling flag to restore.
    fn enter_layout(document: &mut Document, id: FrameViewId) -> Option<(LayoutId, bool, bool)> {
        let view = document
            .frame_view
            .as_mut()
            .filter(|candidate| candidate.id == id)?;
        let subtree_root = view.layout_subtree_root;
        let root = subtree_root.unwrap_or_else(|| document.layout_tree.view());
        let scheduling_was_enabled = mem::replace(&mut view.layout.scheduling_enabled, false);
        view.nested_layout_count += 1;
        let peak = &mut document.counters.nested_layout_peak;
        *peak = (*peak).max(view.nested_layout_count);
        Some((root, subtree_root.is_some(), scheduling_was_enabled))
    }

    /// Clear the partial root and restore scheduling. Returns whether the
    /// view is printing, or `None` if it was detached.
    fn leave_perform_layout(
        document: &mut Document,
        id: FrameViewId,
        scheduling_was_enabled: bool,
    ) -> Option<bool> {
        let view = Self::view_mut(document, id)?;
        view.layout_subtree_root = None;
        view.layout.scheduling_enabled = scheduling_was_enabled;
        Some(view.is_printing())
    }

    fn record_layout_complete(document: &mut Document, id: FrameViewId) {
        if let Some(view) = Self::view_mut(document, id) {
            view.layout_count = view.layout_count.saturating_add(1);
        }
        document.counters.layout_count = document.counters.layout_count.saturating_add(1);
        if let Some(ax_cache) = document.clients.ax_cache() {
            ax_cache.handle_layout_complete(id);
        }
    }

    /// Run post-layout tasks inline, flagged so layouts they trigger defer
    /// theirs. Returns false if the view was detached meanwhile.
    fn run_post_layout_tasks_synchronously(document: &mut Document, id: FrameViewId) -> bool {
        let Some(view) = Self::view_mut(document, id) else {
            return false;
        };
        view.post_layout.in_synchronous_run = true;
        Self::perform_post_layout_tasks(document, false);
        let Some(current) = Self::view_mut(document, id) else {
            return false;
        };
        current.post_layout.in_synchronous_run = false;
        true
    }

    fn perform_pre_layout_tasks(document: &mut Document) {
        let _span = info_span!("frame_view.pre_layout").entered();
        document.lifecycle.advance_to(LifecycleState::InPreLayout);
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        let id = view.id;
        let scheduling_was_enabled = mem::replace(&mut view.layout.scheduling_enabled, false);

        // A new top-level layout finishes what the previous one deferred.
        let flush_deferred = view.nested_layout_count == 0
            && !view.post_layout.in_synchronous_run
            && view.post_layout_tasks_timer.is_active();
        if flush_deferred && !Self::run_post_layout_tasks_synchronously(document, id) {
            return;
        }

        let context = document.style_context();
        if document.styles.viewport_dependent_styles_stale(&context)
            && let Some(html) = document.dom.document_element()
        {
            debug!("viewport-dependent styles are stale; full style recalc");
            document
                .dom
                .set_needs_style_recalc(html, StyleChangeType::SubtreeStyleChange);
        }
        document.update_style_and_layout_tree();

        let Some(current) = Self::view_mut(document, id) else {
            return;
        };
        current.layout.scheduling_enabled = scheduling_was_enabled;
        if document.lifecycle.state() != LifecycleState::StyleClean {
            document.lifecycle.advance_to(LifecycleState::StyleClean);
        }
    }

    /// First-layout bootstrapping and scrollbar policy for a full layout.
    fn apply_scrollbar_modes_for_layout(
        document: &mut Document,
        horizontal: ScrollbarMode,
        vertical: ScrollbarMode,
    ) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        // While autosizing runs, and after it has, it owns the modes.
        let modes_locked =
            view.autosize.enabled && (view.autosize.did_run || view.autosize.in_progress);
        if view.post_layout.first_layout {
            view.post_layout.first_layout = false;
            view.post_layout.first_layout_callback_pending = true;
            view.paint.do_full_invalidation = true;
            view.last_viewport_size = view.frame_size;
            if !modes_locked {
                view.scrollbars.horizontal_mode = horizontal;
                view.scrollbars.vertical_mode = vertical;
            }
            // Guess a vertical bar and no horizontal one; the contents size
            // after this layout corrects the guess.
            view.scrollbars.has_vertical = view.scrollbars.vertical_mode != ScrollbarMode::AlwaysOff;
            view.scrollbars.has_horizontal =
                view.scrollbars.horizontal_mode == ScrollbarMode::AlwaysOn;
            debug!("first layout of {:?}", view.id);
        } else if !modes_locked
            && (horizontal, vertical)
                != (view.scrollbars.horizontal_mode, view.scrollbars.vertical_mode)
        {
            Self::set_scrollbar_modes(document, horizontal, vertical);
        }
        let Some(current) = document.frame_view.as_mut() else {
            return;
        };
        let layout_size = current.layout_size();
        if current.size != layout_size {
            current.size = layout_size;
            current.paint.do_full_invalidation = true;
        }
    }

    /// Geometry for everything dirty below `root`. Returns false if the
    /// lifecycle refused the pass.
    fn perform_layout(document: &mut Document, root: LayoutId) -> bool {
        let _span = info_span!("frame_view.perform_layout").entered();
        if !document.lifecycle.can_advance_to(LifecycleState::InPerformLayout) {
            // Script run by a nested pass dirtied style after pre-layout.
            document.update_style_and_layout_tree();
        }
        if let Err(err) = document
            .lifecycle
            .try_advance_to(LifecycleState::InPerformLayout)
        {
            error!("layout skipped: {err}");
            return false;
        }
        let Some(view) = document.frame_view.as_mut() else {
            return false;
        };
        view.layout.in_perform_layout = true;
        let outcome = document.layout_tree.layout_subtree(root, &document.autosizer);
        view.layout.in_perform_layout = false;
        document.lifecycle.advance_to(LifecycleState::AfterPerformLayout);

        let counters = &mut document.counters;
        counters.objects_laid_out_last = outcome.objects_laid_out as u64;
        counters.objects_laid_out_total = counters
            .objects_laid_out_total
            .saturating_add(outcome.objects_laid_out as u64);
        if outcome.passes > 1 {
            counters.text_autosize_second_passes =
                counters.text_autosize_second_passes.saturating_add(1);
        }
        debug!(
            "laid out {} objects below {root:?} in {} passes",
            outcome.objects_laid_out, outcome.passes
        );
        true
    }

    /// Record where composited boxes ended up.
    fn update_layer_positions(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        let tree = &document.layout_tree;
        let scroll = view.scroll_offset;
        view.composited_layers = tree
            .descendants(tree.view())
            .filter(|id| {
                tree.object(*id)
                    .is_some_and(|object| !object.is_text() && object.style().composited)
            })
            .map(|id| (id, tree.absolute_rect(id, scroll)))
            .collect();
    }

    fn update_annotated_regions(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        let tree = &document.layout_tree;
        let scroll = view.scroll_offset;
        let regions: Vec<AnnotatedRegion> = tree
            .descendants(tree.view())
            .filter_map(|id| {
                let object = tree.object(id)?;
                let draggable = match object.style().app_region {
                    AppRegion::None => return None,
                    AppRegion::Drag => true,
                    AppRegion::NoDrag => false,
                };
                (!object.is_text()).then(|| AnnotatedRegion {
                    rect: tree.absolute_rect(id, scroll),
                    draggable,
                })
            })
            .collect();
        if regions == view.annotated_regions {
            return;
        }
        view.annotated_regions = regions;
        if let Some(embedder) = document.clients.embedder() {
            embedder.annotated_regions_changed(&view.annotated_regions);
        }
    }

    /// Run post-layout tasks now, or defer them to a zero-delay task when
    /// already inside a synchronous run or when another layout is owed.
    fn schedule_or_perform_post_layout_tasks(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.post_layout_tasks_timer.is_active() {
            return;
        }
        let id = view.id;
        if !view.post_layout.in_synchronous_run
            && !Self::run_post_layout_tasks_synchronously(document, id)
        {
            return;
        }
        let needs_layout = Self::needs_layout(document);
        let Some(current) = Self::view_mut(document, id) else {
            return;
        };
        if current.post_layout_tasks_timer.is_active()
            || !(needs_layout || current.post_layout.in_synchronous_run)
        {
            return;
        }
        let generation = current.post_layout_tasks_timer.start();
        trace!("post-layout tasks of {id:?} deferred");
        document.tasks.post(Task::Timer {
            kind: TimerKind::PostLayoutTasks(id),
            generation,
        });
        if needs_layout {
            Self::layout(document, true);
        }
    }

    fn perform_post_layout_tasks(document: &mut Document, deferred: bool) {
        let _span = info_span!("frame_view.post_layout", deferred).entered();
        let parsing = document.is_parsing();
        let did_layout_with_pending_sheets =
            document.pending_sheet_layout == PendingSheetLayout::DidLayoutWithPendingSheets;
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        debug_assert!(
            !view.layout.in_perform_layout,
            "post-layout tasks inside perform layout"
        );
        view.post_layout_tasks_timer.stop();
        let counters = &mut document.counters;
        if deferred {
            counters.post_layout_runs_deferred = counters.post_layout_runs_deferred.saturating_add(1);
        } else {
            counters.post_layout_runs_sync = counters.post_layout_runs_sync.saturating_add(1);
        }

        if view.nested_layout_count <= 1 {
            let first_layout = mem::take(&mut view.post_layout.first_layout_callback_pending);
            if !view.paint.is_visually_non_empty
                && !parsing
                && !document.styles.has_pending_script_blocking_sheets()
                && document.layout_tree.has_visible_content()
            {
                view.paint.is_visually_non_empty = true;
            }
            let first_visually_non_empty = view.paint.is_visually_non_empty
                && !did_layout_with_pending_sheets
                && view.paint.first_visually_non_empty_callback_pending;
            if first_visually_non_empty {
                view.paint.first_visually_non_empty_callback_pending = false;
            }
            if let Some(embedder) = document.clients.embedder() {
                if first_layout {
                    embedder.did_first_layout();
                }
                if first_visually_non_empty {
                    embedder.did_first_visually_non_empty_layout();
                }
            }
        }

        // Widget callbacks can tear the frame down.
        if !Self::update_widget_positions(document) {
            return;
        }
        Self::schedule_update_widgets_if_necessary(document);
        Self::scroll_to_anchor(document);
        Self::send_resize_event_if_needed(document);
    }

    pub(crate) fn post_layout_timer_fired(document: &mut Document, generation: u64) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.post_layout_tasks_timer.fire(generation) {
            Self::perform_post_layout_tasks(document, true);
        }
    }

    /// Run deferred post-layout tasks and widget updates now.
    pub fn flush_any_pending_post_layout_tasks(document: &mut Document) {
        let Some(view) = document.frame_view.as_ref() else {
            return;
        };
        debug_assert!(
            !view.layout.in_perform_layout,
            "flushing post-layout tasks inside perform layout"
        );
        let id = view.id;
        if view.post_layout_tasks_timer.is_active() {
            Self::perform_post_layout_tasks(document, false);
        }
        if Self::view_mut(document, id).is_some_and(|current| current.update_widgets_timer.is_active()) {
            Self::flush_widget_updates(document);
        }
    }

    fn send_resize_event_if_needed(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.is_printing() {
            return;
        }
        let current = view.frame_size;
        if mem::replace(&mut view.last_viewport_size, current) == current {
            return;
        }
        debug!("viewport of {:?} resized to {current:?}", view.id);
        document
            .event_queue
            .enqueue(Event::new(EventType::Resize, EventTarget::Document));
        document.schedule_animation();
    }
}
