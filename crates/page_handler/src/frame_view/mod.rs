//! Per-frame layout, scroll and paint invalidation orchestration.
//!
//! A [`FrameView`] is owned by its [`Document`]. Every operation that can
//! reach script (event listeners, widget callbacks, nested layouts) is an
//! associated function taking the whole document, and re-checks afterwards
//! that the view it started with is still attached by comparing
//! [`FrameViewId`]s. A view detached mid-operation makes the caller stop,
//! never touch stale state.

mod autosize;
mod layout;
mod paint_invalidation;
mod scroll;
mod scrollbars;
mod widgets;

pub use scrollbars::ScrollbarMode;
pub use widgets::{WidgetClient, WidgetEntry};

use crate::config::FrameConfig;
use crate::document::Document;
use crate::tasks::OneShotTimer;
use html::{NodeId, StyleChangeType};
use layouter::{IntSize, LayoutId, LayoutRect, RelayoutRequest};
use lifecycle::LifecycleState;
use log::{debug, trace};
use style_engine::ColorRGBA;

/// Identity of one frame view instance; never reused by its document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameViewId(u64);

impl FrameViewId {
    /// The id after `self`, for the document's next frame view.
    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// A `-webkit-app-region` rect reported to the embedder, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotatedRegion {
    pub rect: LayoutRect,
    pub draggable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaType {
    #[default]
    Screen,
    Print,
}

#[derive(Debug, Clone, Copy)]
struct LayoutFlags {
    /// A relayout was scheduled and has not run yet.
    pending: bool,
    /// Cleared while layout runs so dirtying does not reschedule.
    scheduling_enabled: bool,
    in_perform_layout: bool,
}

#[derive(Debug, Clone, Copy)]
struct PostLayoutFlags {
    in_synchronous_run: bool,
    first_layout: bool,
    first_layout_callback_pending: bool,
}

#[derive(Debug, Clone, Copy)]
struct PaintFlags {
    do_full_invalidation: bool,
    first_visually_non_empty_callback_pending: bool,
    is_visually_non_empty: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SurfaceFlags {
    is_painting: bool,
    is_overlapped: bool,
    is_transparent: bool,
}

#[derive(Debug, Clone, Copy)]
struct AutoSizeState {
    enabled: bool,
    did_run: bool,
    in_progress: bool,
    min: IntSize,
    max: IntSize,
}

#[derive(Debug)]
pub struct FrameView {
    id: FrameViewId,
    frame_size: IntSize,
    /// Layout size the last full layout ran with.
    size: IntSize,
    scroll_offset: IntSize,
    contents_size: IntSize,
    last_viewport_size: IntSize,
    layout_subtree_root: Option<LayoutId>,
    nested_layout_count: u32,
    layout_count: u64,
    layout: LayoutFlags,
    post_layout: PostLayoutFlags,
    paint: PaintFlags,
    surface: SurfaceFlags,
    scrollbars: scrollbars::Scrollbars,
    autosize: AutoSizeState,
    media_type: MediaType,
    base_background: ColorRGBA,
    post_layout_tasks_timer: OneShotTimer,
    update_widgets_timer: OneShotTimer,
    maintain_scroll_position_anchor: Option<NodeId>,
    viewport_constrained: Vec<LayoutId>,
    widgets: Vec<WidgetEntry>,
    widget_update_set: Vec<NodeId>,
    annotated_regions: Vec<AnnotatedRegion>,
    composited_layers: Vec<(LayoutId, LayoutRect)>,
}

impl FrameView {
    pub fn new(config: &FrameConfig, id: FrameViewId) -> Self {
        let mut view = Self {
            id,
            frame_size: config.frame_size,
            size: IntSize::ZERO,
            scroll_offset: IntSize::ZERO,
            contents_size: IntSize::ZERO,
            last_viewport_size: IntSize::ZERO,
            layout_subtree_root: None,
            nested_layout_count: 0,
            layout_count: 0,
            layout: LayoutFlags {
                pending: false,
                scheduling_enabled: true,
                in_perform_layout: false,
            },
            post_layout: PostLayoutFlags {
                in_synchronous_run: false,
                first_layout: true,
                first_layout_callback_pending: false,
            },
            paint: PaintFlags {
                do_full_invalidation: false,
                first_visually_non_empty_callback_pending: true,
                is_visually_non_empty: false,
            },
            surface: SurfaceFlags::default(),
            scrollbars: scrollbars::Scrollbars::new(config.scrollbar_space()),
            autosize: AutoSizeState {
                enabled: config.autosize_enabled,
                did_run: false,
                in_progress: false,
                min: config.autosize_min,
                max: config.autosize_max,
            },
            media_type: MediaType::Screen,
            base_background: ColorRGBA::WHITE,
            post_layout_tasks_timer: OneShotTimer::default(),
            update_widgets_timer: OneShotTimer::default(),
            maintain_scroll_position_anchor: None,
            viewport_constrained: Vec::new(),
            widgets: Vec::new(),
            widget_update_set: Vec::new(),
            annotated_regions: Vec::new(),
            composited_layers: Vec::new(),
        };
        view.reset();
        view
    }

    /// Forget per-document state, as when the frame navigates.
    pub fn reset(&mut self) {
        self.layout.pending = false;
        self.layout.scheduling_enabled = true;
        self.layout.in_perform_layout = false;
        self.layout_subtree_root = None;
        self.paint.do_full_invalidation = false;
        self.post_layout.in_synchronous_run = false;
        self.post_layout.first_layout = true;
        self.post_layout.first_layout_callback_pending = false;
        self.paint.first_visually_non_empty_callback_pending = true;
        self.paint.is_visually_non_empty = false;
        self.layout_count = 0;
        self.nested_layout_count = 0;
        self.post_layout_tasks_timer.stop();
        self.update_widgets_timer.stop();
        self.last_viewport_size = IntSize::ZERO;
        self.surface.is_painting = false;
        self.surface.is_overlapped = false;
        self.maintain_scroll_position_anchor = None;
        self.viewport_constrained.clear();
        self.widgets.clear();
        self.widget_update_set.clear();
        self.annotated_regions.clear();
        self.composited_layers.clear();
        self.autosize.did_run = false;
        self.scroll_offset = IntSize::ZERO;
        trace!("frame view {:?} reset", self.id);
    }

    #[inline]
    pub const fn id(&self) -> FrameViewId {
        self.id
    }

    #[inline]
    pub const fn frame_size(&self) -> IntSize {
        self.frame_size
    }

    /// The frame size minus the space taken by visible non-overlay scrollbars.
    pub fn layout_size(&self) -> IntSize {
        let space = self.scrollbars.space;
        let width = self.frame_size.width - if self.scrollbars.has_vertical { space } else { 0 };
        let height = self.frame_size.height - if self.scrollbars.has_horizontal { space } else { 0 };
        IntSize::new(width.max(0), height.max(0))
    }

    /// The part of the document currently visible, in document coordinates.
    pub fn visible_content_rect(&self) -> LayoutRect {
        let size = self.layout_size();
        LayoutRect::new(
            self.scroll_offset.width,
            self.scroll_offset.height,
            size.width,
            size.height,
        )
    }

    #[inline]
    pub const fn scroll_offset(&self) -> IntSize {
        self.scroll_offset
    }

    #[inline]
    pub const fn contents_size(&self) -> IntSize {
        self.contents_size
    }

    #[inline]
    pub const fn is_in_perform_layout(&self) -> bool {
        self.layout.in_perform_layout
    }

    #[inline]
    pub const fn layout_pending(&self) -> bool {
        self.layout.pending
    }

    #[inline]
    pub const fn layout_subtree_root(&self) -> Option<LayoutId> {
        self.layout_subtree_root
    }

    #[inline]
    pub const fn nested_layout_count(&self) -> u32 {
        self.nested_layout_count
    }

    #[inline]
    pub const fn layout_count(&self) -> u64 {
        self.layout_count
    }

    #[inline]
    pub const fn is_painting(&self) -> bool {
        self.surface.is_painting
    }

    #[inline]
    pub const fn is_visually_non_empty(&self) -> bool {
        self.paint.is_visually_non_empty
    }

    #[inline]
    pub const fn post_layout_tasks_pending(&self) -> bool {
        self.post_layout_tasks_timer.is_active()
    }

    #[inline]
    pub const fn widget_updates_pending(&self) -> bool {
        self.update_widgets_timer.is_active()
    }

    #[inline]
    pub const fn media_type(&self) -> MediaType {
        self.media_type
    }

    #[inline]
    pub const fn is_printing(&self) -> bool {
        matches!(self.media_type, MediaType::Print)
    }

    #[inline]
    pub const fn maintained_anchor(&self) -> Option<NodeId> {
        self.maintain_scroll_position_anchor
    }

    pub fn viewport_constrained_objects(&self) -> &[LayoutId] {
        &self.viewport_constrained
    }

    pub fn annotated_regions(&self) -> &[AnnotatedRegion] {
        &self.annotated_regions
    }

    #[inline]
    pub const fn is_overlapped(&self) -> bool {
        self.surface.is_overlapped
    }

    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.surface.is_transparent
    }

    pub const fn set_transparent(&mut self, transparent: bool) {
        self.surface.is_transparent = transparent;
    }

    #[inline]
    pub const fn base_background_color(&self) -> ColorRGBA {
        self.base_background
    }

    pub const fn set_base_background_color(&mut self, color: ColorRGBA) {
        self.base_background = color;
    }

    /// Whether a layout is owed: scheduled, partial, or dirty objects in the tree.
    pub fn needs_layout(document: &Document) -> bool {
        document.frame_view.as_ref().is_some_and(|view| {
            view.layout.pending
                || view.layout_subtree_root.is_some()
                || document.layout_tree.needs_layout()
        })
    }

    /// Whether `id` still names the document's attached view.
    pub(crate) fn is_alive(document: &Document, id: FrameViewId) -> bool {
        document
            .frame_view
            .as_ref()
            .is_some_and(|view| view.id == id)
    }

    /// The attached view, if it is still the one named by `id`.
    pub(crate) fn view_mut(document: &mut Document, id: FrameViewId) -> Option<&mut Self> {
        document.frame_view.as_mut().filter(|view| view.id == id)
    }

    /// Ask for a full relayout at the next visual update.
    pub fn schedule_relayout(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if let Some(root) = view.layout_subtree_root.take() {
            document.layout_tree.mark_containing_blocks_for_layout(root, None);
        }
        if !view.layout.scheduling_enabled || view.layout.pending {
            return;
        }
        if !document.layout_tree.needs_layout() || document.dom.document_element().is_none() {
            return;
        }
        view.layout.pending = true;
        debug!("relayout scheduled for {:?}", view.id);
        document.schedule_animation();
        document.rewind_lifecycle_to(LifecycleState::StyleClean);
    }

    /// Ask for a relayout of the subtree below `relayout_root`, merging with
    /// any partial relayout already scheduled.
    pub fn schedule_relayout_of_subtree(document: &mut Document, relayout_root: LayoutId) {
        let tree = &mut document.layout_tree;
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if tree.needs_layout() {
            // A full layout is already owed; it will reach this subtree.
            tree.mark_containing_blocks_for_layout(relayout_root, None);
            return;
        }
        if view.layout.pending || !view.layout.scheduling_enabled {
            let scheduled = view.layout_subtree_root;
            if scheduled == Some(relayout_root) {
                return;
            }
            match scheduled {
                Some(current) if tree.is_container_ancestor(current, relayout_root) => {
                    // The scheduled subtree contains the new root.
                    tree.mark_containing_blocks_for_layout(relayout_root, Some(current));
                }
                Some(current) if tree.is_container_ancestor(relayout_root, current) => {
                    // The new root contains the scheduled one; relayout from it.
                    tree.mark_containing_blocks_for_layout(current, Some(relayout_root));
                    view.layout_subtree_root = Some(relayout_root);
                }
                _ => {
                    // Unrelated roots: fall back to a full layout.
                    if let Some(current) = view.layout_subtree_root.take() {
                        tree.mark_containing_blocks_for_layout(current, None);
                    }
                    tree.mark_containing_blocks_for_layout(relayout_root, None);
                }
            }
            return;
        }
        view.layout_subtree_root = Some(relayout_root);
        view.layout.pending = true;
        debug!("subtree relayout scheduled at {relayout_root:?}");
        document.schedule_animation();
        document.rewind_lifecycle_to(LifecycleState::StyleClean);
    }

    /// Route the layout tree's relayout requests to the schedulers.
    pub(crate) fn process_relayout_requests(document: &mut Document) {
        for request in document.layout_tree.take_relayout_requests() {
            match request {
                RelayoutRequest::Full => Self::schedule_relayout(document),
                RelayoutRequest::Subtree(root) => Self::schedule_relayout_of_subtree(document, root),
            }
        }
    }

    /// Fold layout tree bookkeeping (viewport-constrained objects, widgets,
    /// destroyed objects) into the view's registries.
    pub(crate) fn sync_layout_tree_changes(document: &mut Document) {
        let changes = document.layout_tree.take_changes();
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if changes.is_empty() {
            return;
        }
        view.viewport_constrained
            .retain(|id| !changes.constrained_removed.contains(id));
        for id in changes.constrained_added {
            if !view.viewport_constrained.contains(&id) {
                view.viewport_constrained.push(id);
            }
        }
        for (object, owner) in changes.widgets_removed {
            view.remove_widget(object, owner);
        }
        for (object, owner) in changes.widgets_added {
            view.add_widget(object, owner);
        }
        if let Some(root) = view.layout_subtree_root
            && changes.destroyed.contains(&root)
        {
            view.layout_subtree_root = None;
        }
        view.viewport_constrained
            .retain(|id| !changes.destroyed.contains(id));
        view.composited_layers
            .retain(|(id, _)| !changes.destroyed.contains(id));
        if changes.full_paint_invalidation {
            view.paint.do_full_invalidation = true;
        }
    }

    /// Give the frame a new size, dirtying layout when the layout size changes.
    pub fn resize(document: &mut Document, size: IntSize) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.frame_size == size {
            return;
        }
        debug!("frame {:?} resized to {size:?}", view.id);
        view.frame_size = size;
        let contents = view.contents_size;
        view.scrollbars.update(size, contents);
        view.clamp_scroll_offset();
        Self::sync_layout_size(document);
        Self::process_relayout_requests(document);
    }

    /// Push the current layout size into the layout tree.
    pub(crate) fn sync_layout_size(document: &mut Document) {
        let Some(view) = document.frame_view.as_ref() else {
            return;
        };
        if document.lifecycle.state_allows_layout_invalidation() {
            document.layout_tree.set_view_size(view.layout_size());
        }
    }

    /// Switch between screen and print media; printing forces a full repaint.
    pub fn set_media_type(document: &mut Document, media_type: MediaType) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.media_type == media_type {
            return;
        }
        view.media_type = media_type;
        view.paint.do_full_invalidation = true;
        if let Some(html) = document.dom.document_element() {
            document
                .dom
                .set_needs_style_recalc(html, StyleChangeType::SubtreeStyleChange);
        }
        document.schedule_layout_tree_update_if_needed();
    }

    fn clamp_scroll_offset(&mut self) {
        let max = self.maximum_scroll_offset();
        self.scroll_offset = IntSize::new(
            self.scroll_offset.width.clamp(0, max.width),
            self.scroll_offset.height.clamp(0, max.height),
        );
    }

    pub fn maximum_scroll_offset(&self) -> IntSize {
        let visible = self.layout_size();
        IntSize::new(
            (self.contents_size.width - visible.width).max(0),
            (self.contents_size.height - visible.height).max(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Navigation drops per-document state but keeps the frame geometry.
    ///
    /// # Panics
    /// Panics if state survives the reset.
    #[test]
    fn reset_forgets_document_state() {
        let config = FrameConfig::new(IntSize::new(300, 200), true);
        let id = FrameViewId::default().next();
        let mut view = FrameView::new(&config, id);
        view.layout.pending = true;
        view.layout_count = 3;
        view.scroll_offset = IntSize::new(0, 40);
        view.post_layout.first_layout = false;
        view.post_layout_tasks_timer.start();
        view.update_widgets_timer.start();

        view.reset();
        assert_eq!(view.id(), id);
        assert_eq!(view.frame_size(), IntSize::new(300, 200));
        assert!(!view.layout_pending());
        assert_eq!(view.layout_count(), 0);
        assert_eq!(view.scroll_offset(), IntSize::ZERO);
        assert!(view.post_layout.first_layout);
        assert!(!view.post_layout_tasks_pending());
        assert!(!view.widget_updates_pending());
    }
}
