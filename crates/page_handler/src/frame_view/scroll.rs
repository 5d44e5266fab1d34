//! Scroll offset changes, blit scrolling and anchor restoration.
//!
//! Scrolling blits the backing surface when it can and repaints only what a
//! blit gets wrong: the old and new positions of boxes fixed to the
//! viewport. Anything the blit would smear (translucent surfaces, overlapped
//! frames, filters on a fixed box) takes the slow path and repaints the
//! whole visible area.

use super::FrameView;
use crate::document::Document;
use crate::events::{Event, EventTarget, EventType};
use crate::host::HostWindow;
use html::NodeId;
use layouter::{IntSize, LayoutRect};
use log::{debug, trace};
use smallvec::SmallVec;
use tracing::info_span;

impl FrameView {
    /// Scroll to `offset` on behalf of the user or script. An explicit scroll
    /// stops the view following its anchor.
    pub fn set_scroll_offset(document: &mut Document, offset: IntSize) -> bool {
        let Some(view) = document.frame_view.as_mut() else {
            return false;
        };
        view.maintain_scroll_position_anchor = None;
        Self::scroll_to_offset(document, offset)
    }

    /// Move the viewport, clamped to the scrollable range. Returns false if
    /// the offset did not change.
    fn scroll_to_offset(document: &mut Document, offset: IntSize) -> bool {
        let Some(view) = document.frame_view.as_mut() else {
            return false;
        };
        let max = view.maximum_scroll_offset();
        let clamped = IntSize::new(
            offset.width.clamp(0, max.width),
            offset.height.clamp(0, max.height),
        );
        let old_offset = view.scroll_offset;
        let delta = IntSize::new(
            clamped.width - old_offset.width,
            clamped.height - old_offset.height,
        );
        if delta.is_zero() {
            return false;
        }
        let id = view.id;
        let _span = info_span!("frame_view.scroll").entered();
        view.scroll_offset = clamped;
        trace!("{id:?} scrolled to {clamped:?}");

        Self::scroll_contents(document, delta, old_offset);
        if let Some(ax_cache) = document.clients.ax_cache() {
            ax_cache.handle_scroll_position_changed(id);
        }
        document
            .event_queue
            .enqueue(Event::new(EventType::Scroll, EventTarget::Document));
        document.schedule_animation();
        true
    }

    /// Update the pixels after the offset moved by `delta`.
    fn scroll_contents(document: &mut Document, delta: IntSize, old_offset: IntSize) {
        let Some(view) = document.frame_view.as_ref() else {
            return;
        };
        let layout_size = view.layout_size();
        let rect_to_scroll = LayoutRect::new(0, 0, layout_size.width, layout_size.height);
        let clip = LayoutRect::new(0, 0, view.frame_size.width, view.frame_size.height);
        let host = document.clients.host();
        let can_blit = host.is_some_and(HostWindow::can_blit_on_scroll)
            && !view.surface.is_transparent
            && !view.surface.is_overlapped;
        let regions = if can_blit {
            Self::fixed_object_repaint_regions(document, delta, old_offset, &rect_to_scroll)
        } else {
            None
        };

        let counters = &mut document.counters;
        let Some(regions) = regions else {
            counters.slow_path_scrolls = counters.slow_path_scrolls.saturating_add(1);
            debug!("slow-path scroll of {:?}", view.id);
            if let Some(window) = host {
                window.invalidate_contents_and_root_view(rect_to_scroll.intersection(&clip));
            }
            return;
        };
        counters.fast_path_scrolls = counters.fast_path_scrolls.saturating_add(1);
        counters.invalidation_rects = counters
            .invalidation_rects
            .saturating_add(regions.len() as u64);
        if let Some(window) = host {
            window.scroll(-delta, rect_to_scroll, clip);
            for region in regions {
                window.invalidate_contents_and_root_view(region);
            }
        }
    }

    /// What a blit scroll leaves wrong: each fixed box where it was, shifted
    /// with the content, united with where it is now. `None` when a fixed
    /// box cannot be blit at all.
    fn fixed_object_repaint_regions(
        document: &Document,
        delta: IntSize,
        old_offset: IntSize,
        rect_to_scroll: &LayoutRect,
    ) -> Option<SmallVec<LayoutRect, 4>> {
        let view = document.frame_view.as_ref()?;
        let tree = &document.layout_tree;
        let mut regions = SmallVec::new();
        for &id in &view.viewport_constrained {
            let Some(object) = tree.object(id) else {
                continue;
            };
            let style = object.style();
            // Composited boxes move on their own layer.
            if style.composited || !style.is_visible() {
                continue;
            }
            if tree.has_filter_in_ancestry(id) {
                trace!("{id:?} has a filter; blit would smear it");
                return None;
            }
            let before = tree.visual_rect_in_viewport(id, old_offset);
            let after = tree.visual_rect_in_viewport(id, view.scroll_offset);
            let region = before
                .translated(-delta)
                .united(&after)
                .intersection(rect_to_scroll);
            if !region.is_empty() {
                regions.push(region);
            }
        }
        Some(regions)
    }

    /// Scroll the remembered anchor into view: top-aligned, and horizontally
    /// aligned to the nearest edge unless it is already fully visible.
    pub(crate) fn scroll_to_anchor(document: &mut Document) {
        let Some(view) = document.frame_view.as_ref() else {
            return;
        };
        let Some(anchor) = view.maintain_scroll_position_anchor else {
            return;
        };
        let id = view.id;
        let tree = &document.layout_tree;
        let rect = if anchor == document.dom.root() {
            LayoutRect::default()
        } else {
            let Some(object) = tree.object_for_node(anchor) else {
                return;
            };
            tree.absolute_rect(object, view.scroll_offset)
        };
        let visible = view.visible_content_rect();
        let horizontally_visible = rect.x >= visible.x && rect.max_x() <= visible.max_x();
        let x = if horizontally_visible {
            visible.x
        } else if rect.width > visible.width || rect.x < visible.x {
            rect.x
        } else {
            rect.max_x() - visible.width
        };
        debug!("scrolling {id:?} to anchor {anchor:?} at {rect:?}");
        Self::set_scroll_offset(document, IntSize::new(x, rect.y));

        if let Some(ax_cache) = document.clients.ax_cache() {
            ax_cache.handle_scrolled_to_anchor(anchor);
        }
        // Scrolling drops the anchor; keep following it unless something
        // else took its place meanwhile.
        if let Some(current) = Self::view_mut(document, id)
            && current.maintain_scroll_position_anchor.is_none()
        {
            current.maintain_scroll_position_anchor = Some(anchor);
        }
    }

    /// Stop following an anchor that left the document with `removed`.
    pub(crate) fn forget_removed_anchor(&mut self, removed: &[NodeId]) {
        if self
            .maintain_scroll_position_anchor
            .is_some_and(|anchor| removed.contains(&anchor))
        {
            self.maintain_scroll_position_anchor = None;
        }
    }

    /// Remember `anchor` and keep it scrolled into view across layouts.
    /// `None` stops following. Lays out first when needed, since the anchor
    /// only has a position once laid out.
    pub fn maintain_scroll_position_at_anchor(document: &mut Document, anchor: Option<NodeId>) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        view.maintain_scroll_position_anchor = anchor;
        if anchor.is_none() {
            return;
        }
        document.update_style_and_layout_tree();
        if document.layout_tree.needs_layout() {
            Self::layout(document, false);
        } else {
            Self::scroll_to_anchor(document);
        }
    }

    /// Scroll to the element named by a URL fragment. The empty fragment and
    /// `top` name the top of the document. Deferred while render-blocking
    /// sheets load; returns whether an anchor was found.
    pub fn scroll_to_fragment(document: &mut Document, name: &str) -> bool {
        if document.styles.has_pending_script_blocking_sheets()
            && !document.styles.ignoring_pending_sheets()
        {
            debug!("fragment {name:?} waits for pending sheets");
            document.goto_anchor_needed = Some(name.to_owned());
            return false;
        }
        document.goto_anchor_needed = None;
        let found = document.dom.get_element_by_id(name);
        let names_top = name.is_empty() || name.eq_ignore_ascii_case("top");
        let Some(anchor) = found.or_else(|| names_top.then(|| document.dom.root())) else {
            return false;
        };
        Self::maintain_scroll_position_at_anchor(document, Some(anchor));
        if found.is_some() && document.is_focusable(anchor) {
            document.set_focused_element(Some(anchor));
        }
        true
    }
}
