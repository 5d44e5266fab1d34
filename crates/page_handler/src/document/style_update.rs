//! Style recalc and layout tree reconciliation.

use super::Document;
use crate::frame_view::FrameView;
use core::mem;
use html::{NodeId, StyleChangeType};
use lifecycle::LifecycleState;
use log::{debug, error, trace};
use std::collections::HashSet;
use std::sync::Arc;
use style_engine::{ColorRGBA, ComputedStyle, Display, StyleContext, StyleDifference};
use tracing::info_span;

/// DOM parents whose layout children need rebuilding, in first-queued
/// order and without duplicates.
#[derive(Debug, Default)]
pub(super) struct ChildRebuilds {
    parents: Vec<NodeId>,
    queued: HashSet<NodeId>,
}

impl ChildRebuilds {
    /// Queue `parent` unless it is already queued.
    pub(super) fn push(&mut self, parent: NodeId) {
        if self.queued.insert(parent) {
            self.parents.push(parent);
        }
    }

    pub(super) const fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub(super) fn clear(&mut self) {
        self.parents.clear();
        self.queued.clear();
    }

    pub(super) fn into_parents(self) -> Vec<NodeId> {
        self.parents
    }
}

impl Document {
    /// Schedule a visual update if style is dirty and none is pending yet.
    pub(crate) fn schedule_layout_tree_update_if_needed(&mut self) {
        if !self.lifecycle.is_active() || self.frame_view.is_none() {
            return;
        }
        let state = self.lifecycle.state();
        if state == LifecycleState::InStyleRecalc || state == LifecycleState::VisualUpdatePending {
            return;
        }
        if !self.needs_layout_tree_update() {
            return;
        }
        self.schedule_layout_tree_update();
    }

    fn schedule_layout_tree_update(&mut self) {
        debug_assert!(
            self.lifecycle.state() != LifecycleState::VisualUpdatePending,
            "visual update already pending"
        );
        self.schedule_animation();
        self.rewind_lifecycle_to(LifecycleState::VisualUpdatePending);
        self.counters.style_version = self.counters.style_version.saturating_add(1);
        trace!("style version now {}", self.counters.style_version);
    }

    /// Bring styles and the layout tree up to date. A no-op when nothing is
    /// dirty, and refused while a style recalc is already running.
    pub fn update_style_and_layout_tree(&mut self) {
        if !self.lifecycle.is_active() || !self.needs_layout_tree_update() {
            return;
        }
        let state = self.lifecycle.state();
        if state == LifecycleState::InStyleRecalc {
            debug!("style recalc already running");
            return;
        }
        if !self.lifecycle.can_advance_to(LifecycleState::InStyleRecalc)
            && !self.rewind_lifecycle_to(LifecycleState::VisualUpdatePending)
        {
            error!("style recalc refused in {state:?}");
            return;
        }
        let _span = info_span!("document.style_recalc").entered();
        if !self.lifecycle.advance_to(LifecycleState::InStyleRecalc) {
            return;
        }

        let invalidated = self.styles.invalidate(&mut self.dom);
        trace!("{invalidated} nodes invalidated");
        self.styles.begin_recalc();
        let context = self.style_context();
        let root = self.dom.root();
        let mut rebuilds = mem::take(&mut self.pending_child_rebuilds);
        self.recalc_children(root, None, false, &context, &mut rebuilds);
        self.dom.clear_needs_style_recalc(root);
        self.dom.clear_child_needs_style_recalc(root);

        for parent in rebuilds.into_parents() {
            if self.dom.is_connected(parent) {
                self.layout_tree
                    .rebuild_children(&self.dom, parent, &self.styles);
            }
        }
        self.update_view_style();

        let restyled = self.styles.last_resolve_count();
        let counters = &mut self.counters;
        counters.nodes_restyled_last = restyled;
        counters.nodes_restyled_total = counters.nodes_restyled_total.saturating_add(restyled);
        debug!("style recalc resolved {restyled} elements");

        self.lifecycle.advance_to(LifecycleState::StyleClean);
        debug_assert!(
            self.dom.first_style_dirty_node().is_none(),
            "style still dirty after recalc"
        );
        FrameView::sync_layout_tree_changes(self);
        FrameView::process_relayout_requests(self);
        FrameView::recalc_overflow_after_style_change(self);
        self.clear_focused_element_if_unfocusable();
    }

    /// Top-down recalc of the children of `parent`. `force` restyles every
    /// element, as after an inherited property of the parent changed.
    fn recalc_children(
        &mut self,
        parent: NodeId,
        parent_style: Option<&Arc<ComputedStyle>>,
        force: bool,
        context: &StyleContext,
        rebuilds: &mut ChildRebuilds,
    ) {
        let children: Vec<NodeId> = self.dom.children(parent).collect();
        for child in children {
            let change = self.dom.style_change_type(child);
            if change == StyleChangeType::NeedsReattach {
                rebuilds.push(parent);
            }
            if !self.dom.is_element(child) {
                self.dom.clear_needs_style_recalc(child);
                continue;
            }
            let mut style = None;
            let mut force_children = force || change >= StyleChangeType::SubtreeStyleChange;
            if force || change != StyleChangeType::NoStyleChange {
                let (resolved, inherited_changed) =
                    self.recalc_element(child, parent, parent_style, context, rebuilds);
                force_children |= inherited_changed;
                style = Some(resolved);
            }
            if force_children || self.dom.child_needs_style_recalc(child) {
                let own_style = style.or_else(|| self.styles.computed_style(child));
                self.recalc_children(child, own_style.as_ref(), force_children, context, rebuilds);
            }
            self.dom.clear_needs_style_recalc(child);
            self.dom.clear_child_needs_style_recalc(child);
        }
    }

    /// Resolve one element and hand the style to its layout object. Returns
    /// the style and whether it differs from the previous one.
    fn recalc_element(
        &mut self,
        element: NodeId,
        parent: NodeId,
        parent_style: Option<&Arc<ComputedStyle>>,
        context: &StyleContext,
        rebuilds: &mut ChildRebuilds,
    ) -> (Arc<ComputedStyle>, bool) {
        let object = self.layout_tree.object_for_node(element);
        let (style, previous) = self.styles.resolve_style_for_element(
            &self.dom,
            element,
            parent_style.map(AsRef::as_ref),
            object.is_some(),
            context,
        );
        let changed = previous.as_deref() != Some(&*style);
        // Without a box, the element gains one unless it stays display: none.
        let needs_rebuild = object.map_or_else(
            || style.display != Display::None,
            |object| {
                self.layout_tree.set_style(object, Arc::clone(&style)) == StyleDifference::Reattach
            },
        );
        if needs_rebuild {
            rebuilds.push(parent);
        }
        (style, changed)
    }

    /// The view paints the root background: the `html` background, or the
    /// `body` one when `html` has none.
    fn update_view_style(&mut self) {
        let tree = &self.layout_tree;
        let Some(current) = tree.object(tree.view()).map(|view| Arc::clone(view.style())) else {
            return;
        };
        let background_of = |node: Option<NodeId>| {
            node.and_then(|element| self.styles.computed_style(element))
                .map(|style| style.background_color)
                .filter(|color| color.alpha > 0)
        };
        let background = background_of(self.dom.document_element())
            .or_else(|| background_of(self.dom.body()))
            .unwrap_or(ColorRGBA::TRANSPARENT);
        if current.background_color == background {
            return;
        }
        let mut style = (*current).clone();
        style.background_color = background;
        self.layout_tree.set_view_style(Arc::new(style));
    }
}
