//! Layout object arena, dirtiness propagation and change bookkeeping.

use core::mem;
use crate::geometry::IntSize;
use crate::object::{LayoutId, LayoutObject, LayoutObjectKind, VisualRect};
use html::NodeId;
use indextree::{Arena, Node};
use lifecycle::DocumentLifecycle;
use log::{error, trace};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use style_engine::{ComputedStyle, Display, Position, StyleDifference};

/// Where the next layout has to start, reported when dirtiness reaches a
/// relayout boundary or the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayoutRequest {
    Full,
    Subtree(LayoutId),
}

/// Structural changes since the last [`LayoutTree::take_changes`], consumed by
/// the frame view to keep its registries in sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LayoutTreeChanges {
    pub constrained_added: Vec<LayoutId>,
    pub constrained_removed: Vec<LayoutId>,
    pub widgets_added: Vec<(LayoutId, NodeId)>,
    pub widgets_removed: Vec<(LayoutId, NodeId)>,
    pub destroyed: Vec<LayoutId>,
    /// A change that cannot be tracked per object, such as a new view style.
    pub full_paint_invalidation: bool,
}

impl LayoutTreeChanges {
    pub fn is_empty(&self) -> bool {
        self.constrained_added.is_empty()
            && self.constrained_removed.is_empty()
            && self.widgets_added.is_empty()
            && self.widgets_removed.is_empty()
            && self.destroyed.is_empty()
            && !self.full_paint_invalidation
    }
}

/// The rendering tree: one object per laid-out node plus anonymous boxes,
/// rooted at the view.
pub struct LayoutTree {
    pub(crate) arena: Arena<LayoutObject>,
    pub(crate) view: LayoutId,
    pub(crate) node_to_object: HashMap<NodeId, LayoutId>,
    pub(crate) lifecycle: Rc<DocumentLifecycle>,
    pub(crate) view_size: IntSize,
    /// Glyph advance as a fraction of the font size.
    pub(crate) glyph_advance_ratio: f32,
    /// Last painted rects of destroyed objects, invalidated on the next pass.
    pub(crate) removed_visual_rects: Vec<(LayoutId, VisualRect)>,
    changes: LayoutTreeChanges,
    relayout_requests: Vec<RelayoutRequest>,
}

impl LayoutTree {
    pub fn new(lifecycle: Rc<DocumentLifecycle>) -> Self {
        let mut arena = Arena::new();
        let view_style = ComputedStyle {
            display: Display::Block,
            ..ComputedStyle::default()
        };
        let view = LayoutId(arena.new_node(LayoutObject::new(
            LayoutObjectKind::View,
            None,
            Arc::new(view_style),
        )));
        Self {
            arena,
            view,
            node_to_object: HashMap::new(),
            lifecycle,
            view_size: IntSize::ZERO,
            glyph_advance_ratio: 0.5,
            removed_visual_rects: Vec::new(),
            changes: LayoutTreeChanges::default(),
            relayout_requests: Vec::new(),
        }
    }

    #[inline]
    pub const fn view(&self) -> LayoutId {
        self.view
    }

    pub fn lifecycle(&self) -> &Rc<DocumentLifecycle> {
        &self.lifecycle
    }

    pub fn object(&self, id: LayoutId) -> Option<&LayoutObject> {
        self.arena
            .get(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get)
    }

    pub(crate) fn object_mut(&mut self, id: LayoutId) -> Option<&mut LayoutObject> {
        self.arena
            .get_mut(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get_mut)
    }

    pub fn contains(&self, id: LayoutId) -> bool {
        self.object(id).is_some()
    }

    /// Number of live layout objects, the view included.
    pub fn len(&self) -> usize {
        self.arena.count() - self.arena.iter().filter(|node| node.is_removed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn object_for_node(&self, node: NodeId) -> Option<LayoutId> {
        self.node_to_object.get(&node).copied()
    }

    pub fn parent(&self, id: LayoutId) -> Option<LayoutId> {
        self.arena.get(id.0)?.parent().map(LayoutId)
    }

    pub fn children(&self, id: LayoutId) -> impl Iterator<Item = LayoutId> + '_ {
        id.0.children(&self.arena).map(LayoutId)
    }

    /// Pre-order traversal including `id` itself.
    pub fn descendants(&self, id: LayoutId) -> impl Iterator<Item = LayoutId> + '_ {
        id.0.descendants(&self.arena).map(LayoutId)
    }

    /// Whether the object is still linked below the view.
    pub fn is_attached(&self, id: LayoutId) -> bool {
        self.contains(id) && id.0.ancestors(&self.arena).any(|ancestor| ancestor == self.view.0)
    }

    pub const fn view_size(&self) -> IntSize {
        self.view_size
    }

    /// Resize the layout viewport; a change dirties the whole tree.
    pub fn set_view_size(&mut self, size: IntSize) {
        if self.view_size == size {
            return;
        }
        self.view_size = size;
        let view = self.view;
        self.set_needs_layout(view);
    }

    pub const fn glyph_advance_ratio(&self) -> f32 {
        self.glyph_advance_ratio
    }

    pub fn set_glyph_advance_ratio(&mut self, ratio: f32) {
        if (self.glyph_advance_ratio - ratio).abs() <= f32::EPSILON {
            return;
        }
        self.glyph_advance_ratio = ratio;
        let view = self.view;
        self.mark_subtree_for_layout(view);
    }

    /// Containing block per CSS 2: the view for fixed boxes, the nearest
    /// positioned block for absolute boxes, otherwise the nearest block container.
    pub fn containing_block(&self, id: LayoutId) -> Option<LayoutId> {
        let object = self.object(id)?;
        if object.is_view() {
            return None;
        }
        let position = if object.is_text() {
            Position::Static
        } else {
            object.style.position
        };
        let mut ancestors = id.0.ancestors(&self.arena).skip(1).map(LayoutId);
        let found = match position {
            Position::Fixed => Some(self.view),
            Position::Absolute => ancestors.find(|ancestor| {
                self.object(*ancestor).is_some_and(|candidate| {
                    candidate.is_view()
                        || (candidate.is_block_container()
                            && candidate.style.position != Position::Static)
                })
            }),
            Position::Static | Position::Relative | Position::Sticky => ancestors.find(|ancestor| {
                self.object(*ancestor)
                    .is_some_and(LayoutObject::is_block_container)
            }),
        };
        found.or(Some(self.view))
    }

    /// Whether anything in the tree is waiting for layout.
    pub fn needs_layout(&self) -> bool {
        self.object(self.view)
            .is_some_and(LayoutObject::needs_layout)
    }

    /// Mark `id` for layout and walk its container chain, reporting where
    /// the next layout must start.
    pub fn set_needs_layout(&mut self, id: LayoutId) {
        let allowed = self.lifecycle.state_allows_layout_invalidation();
        debug_assert!(
            allowed,
            "layout invalidation in {:?}",
            self.lifecycle.state()
        );
        if !allowed {
            error!(
                "layout invalidation refused in {:?}",
                self.lifecycle.state()
            );
            return;
        }
        if let Some(request) = self.mark_for_layout(id) {
            trace!("relayout requested: {request:?}");
            self.relayout_requests.push(request);
        }
    }

    /// Dirty `id` without the lifecycle check; used from inside layout.
    pub(crate) fn mark_for_layout(&mut self, id: LayoutId) -> Option<RelayoutRequest> {
        let object = self.object_mut(id)?;
        if object.self_needs_layout {
            return None;
        }
        object.self_needs_layout = true;
        self.mark_container_chain_for_layout(id)
    }

    /// Set `child_needs_layout` up the container chain until an object that
    /// already carries it, stopping at relayout boundaries.
    fn mark_container_chain_for_layout(&mut self, id: LayoutId) -> Option<RelayoutRequest> {
        let mut last = id;
        let mut current = self.container(id);
        while let Some(container) = current {
            let object = self.object_mut(container)?;
            if object.self_needs_layout || object.child_needs_layout {
                object.child_needs_layout = true;
                return None;
            }
            object.child_needs_layout = true;
            last = container;
            if object.is_relayout_boundary() {
                break;
            }
            current = self.container(container);
        }
        if last == self.view {
            Some(RelayoutRequest::Full)
        } else if self.object(last).is_some_and(LayoutObject::is_relayout_boundary) {
            Some(RelayoutRequest::Subtree(last))
        } else {
            // Walked off a detached fragment; whoever attaches it relayouts it.
            None
        }
    }

    /// Flag the container chain of `id` with `child_needs_layout` without
    /// reporting a relayout request. Relayout boundaries do not stop the walk;
    /// `new_root`, when given, does.
    pub fn mark_containing_blocks_for_layout(&mut self, id: LayoutId, new_root: Option<LayoutId>) {
        let mut current = self.container(id);
        while let Some(container) = current {
            let Some(object) = self.object_mut(container) else {
                return;
            };
            if object.self_needs_layout || object.child_needs_layout {
                object.child_needs_layout = true;
                return;
            }
            object.child_needs_layout = true;
            if Some(container) == new_root {
                return;
            }
            current = self.container(container);
        }
    }

    /// Whether `ancestor` is `descendant` or on its container chain.
    pub fn is_container_ancestor(&self, ancestor: LayoutId, descendant: LayoutId) -> bool {
        let mut current = Some(descendant);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.container(candidate);
        }
        false
    }

    /// The object responsible for laying out `id`: the containing block for
    /// out-of-flow boxes, otherwise the parent.
    pub(crate) fn container(&self, id: LayoutId) -> Option<LayoutId> {
        let object = self.object(id)?;
        if object.is_out_of_flow_positioned() {
            self.containing_block(id)
        } else {
            self.parent(id)
        }
    }

    /// Dirty every object in the subtree, e.g. after a text measurement change.
    pub(crate) fn mark_subtree_for_layout(&mut self, root: LayoutId) {
        let ids: Vec<LayoutId> = self.descendants(root).collect();
        for id in ids {
            if let Some(object) = self.object_mut(id) {
                object.self_needs_layout = true;
            }
        }
        if let Some(request) = self.mark_container_chain_for_layout(root) {
            self.relayout_requests.push(request);
        }
    }

    /// Replace the style of `id`, invalidating per the style difference.
    pub fn set_style(&mut self, id: LayoutId, style: Arc<ComputedStyle>) -> StyleDifference {
        let Some(object) = self.object(id) else {
            return StyleDifference::Equal;
        };
        let difference = StyleDifference::compute(Some(&object.style), &style);
        let was_constrained = object.style.is_viewport_constrained() && !object.is_text();
        let is_constrained = style.is_viewport_constrained() && !object.is_text();
        let text_children: Vec<LayoutId> = self
            .children(id)
            .filter(|child| self.object(*child).is_some_and(LayoutObject::is_text))
            .collect();
        // Text has no style of its own and follows its parent.
        for child in text_children {
            if let Some(text) = self.object_mut(child) {
                text.style = Arc::clone(&style);
            }
        }
        if let Some(object) = self.object_mut(id) {
            object.style = style;
        }
        if was_constrained != is_constrained {
            if is_constrained {
                self.changes.constrained_added.push(id);
            } else {
                self.changes.constrained_removed.push(id);
            }
        }
        if difference.needs_layout() {
            self.set_needs_layout(id);
        }
        if difference != StyleDifference::Equal {
            self.set_should_invalidate_paint(id);
        }
        difference
    }

    /// Replace the style of the view, used for the viewport background.
    pub fn set_view_style(&mut self, style: Arc<ComputedStyle>) {
        let view = self.view;
        if let Some(object) = self.object_mut(view) {
            if *object.style == *style {
                return;
            }
            object.style = style;
        }
        self.changes.full_paint_invalidation = true;
    }

    pub fn set_should_invalidate_paint(&mut self, id: LayoutId) {
        if let Some(object) = self.object_mut(id) {
            object.should_invalidate_paint = true;
        }
    }

    pub(crate) fn changes_mut(&mut self) -> &mut LayoutTreeChanges {
        &mut self.changes
    }

    pub fn take_changes(&mut self) -> LayoutTreeChanges {
        mem::take(&mut self.changes)
    }

    pub fn take_relayout_requests(&mut self) -> Vec<RelayoutRequest> {
        mem::take(&mut self.relayout_requests)
    }

    pub fn has_relayout_requests(&self) -> bool {
        !self.relayout_requests.is_empty()
    }

    /// Viewport-constrained objects currently in the tree.
    pub fn viewport_constrained_objects(&self) -> Vec<LayoutId> {
        self.descendants(self.view)
            .filter(|id| {
                self.object(*id).is_some_and(|object| {
                    !object.is_text() && object.style.is_viewport_constrained()
                })
            })
            .collect()
    }

    /// Debug check that layout left nothing dirty below `root`.
    pub fn assert_subtree_is_laid_out(&self, root: LayoutId) {
        if !cfg!(debug_assertions) {
            return;
        }
        for id in self.descendants(root) {
            let dirty = self.object(id).is_some_and(LayoutObject::needs_layout);
            debug_assert!(!dirty, "{id:?} still needs layout after layout");
        }
    }

    /// Whether anything below the view paints: visible text, replaced
    /// content, or a sized box with a background.
    pub fn has_visible_content(&self) -> bool {
        self.descendants(self.view)
            .filter(|id| *id != self.view)
            .filter_map(|id| self.object(id))
            .filter(|object| object.style.is_visible())
            .any(|object| match &object.kind {
                LayoutObjectKind::Text { text } => !text.trim().is_empty(),
                LayoutObjectKind::Replaced { .. } => true,
                LayoutObjectKind::View
                | LayoutObjectKind::Block
                | LayoutObjectKind::Inline
                | LayoutObjectKind::AnonymousBlock => {
                    object.style.background_color.alpha > 0 && !object.size.is_empty()
                }
            })
    }

    /// Whether `id` or any of its ancestors carries a filter.
    pub fn has_filter_in_ancestry(&self, id: LayoutId) -> bool {
        id.0.ancestors(&self.arena)
            .filter_map(|ancestor| self.object(LayoutId(ancestor)))
            .any(|object| object.style.has_filter)
    }
}
