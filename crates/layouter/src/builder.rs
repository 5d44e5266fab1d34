//! Reconciles the layout tree with the DOM after style recalc.
//!
//! The document hands over the DOM parent whose children changed; the
//! builder reuses layout objects whose kind still fits, creates new ones
//! (and their subtrees) for the rest, destroys leftovers and wraps inline
//! runs in anonymous blocks where a block container mixes both levels.

use core::mem;
use crate::object::{LayoutId, LayoutObject, LayoutObjectKind, VisualRect};
use crate::tree::LayoutTree;
use html::{DOM, NodeId, NodeKind};
use log::{debug, error, trace};
use std::sync::Arc;
use style_engine::{ComputedStyle, Display, StyleEngine};

/// Source of computed styles for elements being attached.
pub trait StyleSource {
    fn style_for(&self, node: NodeId) -> Option<Arc<ComputedStyle>>;
}

impl StyleSource for StyleEngine {
    fn style_for(&self, node: NodeId) -> Option<Arc<ComputedStyle>> {
        self.computed_style(node)
    }
}

/// Elements replaced by an embedded widget (frames and plugins).
const WIDGET_TAGS: [&str; 3] = ["iframe", "embed", "object"];
/// Elements replaced by intrinsic content that is painted in place.
const REPLACED_TAGS: [&str; 3] = ["img", "video", "canvas"];

fn desired_object(
    dom: &DOM,
    node: NodeId,
    styles: &dyn StyleSource,
    parent_style: &Arc<ComputedStyle>,
) -> Option<(LayoutObjectKind, Arc<ComputedStyle>)> {
    match dom.kind(node)? {
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                return None;
            }
            Some((
                LayoutObjectKind::Text { text: text.clone() },
                Arc::clone(parent_style),
            ))
        }
        NodeKind::Element { tag } => {
            let style = styles.style_for(node)?;
            if style.display == Display::None {
                return None;
            }
            let kind = if WIDGET_TAGS.contains(&tag.as_str()) {
                LayoutObjectKind::Replaced { widget: true }
            } else if REPLACED_TAGS.contains(&tag.as_str()) {
                LayoutObjectKind::Replaced { widget: false }
            } else if style.display == Display::Inline && !style.position.is_out_of_flow() {
                LayoutObjectKind::Inline
            } else {
                LayoutObjectKind::Block
            };
            Some((kind, style))
        }
        NodeKind::Document | NodeKind::Comment { .. } => None,
    }
}

fn same_variant(existing: &LayoutObjectKind, desired: &LayoutObjectKind) -> bool {
    mem::discriminant(existing) == mem::discriminant(desired)
        && match (existing, desired) {
            (
                LayoutObjectKind::Replaced { widget: old },
                LayoutObjectKind::Replaced { widget: new },
            ) => old == new,
            _ => true,
        }
}

impl LayoutTree {
    fn check_layout_tree_mutation(&self) -> bool {
        let allowed = self.lifecycle.state_allows_layout_tree_mutations();
        debug_assert!(
            allowed,
            "layout tree mutation in {:?}",
            self.lifecycle.state()
        );
        if !allowed {
            error!(
                "layout tree mutation refused in {:?}",
                self.lifecycle.state()
            );
        }
        allowed
    }

    /// Build layout objects for the whole document below the view.
    pub fn attach_document(&mut self, dom: &DOM, styles: &dyn StyleSource) {
        self.rebuild_children(dom, dom.root(), styles);
    }

    /// Bring the layout children of `parent`'s object in line with its DOM
    /// children. Returns `false` when `parent` has no layout object.
    pub fn rebuild_children(&mut self, dom: &DOM, parent: NodeId, styles: &dyn StyleSource) -> bool {
        if !self.check_layout_tree_mutation() {
            return false;
        }
        let container = if parent == dom.root() {
            Some(self.view)
        } else {
            self.object_for_node(parent)
        };
        let Some(container) = container else {
            return false;
        };
        let Some(parent_style) = self.object(container).map(|object| Arc::clone(&object.style))
        else {
            return false;
        };

        let previous = self.flattened_children(container);
        let mut kept = Vec::new();
        let mut fresh = Vec::new();
        for child in dom.children(parent) {
            let Some((kind, style)) = desired_object(dom, child, styles, &parent_style) else {
                continue;
            };
            let existing = self.object_for_node(child);
            let reusable = existing.filter(|id| {
                previous.contains(id)
                    && self
                        .object(*id)
                        .is_some_and(|object| same_variant(&object.kind, &kind))
            });
            if let Some(id) = reusable {
                self.refresh_text(id, kind);
                kept.push(id);
                continue;
            }
            if let Some(stale) = existing.filter(|id| !previous.contains(id)) {
                self.destroy_subtree(stale);
            }
            let id = self.create_object(child, kind, style);
            kept.push(id);
            fresh.push((child, id));
        }

        for id in previous {
            if !kept.contains(&id) {
                self.destroy_subtree(id);
            }
        }
        self.relink(container, &kept);
        for (node, id) in fresh {
            let has_children = self.object(id).is_some_and(|object| {
                object.is_block_container() || object.kind == LayoutObjectKind::Inline
            });
            if has_children {
                self.rebuild_children(dom, node, styles);
            }
        }
        trace!("rebuilt layout children of {parent:?}: {} objects", kept.len());
        self.set_needs_layout(container);
        true
    }

    /// Destroy the layout subtree of a node leaving the document.
    pub fn detach_node(&mut self, node: NodeId) {
        if !self.check_layout_tree_mutation() {
            return;
        }
        let Some(id) = self.object_for_node(node) else {
            return;
        };
        let container = self.container(id);
        self.destroy_subtree(id);
        if let Some(container) = container {
            self.set_needs_layout(container);
        }
    }

    /// Destroy everything below the view, used when the document detaches.
    pub fn detach_all(&mut self) {
        if !self.check_layout_tree_mutation() {
            return;
        }
        let children: Vec<LayoutId> = self.children(self.view).collect();
        for child in children {
            self.destroy_subtree(child);
        }
        debug!("layout tree cleared");
    }

    fn create_object(
        &mut self,
        node: NodeId,
        kind: LayoutObjectKind,
        style: Arc<ComputedStyle>,
    ) -> LayoutId {
        let widget = matches!(kind, LayoutObjectKind::Replaced { widget: true });
        let constrained =
            !matches!(kind, LayoutObjectKind::Text { .. }) && style.is_viewport_constrained();
        let id = LayoutId(self.arena.new_node(LayoutObject::new(kind, Some(node), style)));
        self.node_to_object.insert(node, id);
        let changes = self.changes_mut();
        if widget {
            changes.widgets_added.push((id, node));
        }
        if constrained {
            changes.constrained_added.push(id);
        }
        id
    }

    fn refresh_text(&mut self, id: LayoutId, desired: LayoutObjectKind) {
        let changed = self
            .object(id)
            .is_some_and(|object| object.is_text() && object.kind != desired);
        if !changed {
            return;
        }
        if let Some(object) = self.object_mut(id) {
            object.kind = desired;
            object.should_invalidate_paint = true;
        }
        self.set_needs_layout(id);
    }

    /// Layout children of `container`, looking through anonymous wrappers.
    fn flattened_children(&self, container: LayoutId) -> Vec<LayoutId> {
        let mut flattened = Vec::new();
        for child in self.children(container) {
            if self.object(child).is_some_and(LayoutObject::is_anonymous) {
                flattened.extend(self.children(child));
            } else {
                flattened.push(child);
            }
        }
        flattened
    }

    fn destroy_subtree(&mut self, root: LayoutId) {
        let ids: Vec<LayoutId> = self.descendants(root).collect();
        for id in &ids {
            let Some(object) = self.object(*id) else {
                continue;
            };
            let node = object.node;
            let widget = object.is_widget();
            let constrained = !object.is_text() && object.style.is_viewport_constrained();
            let previous_rect: Option<VisualRect> = object.previous_visual_rect;
            if let Some(node) = node
                && self.node_to_object.get(&node) == Some(id)
            {
                self.node_to_object.remove(&node);
            }
            if let Some(rect) = previous_rect {
                self.removed_visual_rects.push((*id, rect));
            }
            let changes = self.changes_mut();
            if let Some(node) = node.filter(|_| widget) {
                changes.widgets_removed.push((*id, node));
            }
            if constrained {
                changes.constrained_removed.push(*id);
            }
            changes.destroyed.push(*id);
        }
        root.0.remove_subtree(&mut self.arena);
    }

    fn relink(&mut self, container: LayoutId, children: &[LayoutId]) {
        let current: Vec<LayoutId> = self.children(container).collect();
        for child in current {
            if self.object(child).is_some_and(LayoutObject::is_anonymous) {
                let wrapped: Vec<LayoutId> = self.children(child).collect();
                for inner in wrapped {
                    inner.0.detach(&mut self.arena);
                }
                self.changes_mut().destroyed.push(child);
                child.0.remove_subtree(&mut self.arena);
            } else {
                child.0.detach(&mut self.arena);
            }
        }

        let is_block_container = self
            .object(container)
            .is_some_and(LayoutObject::is_block_container);
        let has_inline = children
            .iter()
            .any(|child| self.object(*child).is_some_and(LayoutObject::is_inline_level));
        let has_block = children.iter().any(|child| {
            self.object(*child).is_some_and(|object| {
                !object.is_inline_level() && !object.is_out_of_flow_positioned()
            })
        });
        let wrap_inlines = is_block_container && has_inline && has_block;

        let mut run = Vec::new();
        for child in children {
            let inline = self
                .object(*child)
                .is_some_and(LayoutObject::is_inline_level);
            if wrap_inlines && inline {
                run.push(*child);
                continue;
            }
            self.wrap_inline_run(container, &mut run);
            self.append(container, *child);
        }
        self.wrap_inline_run(container, &mut run);
    }

    fn wrap_inline_run(&mut self, container: LayoutId, run: &mut Vec<LayoutId>) {
        if run.is_empty() {
            return;
        }
        let Some(container_style) = self.object(container).map(|object| Arc::clone(&object.style))
        else {
            return;
        };
        let style = ComputedStyle {
            display: Display::Block,
            ..ComputedStyle::inherit_from(&container_style)
        };
        let anonymous = LayoutId(self.arena.new_node(LayoutObject::new(
            LayoutObjectKind::AnonymousBlock,
            None,
            Arc::new(style),
        )));
        self.append(container, anonymous);
        for child in run.drain(..) {
            self.append(anonymous, child);
        }
    }

    fn append(&mut self, parent: LayoutId, child: LayoutId) {
        if let Err(err) = parent.0.checked_append(child.0, &mut self.arena) {
            error!("cannot append layout object {child:?} to {parent:?}: {err}");
        }
    }
}
