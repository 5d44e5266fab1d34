mod dirty;
mod error;
mod printing;
mod updating;

pub use dirty::StyleChangeType;
pub use error::DomError;
pub use updating::{DOMSubscriber, DOMUpdate};

use core::mem;
use indextree::{Arena, Node, NodeId};
use lifecycle::DocumentLifecycle;
use log::warn;
use smallvec::SmallVec;
use std::rc::Rc;

/// Elements that never have children; the parser does not push them onto its
/// open-element stack.
pub const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    kind: NodeKind,
    attrs: SmallVec<(String, String), 4>,
    style_change: StyleChangeType,
    child_needs_style_recalc: bool,
}

impl DOMNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[inline]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|name| name == class))
    }
}

/// The document's node tree.
///
/// Nodes removed from the tree are detached rather than freed, so a stale
/// [`NodeId`] held across a script callback resolves to a disconnected node
/// instead of a recycled slot.
pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
    lifecycle: Rc<DocumentLifecycle>,
    updates: Vec<DOMUpdate>,
}

impl DOM {
    pub fn new(lifecycle: Rc<DocumentLifecycle>) -> Self {
        let mut dom = Arena::new();
        Self {
            root: dom.new_node(DOMNode::default()),
            dom,
            lifecycle,
            updates: Vec::new(),
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn lifecycle(&self) -> &Rc<DocumentLifecycle> {
        &self.lifecycle
    }

    pub fn node(&self, id: NodeId) -> Option<&DOMNode> {
        self.dom
            .get(id)
            .filter(|node| !node.is_removed())
            .map(Node::get)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DOMNode> {
        self.dom
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(Node::get_mut)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(DOMNode::kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(DOMNode::tag)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text { .. }))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|node| node.attribute(name))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text { text } | NodeKind::Comment { text } => Some(text),
            NodeKind::Document | NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated text of the node's descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter(|node| self.is_text(*node))
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Parsed `tabindex` attribute.
    pub fn tab_index(&self, id: NodeId) -> Option<i32> {
        self.attribute(id, "tabindex")?.trim().parse().ok()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id)?.parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.dom)
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|child| self.is_element(*child))
    }

    /// Pre-order traversal including `id` itself.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.dom)
    }

    /// Ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.dom).skip(1)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some() && id.ancestors(&self.dom).any(|ancestor| ancestor == self.root)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        id.ancestors(&self.dom).any(|node| node == ancestor)
    }

    /// The root `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).next()
    }

    fn document_element_child(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|child| self.tag(*child) == Some(tag))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_element_child("body")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_element_child("head")
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|node| self.attribute(*node, "id") == Some(element_id))
    }

    /// Connected elements in tree order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root)
            .filter(|node| self.is_element(*node))
    }

    /// Create an unattached element; the tag is lowercased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom.new_node(DOMNode::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::new(NodeKind::Text {
            text: text.to_owned(),
        }))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.dom.new_node(DOMNode::new(NodeKind::Comment {
            text: text.to_owned(),
        }))
    }

    fn check_tree_mutation(&self) -> Result<(), DomError> {
        if self.lifecycle.state_allows_tree_mutations() {
            return Ok(());
        }
        warn!(
            "refusing tree mutation in lifecycle state {:?}",
            self.lifecycle.state()
        );
        Err(DomError::LifecycleForbidsMutation)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or last when `reference` is `None`.
    /// A child that already has a parent is moved.
    ///
    /// # Errors
    /// Fails if the lifecycle forbids tree mutations, if any node is missing,
    /// if `reference` is not a child of `parent`, or if the insertion would
    /// create a cycle.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_tree_mutation()?;
        match self.kind(parent) {
            Some(NodeKind::Document | NodeKind::Element { .. }) => {}
            Some(NodeKind::Text { .. } | NodeKind::Comment { .. }) => {
                return Err(DomError::HierarchyRequest);
            }
            None => return Err(DomError::NotFound(parent)),
        }
        match self.kind(child) {
            Some(NodeKind::Document) => return Err(DomError::WrongDocument),
            Some(_) => {}
            None => return Err(DomError::NotFound(child)),
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(DomError::NotFound(reference));
        }
        if reference == Some(child) {
            return Ok(());
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        let inserted = match reference {
            Some(reference) => reference.checked_insert_before(child, &mut self.dom),
            None => parent.checked_append(child, &mut self.dom),
        };
        inserted.map_err(|_| DomError::HierarchyRequest)?;

        if self.is_connected(child) {
            self.set_needs_style_recalc(child, StyleChangeType::NeedsReattach);
        }
        self.updates.push(DOMUpdate::InsertNode { parent, node: child });
        Ok(())
    }

    /// Detach `child` and its subtree from `parent`.
    ///
    /// # Errors
    /// Fails if the lifecycle forbids tree mutations or `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_tree_mutation()?;
        if self.node(child).is_none() || self.parent(child) != Some(parent) {
            return Err(DomError::NotFound(child));
        }
        let subtree: Vec<NodeId> = self.descendants(child).collect();
        child.detach(&mut self.dom);
        self.updates.push(DOMUpdate::RemoveNode {
            parent,
            node: child,
            subtree,
        });
        Ok(())
    }

    /// Remove every child of `parent`.
    ///
    /// # Errors
    /// Fails if the lifecycle forbids tree mutations.
    pub fn remove_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        let children: Vec<NodeId> = self.children(parent).collect();
        for child in children {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    /// Set or replace an attribute. Attribute changes are not structural and are
    /// allowed in any lifecycle state; style invalidation is left to subscribers.
    ///
    /// # Errors
    /// Fails if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let node = self
            .node_mut(id)
            .filter(|node| node.tag().is_some())
            .ok_or(DomError::NotFound(id))?;
        let old = match node.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => Some(mem::replace(existing, value.to_owned())),
            None => {
                node.attrs.push((name.clone(), value.to_owned()));
                None
            }
        };
        if old.as_deref() == Some(value) {
            return Ok(());
        }
        self.updates.push(DOMUpdate::SetAttr {
            node: id,
            name,
            old,
            value: Some(value.to_owned()),
        });
        Ok(())
    }

    /// # Errors
    /// Fails if `id` is not an element.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let node = self
            .node_mut(id)
            .filter(|node| node.tag().is_some())
            .ok_or(DomError::NotFound(id))?;
        let Some(index) = node.attrs.iter().position(|(key, _)| *key == name) else {
            return Ok(());
        };
        let (_, old) = node.attrs.remove(index);
        self.updates.push(DOMUpdate::SetAttr {
            node: id,
            name,
            old: Some(old),
            value: None,
        });
        Ok(())
    }

    /// Replace the data of a text or comment node.
    ///
    /// # Errors
    /// Fails if `id` is not a character data node.
    pub fn set_text(&mut self, id: NodeId, data: &str) -> Result<(), DomError> {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text { text } | NodeKind::Comment { text }) => {
                data.clone_into(text);
            }
            _ => return Err(DomError::NotFound(id)),
        }
        self.updates.push(DOMUpdate::SetText { node: id });
        Ok(())
    }

    /// Append to the data of a text node; used by the parser to coalesce runs.
    pub(crate) fn append_text(&mut self, id: NodeId, data: &str) -> Result<(), DomError> {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text { text }) => text.push_str(data),
            _ => return Err(DomError::NotFound(id)),
        }
        self.updates.push(DOMUpdate::SetText { node: id });
        Ok(())
    }

    pub(crate) fn push_update(&mut self, update: DOMUpdate) {
        self.updates.push(update);
    }

    /// Drain the updates recorded since the last call.
    pub fn take_updates(&mut self) -> Vec<DOMUpdate> {
        mem::take(&mut self.updates)
    }

    #[inline]
    pub fn has_pending_updates(&self) -> bool {
        !self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle::LifecycleState;

    fn new_dom() -> DOM {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        assert!(lifecycle.advance_to(LifecycleState::StyleClean));
        DOM::new(lifecycle)
    }

    /// Builds `<html><body><div id=a></div></body></html>` and checks the accessors.
    ///
    /// # Panics
    /// Panics if the tree accessors disagree with the built structure.
    #[test]
    fn structure_accessors() -> Result<(), DomError> {
        let mut dom = new_dom();
        let html = dom.create_element("HTML");
        let body = dom.create_element("body");
        let div = dom.create_element("div");
        dom.append_child(dom.root(), html)?;
        dom.append_child(html, body)?;
        dom.append_child(body, div)?;
        dom.set_attribute(div, "id", "a")?;

        assert_eq!(dom.document_element(), Some(html));
        assert_eq!(dom.tag(html), Some("html"));
        assert_eq!(dom.body(), Some(body));
        assert_eq!(dom.head(), None);
        assert_eq!(dom.get_element_by_id("a"), Some(div));
        assert!(dom.is_connected(div));
        Ok(())
    }

    /// Inserting an ancestor under its descendant is rejected.
    ///
    /// # Panics
    /// Panics if a cycle is created.
    #[test]
    fn cycle_is_hierarchy_error() -> Result<(), DomError> {
        let mut dom = new_dom();
        let outer = dom.create_element("div");
        let inner = dom.create_element("span");
        dom.append_child(dom.root(), outer)?;
        dom.append_child(outer, inner)?;
        assert_eq!(
            dom.append_child(inner, outer),
            Err(DomError::HierarchyRequest)
        );
        assert_eq!(dom.append_child(outer, outer), Err(DomError::HierarchyRequest));
        Ok(())
    }

    /// Removal records the whole subtree and leaves the ids resolvable but disconnected.
    ///
    /// # Panics
    /// Panics if the removal record or connectivity is wrong.
    #[test]
    fn removal_records_subtree() -> Result<(), DomError> {
        let mut dom = new_dom();
        let outer = dom.create_element("div");
        let inner = dom.create_element("span");
        let text = dom.create_text("hi");
        dom.append_child(dom.root(), outer)?;
        dom.append_child(outer, inner)?;
        dom.append_child(inner, text)?;
        drop(dom.take_updates());

        dom.remove_child(dom.root(), outer)?;
        assert_eq!(
            dom.take_updates(),
            vec![DOMUpdate::RemoveNode {
                parent: dom.root(),
                node: outer,
                subtree: vec![outer, inner, text],
            }]
        );
        assert!(!dom.is_connected(inner));
        assert_eq!(dom.text(text), Some("hi"));
        Ok(())
    }

    /// Structural mutations are refused while style recalc is running.
    ///
    /// # Panics
    /// Panics if the mutation is not refused.
    #[test]
    fn mutation_refused_in_style_recalc() {
        let mut dom = new_dom();
        let div = dom.create_element("div");
        assert!(dom.lifecycle().advance_to(LifecycleState::InStyleRecalc));
        assert_eq!(
            dom.append_child(dom.root(), div),
            Err(DomError::LifecycleForbidsMutation)
        );
        assert_eq!(dom.children(dom.root()).count(), 0);
    }

    /// Attribute writes record old and new values and skip no-op writes.
    ///
    /// # Panics
    /// Panics if the attribute records are wrong.
    #[test]
    fn attribute_updates() -> Result<(), DomError> {
        let mut dom = new_dom();
        let div = dom.create_element("div");
        dom.set_attribute(div, "class", "a b")?;
        dom.set_attribute(div, "class", "a b")?;
        dom.set_attribute(div, "CLASS", "c")?;
        dom.remove_attribute(div, "class")?;
        let updates = dom.take_updates();
        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates[1],
            DOMUpdate::SetAttr {
                node: div,
                name: "class".to_owned(),
                old: Some("a b".to_owned()),
                value: Some("c".to_owned()),
            }
        );
        assert_eq!(dom.attribute(div, "class"), None);
        Ok(())
    }
}
