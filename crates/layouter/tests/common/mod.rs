use html::{DOM, DomError, NodeId};
use layouter::{IntSize, LayoutId, LayoutObject, LayoutOutcome, LayoutTree, TextAutosizer};
use lifecycle::{DocumentLifecycle, LifecycleState};
use std::rc::Rc;
use style_engine::{StyleContext, StyleEngine};

pub fn init_logging() {
    drop(env_logger::builder().is_test(true).try_init());
}

/// An active document with an 800x600 view and a `<body>` to build into.
pub struct Page {
    pub lifecycle: Rc<DocumentLifecycle>,
    pub dom: DOM,
    pub styles: StyleEngine,
    pub tree: LayoutTree,
    pub body: NodeId,
}

impl Page {
    pub fn new() -> Result<Self, DomError> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        assert!(lifecycle.advance_to(LifecycleState::StyleClean));
        let mut dom = DOM::new(Rc::clone(&lifecycle));
        let html = dom.create_element("html");
        let body = dom.create_element("body");
        dom.append_child(dom.root(), html)?;
        dom.append_child(html, body)?;
        let mut tree = LayoutTree::new(Rc::clone(&lifecycle));
        tree.set_view_size(IntSize::new(800, 600));
        Ok(Self {
            lifecycle,
            dom,
            styles: StyleEngine::default(),
            tree,
            body,
        })
    }

    pub fn element(&mut self, parent: NodeId, tag: &str, style: &str) -> Result<NodeId, DomError> {
        let node = self.dom.create_element(tag);
        if !style.is_empty() {
            self.dom.set_attribute(node, "style", style)?;
        }
        self.dom.append_child(parent, node)?;
        Ok(node)
    }

    pub fn text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let node = self.dom.create_text(text);
        self.dom.append_child(parent, node)?;
        Ok(node)
    }

    fn restyle(&mut self) {
        let context = StyleContext::default();
        let elements: Vec<NodeId> = self.dom.elements().collect();
        for node in elements {
            let parent_style = self
                .dom
                .parent(node)
                .and_then(|parent| self.styles.computed_style(parent));
            let has_object = self.tree.object_for_node(node).is_some();
            drop(self.styles.resolve_style_for_element(
                &self.dom,
                node,
                parent_style.as_deref(),
                has_object,
                &context,
            ));
        }
    }

    /// Style everything and build the layout tree from scratch.
    pub fn attach(&mut self) {
        self.restyle();
        assert!(self.lifecycle.advance_to(LifecycleState::InStyleRecalc));
        self.tree.attach_document(&self.dom, &self.styles);
        assert!(self.lifecycle.advance_to(LifecycleState::StyleClean));
    }

    /// Restyle and reconcile the layout children of `parent`.
    pub fn rebuild(&mut self, parent: NodeId) {
        self.restyle();
        assert!(self.lifecycle.advance_to(LifecycleState::InStyleRecalc));
        assert!(self.tree.rebuild_children(&self.dom, parent, &self.styles));
        assert!(self.lifecycle.advance_to(LifecycleState::StyleClean));
    }

    pub fn layout_from(&mut self, root: LayoutId, autosizer: &TextAutosizer) -> LayoutOutcome {
        assert!(self.lifecycle.advance_to(LifecycleState::InPerformLayout));
        let outcome = self.tree.layout_subtree(root, autosizer);
        assert!(self.lifecycle.advance_to(LifecycleState::AfterPerformLayout));
        assert!(self.lifecycle.advance_to(LifecycleState::LayoutClean));
        outcome
    }

    pub fn layout(&mut self) -> LayoutOutcome {
        let view = self.tree.view();
        self.layout_from(view, &TextAutosizer::disabled())
    }

    pub fn id(&self, node: NodeId) -> Option<LayoutId> {
        self.tree.object_for_node(node)
    }

    pub fn object(&self, node: NodeId) -> Option<&LayoutObject> {
        self.id(node).and_then(|id| self.tree.object(id))
    }
}
