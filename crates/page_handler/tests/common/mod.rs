use html::{DomError, NodeId};
use layouter::{IntSize, LayoutRect};
use page_handler::testing::Recorders;
use page_handler::{Document, FrameConfig};

pub fn init_logging() {
    drop(env_logger::builder().is_test(true).try_init());
}

/// An attached document with `<html><body>` and recorders for its clients.
pub struct Page {
    pub doc: Document,
    pub recorders: Recorders,
    pub html: NodeId,
    pub body: NodeId,
}

impl Page {
    /// An 800x600 frame with overlay scrollbars, so the layout size never
    /// depends on scrollbar existence.
    pub fn new() -> Result<Self, DomError> {
        Self::with_config(FrameConfig::new(IntSize::new(800, 600), true))
    }

    pub fn with_config(config: FrameConfig) -> Result<Self, DomError> {
        let recorders = Recorders::default();
        let mut doc = Document::new(config, recorders.clients());
        let root = doc.dom().root();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(root, html)?;
        doc.append_child(html, body)?;
        doc.attach();
        Ok(Self {
            doc,
            recorders,
            html,
            body,
        })
    }

    /// Append a `tag` element with an inline `style` to `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, style: &str) -> Result<NodeId, DomError> {
        let node = self.doc.create_element(tag);
        if !style.is_empty() {
            self.doc.set_attribute(node, "style", style)?;
        }
        self.doc.append_child(parent, node)?;
        Ok(node)
    }

    /// Style, lay out and invalidate, then forget what the recorders saw.
    pub fn settle(&mut self) {
        self.doc.update_lifecycle_to_paint_invalidation_clean();
        self.recorders.host.take_calls();
        self.recorders.ax_cache.take_events();
        self.recorders.embedder.take_events();
    }

    pub fn rect_of(&self, node: NodeId) -> Option<LayoutRect> {
        let tree = self.doc.layout_tree();
        let scroll = self
            .doc
            .frame_view()
            .map_or(IntSize::ZERO, |view| view.scroll_offset());
        tree.object_for_node(node)
            .map(|object| tree.absolute_rect(object, scroll))
    }
}
