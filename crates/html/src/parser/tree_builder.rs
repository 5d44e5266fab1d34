use super::sink::ParseOp;
use crate::dom::{DOM, DomError, NodeKind, VOID_ELEMENTS};
use indextree::NodeId;

/// Applies [`ParseOp`]s to the tree with a stack of open elements.
///
/// Content that arrives with no open element is routed into an implied
/// `<html>`/`<body>` pair, so `write("<p>hi</p>")` into an empty document
/// yields a normal document shape.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    open_elements: Vec<NodeId>,
}

impl TreeBuilder {
    /// Apply `ops`, returning the script element closed by a trailing
    /// [`ParseOp::ScriptEnd`], if any.
    pub fn apply(&mut self, dom: &mut DOM, ops: Vec<ParseOp>) -> Result<Option<NodeId>, DomError> {
        let mut script = None;
        for op in ops {
            script = None;
            match op {
                ParseOp::StartElement {
                    tag,
                    attrs,
                    self_closing,
                } => self.start_element(dom, &tag, &attrs, self_closing)?,
                ParseOp::EndElement { tag } => {
                    self.end_element(dom, &tag);
                }
                ParseOp::Text(text) => self.text(dom, &text)?,
                ParseOp::Comment(text) => {
                    let parent = self.insertion_parent(dom, None)?;
                    let comment = dom.create_comment(&text);
                    dom.append_child(parent, comment)?;
                }
                ParseOp::ScriptEnd => script = self.end_element(dom, "script"),
            }
        }
        Ok(script)
    }

    fn start_element(
        &mut self,
        dom: &mut DOM,
        tag: &str,
        attrs: &[(String, String)],
        self_closing: bool,
    ) -> Result<(), DomError> {
        let parent = self.insertion_parent(dom, Some(tag))?;
        // Duplicate structural tags merge into the existing element.
        if matches!(tag, "html" | "body" | "head")
            && let Some(existing) = dom
                .element_children(parent)
                .find(|child| dom.tag(*child) == Some(tag))
        {
            self.open_elements.push(existing);
            return Ok(());
        }

        let element = dom.create_element(tag);
        for (name, value) in attrs {
            dom.set_attribute(element, name, value)?;
        }
        dom.append_child(parent, element)?;
        if !self_closing && !VOID_ELEMENTS.contains(&tag) {
            self.open_elements.push(element);
        }
        Ok(())
    }

    fn end_element(&mut self, dom: &DOM, tag: &str) -> Option<NodeId> {
        let index = self
            .open_elements
            .iter()
            .rposition(|open| dom.tag(*open) == Some(tag))?;
        let closed = self.open_elements.get(index).copied();
        self.open_elements.truncate(index);
        closed
    }

    fn text(&mut self, dom: &mut DOM, text: &str) -> Result<(), DomError> {
        if self.open_elements.is_empty() && text.trim().is_empty() {
            return Ok(());
        }
        let parent = self.insertion_parent(dom, None)?;
        let last_text = dom
            .children(parent)
            .last()
            .filter(|last| matches!(dom.kind(*last), Some(NodeKind::Text { .. })));
        if let Some(last) = last_text {
            return dom.append_text(last, text);
        }
        let node = dom.create_text(text);
        dom.append_child(parent, node)
    }

    /// The node new content is appended to, creating implied structure when
    /// nothing is open.
    fn insertion_parent(&mut self, dom: &mut DOM, tag: Option<&str>) -> Result<NodeId, DomError> {
        // Drop open elements that script removed from the tree.
        self.open_elements.retain(|open| dom.is_connected(*open));
        if let Some(top) = self.open_elements.last() {
            return Ok(*top);
        }
        if tag == Some("html") {
            return Ok(dom.root());
        }
        let html = match dom.document_element() {
            Some(html) => html,
            None => {
                let html = dom.create_element("html");
                dom.append_child(dom.root(), html)?;
                html
            }
        };
        if matches!(tag, Some("head" | "body")) {
            return Ok(html);
        }
        let body = match dom.body() {
            Some(body) => body,
            None => {
                let body = dom.create_element("body");
                dom.append_child(html, body)?;
                body
            }
        };
        self.open_elements.push(html);
        self.open_elements.push(body);
        Ok(body)
    }
}
