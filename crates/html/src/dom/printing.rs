use core::fmt;

use super::{DOM, NodeKind};
use indextree::NodeId;

use serde_json::{Map, Value, json};

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn sorted_attrs(dom: &DOM, id: NodeId) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = dom
        .node(id)
        .map(|node| node.attrs().to_vec())
        .unwrap_or_default();
    pairs.sort_by(|left, right| left.0.cmp(&right.0));
    pairs
}

fn node_to_json(dom: &DOM, id: NodeId) -> Value {
    let Some(kind) = dom.kind(id) else {
        return Value::Null;
    };
    let children = || -> Vec<Value> {
        dom.children(id)
            .map(|child| node_to_json(dom, child))
            .filter(|value| !value.is_null())
            .collect()
    };
    match kind {
        NodeKind::Document => json!({ "type": "document", "children": children() }),
        NodeKind::Element { tag } => {
            let mut attrs_obj = Map::new();
            for (key, value) in sorted_attrs(dom, id) {
                attrs_obj.insert(key, Value::String(value));
            }
            json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": children(),
            })
        }
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                json!({ "type": "text", "text": text })
            }
        }
        NodeKind::Comment { .. } => Value::Null,
    }
}

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn fmt_node(
    dom: &DOM,
    id: NodeId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(kind) = dom.kind(id) else {
        return Ok(());
    };
    match kind {
        NodeKind::Document => {
            write_indent(formatter, depth)?;
            writeln!(formatter, "#document")?;
        }
        NodeKind::Element { tag } => {
            write_indent(formatter, depth)?;
            write!(formatter, "<{tag}")?;
            for (key, value) in sorted_attrs(dom, id) {
                write!(formatter, " {key}=\"{}\"", escape_text(&value))?;
            }
            // Dirty bits are part of the dump; they are what tests usually want to see.
            if dom.needs_style_recalc(id) {
                write!(formatter, " [{:?}]", dom.style_change_type(id))?;
            }
            if dom.child_needs_style_recalc(id) {
                formatter.write_str(" [child]")?;
            }
            writeln!(formatter, ">")?;
        }
        NodeKind::Text { text } => {
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            write_indent(formatter, depth)?;
            writeln!(formatter, "\"{}\"", escape_text(text))?;
        }
        NodeKind::Comment { text } => {
            write_indent(formatter, depth)?;
            writeln!(formatter, "<!--{}-->", escape_text(text))?;
        }
    }
    for child in dom.children(id) {
        fmt_node(dom, child, formatter, depth + 1)?;
    }
    Ok(())
}

impl fmt::Debug for DOM {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "DOM ({:?})", self.lifecycle.state())?;
        fmt_node(self, self.root, formatter, 0)
    }
}

impl DOM {
    /// Build a deterministic JSON representation of the connected tree.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "div", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    ///
    /// Comments and whitespace-only text are omitted.
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}
