use core::fmt;

use crate::object::{LayoutId, LayoutObject, LayoutObjectKind};
use crate::tree::LayoutTree;

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(character),
        }
    }
    out
}

fn write_label(formatter: &mut fmt::Formatter<'_>, object: &LayoutObject) -> fmt::Result {
    match &object.kind {
        LayoutObjectKind::View => formatter.write_str("View")?,
        LayoutObjectKind::Block => formatter.write_str("Block")?,
        LayoutObjectKind::Inline => formatter.write_str("Inline")?,
        LayoutObjectKind::AnonymousBlock => formatter.write_str("AnonymousBlock")?,
        LayoutObjectKind::Replaced { widget } => {
            formatter.write_str(if *widget { "Widget" } else { "Replaced" })?;
        }
        LayoutObjectKind::Text { text } => write!(formatter, "Text \"{}\"", escape_text(text))?,
    }
    let rect = object.frame_rect();
    write!(
        formatter,
        " ({},{} {}x{})",
        rect.x, rect.y, rect.width, rect.height
    )?;
    if object.self_needs_layout {
        formatter.write_str(" needs-layout")?;
    }
    if object.child_needs_layout {
        formatter.write_str(" child-needs-layout")?;
    }
    Ok(())
}

fn write_object(
    tree: &LayoutTree,
    id: LayoutId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(object) = tree.object(id) else {
        return Ok(());
    };
    write_indent(formatter, depth)?;
    write_label(formatter, object)?;
    writeln!(formatter)?;
    for child in tree.children(id) {
        write_object(tree, child, formatter, depth + 1)?;
    }
    Ok(())
}

/// Indented dump of the layout tree with frame rects and dirty bits.
impl fmt::Debug for LayoutTree {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "LAYOUT")?;
        write_object(self, self.view(), formatter, 0)
    }
}
