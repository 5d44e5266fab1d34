//! Greedy line layout for inline formatting contexts.

use crate::geometry::{IntPoint, IntSize, LayoutRect, snap};
use crate::object::{LayoutId, LayoutObjectKind, WidthConstraint};
use crate::tree::LayoutTree;
use std::sync::Arc;

/// Running state of the line boxes of one block container.
struct LineBuilder {
    origin: IntPoint,
    width: i32,
    cursor: i32,
    line_top: i32,
    line_height: i32,
    has_content: bool,
}

impl LineBuilder {
    const fn new(origin: IntPoint, width: i32) -> Self {
        Self {
            origin,
            width,
            cursor: 0,
            line_top: 0,
            line_height: 0,
            has_content: false,
        }
    }

    const fn at_line_start(&self) -> bool {
        !self.has_content
    }

    /// Whether a fragment of `width` after `leading` space still fits.
    const fn fits(&self, leading: i32, width: i32) -> bool {
        self.at_line_start() || self.cursor + leading + width <= self.width
    }

    fn place(&mut self, leading: i32, width: i32, height: i32) -> LayoutRect {
        let rect = LayoutRect::new(
            self.origin.x + self.cursor + leading,
            self.origin.y + self.line_top,
            width,
            height,
        );
        self.cursor += leading + width;
        self.line_height = self.line_height.max(height);
        self.has_content = true;
        rect
    }

    fn break_line(&mut self) {
        if self.has_content {
            self.line_top += self.line_height;
        }
        self.cursor = 0;
        self.line_height = 0;
        self.has_content = false;
    }

    /// Reserve a full-width slot for a block-level box inside an inline.
    fn place_block(&mut self, height: i32) -> i32 {
        self.break_line();
        let top = self.origin.y + self.line_top;
        self.line_top += height;
        top
    }

    /// Close the last line and return the content height.
    fn finish(&mut self) -> i32 {
        self.break_line();
        self.line_top
    }

    /// Empty fragment at the current position, for inlines without content.
    fn caret(&self, height: i32) -> LayoutRect {
        LayoutRect::new(
            self.origin.x + self.cursor,
            self.origin.y + self.line_top,
            0,
            height,
        )
    }
}

impl LayoutTree {
    /// Lay out the inline children of `container` into lines; returns the
    /// content height.
    pub(crate) fn layout_inline_content(
        &mut self,
        container: LayoutId,
        content_width: i32,
        laid_out: &mut usize,
    ) -> i32 {
        let Some(object) = self.object(container) else {
            return 0;
        };
        let origin = IntPoint::new(snap(object.style.padding.left), snap(object.style.padding.top));
        let multiplier = object.autosize_multiplier;
        let mut lines = LineBuilder::new(origin, content_width);
        let children: Vec<LayoutId> = self.children(container).collect();
        for child in children {
            self.place_inline(child, &mut lines, multiplier, laid_out);
        }
        lines.finish()
    }

    fn place_inline(
        &mut self,
        id: LayoutId,
        lines: &mut LineBuilder,
        multiplier: f32,
        laid_out: &mut usize,
    ) -> LayoutRect {
        let Some(object) = self.object(id) else {
            return LayoutRect::default();
        };
        if object.is_out_of_flow_positioned() {
            return LayoutRect::default();
        }
        let style = Arc::clone(&object.style);
        let kind = object.kind.clone();
        let inline_level = object.is_inline_level();
        let line_height = snap(style.computed_line_height() * multiplier);
        let constraint = WidthConstraint::Fill(lines.width);
        let rect = match kind {
            LayoutObjectKind::Text { text } => {
                let advance = style.font_size * multiplier * self.glyph_advance_ratio;
                let space = snap(advance);
                let mut rect = LayoutRect::default();
                for word in text.split_whitespace() {
                    let word_width = snap(word.chars().count() as f32 * advance);
                    let mut leading = if lines.at_line_start() { 0 } else { space };
                    if !lines.fits(leading, word_width) {
                        lines.break_line();
                        leading = 0;
                    }
                    let fragment = lines.place(leading, word_width, line_height);
                    rect = if rect.is_empty() {
                        fragment
                    } else {
                        rect.united(&fragment)
                    };
                }
                *laid_out += 1;
                rect
            }
            LayoutObjectKind::Inline => {
                let start = lines.caret(line_height);
                let children: Vec<LayoutId> = self.children(id).collect();
                let mut rect = LayoutRect::default();
                for child in children {
                    let fragment = self.place_inline(child, lines, multiplier, laid_out);
                    rect = rect.united(&fragment);
                }
                *laid_out += 1;
                if rect.is_empty() { start } else { rect }
            }
            LayoutObjectKind::Replaced { .. } | LayoutObjectKind::Block if inline_level => {
                if matches!(kind, LayoutObjectKind::Replaced { .. }) {
                    self.layout_replaced(id, constraint, laid_out);
                } else {
                    let width = style.width.resolve(lines.width as f32).map_or_else(
                        || self.shrink_to_fit_width(id, lines.width - snap(style.margin.horizontal())),
                        snap,
                    );
                    self.layout_block(id, WidthConstraint::Exact(width), laid_out);
                }
                let size = self.object(id).map_or(IntSize::ZERO, |placed| placed.size);
                let margin_width = size.width + snap(style.margin.horizontal());
                let margin_height = size.height + snap(style.margin.vertical());
                if !lines.fits(0, margin_width) {
                    lines.break_line();
                }
                let slot = lines.place(0, margin_width, margin_height);
                let location = slot.location()
                    + IntSize::new(snap(style.margin.left), snap(style.margin.top));
                self.set_location(id, location);
                return slot;
            }
            LayoutObjectKind::View
            | LayoutObjectKind::Block
            | LayoutObjectKind::AnonymousBlock
            | LayoutObjectKind::Replaced { .. } => {
                // Block-level box inside an inline sits on its own line.
                let available = lines.width;
                if matches!(kind, LayoutObjectKind::Replaced { .. }) {
                    self.layout_replaced(id, WidthConstraint::Fill(available), laid_out);
                } else {
                    self.layout_block(id, WidthConstraint::Fill(available), laid_out);
                }
                let size = self.object(id).map_or(IntSize::ZERO, |placed| placed.size);
                let top = lines.place_block(size.height + snap(style.margin.vertical()));
                let location = IntPoint::new(
                    lines.origin.x + snap(style.margin.left),
                    top + snap(style.margin.top),
                );
                self.set_location(id, location);
                return LayoutRect::from_location_and_size(location, size);
            }
        };
        self.set_location(id, rect.location());
        self.finish_object(id, rect.size(), constraint);
        rect
    }
}
