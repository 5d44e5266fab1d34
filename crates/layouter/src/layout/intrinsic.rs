//! Min- and max-content widths.

use super::DEFAULT_REPLACED_WIDTH;
use crate::geometry::snap;
use crate::object::{LayoutId, LayoutObject, LayoutObjectKind};
use crate::tree::LayoutTree;
use style_engine::SizeSpecified;

impl LayoutTree {
    /// Narrowest width the object can take without overflowing.
    pub fn min_preferred_width(&self, id: LayoutId) -> i32 {
        self.preferred_widths(id).0
    }

    /// Width the object takes when nothing wraps.
    pub fn max_preferred_width(&self, id: LayoutId) -> i32 {
        self.preferred_widths(id).1
    }

    /// CSS shrink-to-fit: `min(max(min-content, available), max-content)`.
    pub(crate) fn shrink_to_fit_width(&self, id: LayoutId, available: i32) -> i32 {
        let (min, max) = self.content_box_preferred_widths(id);
        min.max(available).min(max)
    }

    /// Autosize multiplier of the block laying out `id`'s text.
    fn text_multiplier(&self, id: LayoutId) -> f32 {
        self.containing_block(id)
            .and_then(|block| self.object(block))
            .map_or(1.0, LayoutObject::autosize_multiplier)
    }

    /// Preferred widths of the margin box.
    fn preferred_widths(&self, id: LayoutId) -> (i32, i32) {
        let Some(object) = self.object(id) else {
            return (0, 0);
        };
        let (min, max) = self.content_box_preferred_widths(id);
        if object.is_text() || object.is_anonymous() || object.is_view() {
            return (min, max);
        }
        let extra = snap(object.style.padding.horizontal()) + snap(object.style.margin.horizontal());
        if matches!(object.kind, LayoutObjectKind::Replaced { .. }) {
            let margins = snap(object.style.margin.horizontal());
            return (min + margins, max + margins);
        }
        (min + extra, max + extra)
    }

    fn content_box_preferred_widths(&self, id: LayoutId) -> (i32, i32) {
        let Some(object) = self.object(id) else {
            return (0, 0);
        };
        match &object.kind {
            LayoutObjectKind::Text { text } => {
                let advance =
                    object.style.font_size * self.text_multiplier(id) * self.glyph_advance_ratio;
                let longest = text
                    .split_whitespace()
                    .map(|word| word.chars().count())
                    .max()
                    .unwrap_or(0);
                let total: usize = text
                    .split_whitespace()
                    .map(|word| word.chars().count() + 1)
                    .sum();
                (
                    snap(longest as f32 * advance),
                    snap(total.saturating_sub(1) as f32 * advance),
                )
            }
            LayoutObjectKind::Replaced { .. } => {
                let width = match object.style.width {
                    SizeSpecified::Px(width) => snap(width),
                    SizeSpecified::Auto | SizeSpecified::Percent(_) => DEFAULT_REPLACED_WIDTH,
                };
                (width, width)
            }
            LayoutObjectKind::View
            | LayoutObjectKind::Block
            | LayoutObjectKind::Inline
            | LayoutObjectKind::AnonymousBlock => {
                if let SizeSpecified::Px(width) = object.style.width
                    && !object.is_view()
                {
                    let fixed = snap(width);
                    return (fixed, fixed);
                }
                let inline_context =
                    object.kind == LayoutObjectKind::Inline || self.has_inline_content(id);
                let mut min = 0;
                let mut max = 0;
                for child in self.children(id) {
                    if self
                        .object(child)
                        .is_none_or(LayoutObject::is_out_of_flow_positioned)
                    {
                        continue;
                    }
                    let (child_min, child_max) = self.preferred_widths(child);
                    min = min.max(child_min);
                    max = if inline_context {
                        max + child_max
                    } else {
                        max.max(child_max)
                    };
                }
                (min, max.max(min))
            }
        }
    }
}
