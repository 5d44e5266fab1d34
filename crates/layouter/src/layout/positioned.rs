//! Absolute and fixed positioning against the containing block.

use crate::geometry::{IntPoint, IntSize, LayoutRect, snap};
use crate::object::{LayoutId, LayoutObject, LayoutObjectKind, WidthConstraint};
use crate::tree::LayoutTree;
use std::sync::Arc;

impl LayoutTree {
    /// Lay out the out-of-flow boxes whose containing block is `container`.
    pub(crate) fn layout_positioned_objects(&mut self, container: LayoutId, laid_out: &mut usize) {
        let Some(object) = self.object(container) else {
            return;
        };
        let block_size = if object.is_view() {
            self.view_size
        } else {
            object.size
        };
        let positioned: Vec<LayoutId> = self
            .descendants(container)
            .skip(1)
            .filter(|id| {
                self.object(*id)
                    .is_some_and(LayoutObject::is_out_of_flow_positioned)
                    && self.containing_block(*id) == Some(container)
            })
            .collect();
        for id in positioned {
            self.layout_positioned(id, block_size, laid_out);
        }
    }

    fn layout_positioned(&mut self, id: LayoutId, block_size: IntSize, laid_out: &mut usize) {
        let Some(object) = self.object(id) else {
            return;
        };
        let style = Arc::clone(&object.style);
        let replaced = matches!(object.kind, LayoutObjectKind::Replaced { .. });
        let inset = style.inset;
        let margin_width = snap(style.margin.horizontal());
        let margin_height = snap(style.margin.vertical());

        if replaced {
            self.layout_replaced(id, WidthConstraint::Fill(block_size.width), laid_out);
        } else {
            let width = match (style.width.resolve(block_size.width as f32), inset.left, inset.right) {
                (Some(width), _, _) => snap(width),
                (None, Some(left), Some(right)) => {
                    block_size.width - snap(left) - snap(right) - margin_width
                }
                (None, left, _) => {
                    let available = block_size.width - left.map_or(0, snap) - margin_width;
                    self.shrink_to_fit_width(id, available)
                }
            };
            self.layout_block(id, WidthConstraint::Exact(width.max(0)), laid_out);
        }

        let mut size = self.object(id).map_or(IntSize::ZERO, |placed| placed.size);
        if !replaced
            && !style.height.is_fixed()
            && let (Some(top), Some(bottom)) = (inset.top, inset.bottom)
        {
            size.height = (block_size.height - snap(top) - snap(bottom) - margin_height).max(0);
            if let Some(object) = self.object_mut(id) {
                object.size = size;
                object.overflow = object
                    .overflow
                    .united(&LayoutRect::from_location_and_size(IntPoint::ZERO, size));
            }
        }

        let x = inset.left.map_or_else(
            || {
                inset.right.map_or(0, |right| {
                    block_size.width - snap(right) - size.width - margin_width
                })
            },
            snap,
        );
        let y = inset.top.map_or_else(
            || {
                inset.bottom.map_or(0, |bottom| {
                    block_size.height - snap(bottom) - size.height - margin_height
                })
            },
            snap,
        );
        let location = IntPoint::new(x + snap(style.margin.left), y + snap(style.margin.top));
        self.set_location(id, location);
    }
}
