//! Absolute geometry and visual rects for paint invalidation.

use crate::geometry::{IntPoint, IntSize, LayoutRect, snap};
use crate::object::{LayoutId, PaintSpace, VisualRect};
use crate::tree::LayoutTree;
use style_engine::Position;

/// A repaint needed by a layout change, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintInvalidation {
    pub object: LayoutId,
    /// Where the object was last painted, if it was.
    pub old: Option<LayoutRect>,
    /// Where it paints now; empty for destroyed or invisible objects.
    pub new: LayoutRect,
}

impl LayoutTree {
    /// Border-box origin in document coordinates.
    pub fn absolute_location(&self, id: LayoutId, scroll_offset: IntSize) -> IntPoint {
        let Some(object) = self.object(id) else {
            return IntPoint::ZERO;
        };
        let base = self
            .containing_block(id)
            .map_or(IntPoint::ZERO, |block| self.absolute_location(block, scroll_offset));
        let location = base + IntSize::new(object.location.x, object.location.y);
        if object.is_text() || object.style.position != Position::Sticky {
            return location;
        }
        location + IntSize::new(0, self.sticky_offset(id, location, scroll_offset))
    }

    /// Border box in document coordinates.
    pub fn absolute_rect(&self, id: LayoutId, scroll_offset: IntSize) -> LayoutRect {
        let size = self.object(id).map_or(IntSize::ZERO, |object| object.size);
        LayoutRect::from_location_and_size(self.absolute_location(id, scroll_offset), size)
    }

    /// Vertical shift keeping a sticky box below its `top` inset while its
    /// containing block is still in view.
    fn sticky_offset(&self, id: LayoutId, static_location: IntPoint, scroll_offset: IntSize) -> i32 {
        let Some(object) = self.object(id) else {
            return 0;
        };
        let Some(top) = object.style.inset.top else {
            return 0;
        };
        let in_viewport = static_location.y - scroll_offset.height;
        let mut offset = (snap(top) - in_viewport).max(0);
        if let Some(block) = self.containing_block(id)
            && block != self.view
        {
            let block_bottom = self.absolute_location(block, scroll_offset).y
                + self.object(block).map_or(0, |container| container.size.height);
            let room = block_bottom - (static_location.y + object.size.height);
            offset = offset.min(room.max(0));
        }
        offset
    }

    /// Whether `id` moves with the viewport rather than the document.
    pub fn is_in_fixed_subtree(&self, id: LayoutId) -> bool {
        let mut current = Some(id);
        while let Some(candidate) = current {
            if candidate == self.view {
                return false;
            }
            let fixed = self.object(candidate).is_some_and(|object| {
                !object.is_text() && object.style.position == Position::Fixed
            });
            if fixed {
                return true;
            }
            current = self.containing_block(candidate);
        }
        false
    }

    /// Area the object paints, in viewport coordinates.
    pub fn visual_rect_in_viewport(&self, id: LayoutId, scroll_offset: IntSize) -> LayoutRect {
        let Some(object) = self.object(id) else {
            return LayoutRect::default();
        };
        if !object.style.is_visible() {
            return LayoutRect::default();
        }
        let location = self.absolute_location(id, scroll_offset);
        let rect = object
            .overflow
            .translated(IntSize::new(location.x, location.y));
        if self.is_in_fixed_subtree(id) {
            rect
        } else {
            rect.translated(-scroll_offset)
        }
    }

    /// Compare every object's visual rect against the one it last painted
    /// with, returning what must be repainted. `full` repaints everything.
    pub fn collect_paint_invalidations(
        &mut self,
        full: bool,
        scroll_offset: IntSize,
    ) -> Vec<PaintInvalidation> {
        let to_viewport = |previous: VisualRect| match previous.space {
            PaintSpace::Content => previous.rect.translated(-scroll_offset),
            PaintSpace::Viewport => previous.rect,
        };
        let mut invalidations: Vec<PaintInvalidation> = self
            .removed_visual_rects
            .drain(..)
            .map(|(object, previous)| PaintInvalidation {
                object,
                old: Some(to_viewport(previous)),
                new: LayoutRect::default(),
            })
            .collect();

        let ids: Vec<LayoutId> = self.descendants(self.view).collect();
        for id in ids {
            let new = self.visual_rect_in_viewport(id, scroll_offset);
            let fixed = self.is_in_fixed_subtree(id);
            let Some(object) = self.object_mut(id) else {
                continue;
            };
            let old = object.previous_visual_rect.map(to_viewport);
            if full || object.should_invalidate_paint || old != Some(new) {
                invalidations.push(PaintInvalidation {
                    object: id,
                    old,
                    new,
                });
            }
            object.should_invalidate_paint = false;
            object.previous_visual_rect = Some(if fixed {
                VisualRect {
                    rect: new,
                    space: PaintSpace::Viewport,
                }
            } else {
                VisualRect {
                    rect: new.translated(scroll_offset),
                    space: PaintSpace::Content,
                }
            });
        }
        invalidations
    }
}
