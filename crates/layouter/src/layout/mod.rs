//! Block layout and the per-call layout driver.

mod inline;
mod intrinsic;
mod positioned;

use crate::autosizer::TextAutosizer;
use crate::geometry::{IntPoint, IntSize, LayoutRect, snap};
use crate::object::{LayoutId, LayoutObject, LayoutObjectKind, WidthConstraint};
use crate::tree::LayoutTree;
use log::debug;
use std::sync::Arc;
use style_engine::{ComputedStyle, Position, SizeSpecified};
use tracing::trace_span;

/// Intrinsic size of replaced content without a specified size.
pub(crate) const DEFAULT_REPLACED_WIDTH: i32 = 300;
pub(crate) const DEFAULT_REPLACED_HEIGHT: i32 = 150;

/// What one [`LayoutTree::layout_subtree`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOutcome {
    /// 1 normally, 2 when text autosizing changed a multiplier.
    pub passes: u32,
    pub objects_laid_out: usize,
}

/// Offset applied by `position: relative`.
fn relative_offset(style: &ComputedStyle) -> IntSize {
    if style.position != Position::Relative {
        return IntSize::ZERO;
    }
    let inset = &style.inset;
    let horizontal = inset
        .left
        .or_else(|| inset.right.map(|right| -right))
        .map_or(0, snap);
    let vertical = inset
        .top
        .or_else(|| inset.bottom.map(|bottom| -bottom))
        .map_or(0, snap);
    IntSize::new(horizontal, vertical)
}

impl LayoutTree {
    /// Lay out everything dirty below `root`, with at most one extra pass
    /// when text autosizing changes a multiplier. A detached root is a no-op.
    pub fn layout_subtree(&mut self, root: LayoutId, autosizer: &TextAutosizer) -> LayoutOutcome {
        if !self.is_attached(root) {
            debug!("layout of detached root {root:?} skipped");
            return LayoutOutcome::default();
        }
        let _span = trace_span!("layout_subtree").entered();
        let mut outcome = LayoutOutcome {
            passes: 1,
            objects_laid_out: self.layout_pass(root),
        };
        if autosizer.is_enabled() && self.apply_text_autosizing(root, autosizer) {
            outcome.passes = 2;
            outcome.objects_laid_out += self.layout_pass(root);
        }
        self.assert_subtree_is_laid_out(root);
        outcome
    }

    fn layout_pass(&mut self, root: LayoutId) -> usize {
        let mut laid_out = 0;
        if root == self.view {
            let width = self.view_size.width;
            self.layout_block(root, WidthConstraint::Exact(width), &mut laid_out);
            return laid_out;
        }
        let constraint = self
            .object(root)
            .and_then(|object| object.constraint)
            .unwrap_or(WidthConstraint::Fill(self.view_size.width));
        let replaced = self
            .object(root)
            .is_some_and(|object| matches!(object.kind, LayoutObjectKind::Replaced { .. }));
        if replaced {
            self.layout_replaced(root, constraint, &mut laid_out);
        } else {
            self.layout_block(root, constraint, &mut laid_out);
        }
        laid_out
    }

    fn is_clean_for(&self, object: &LayoutObject, constraint: WidthConstraint) -> bool {
        !object.needs_layout() && object.constraint == Some(constraint)
    }

    pub(crate) fn finish_object(&mut self, id: LayoutId, size: IntSize, constraint: WidthConstraint) {
        if let Some(object) = self.object_mut(id) {
            if object.size != size {
                object.should_invalidate_paint = true;
            }
            object.size = size;
            object.overflow = LayoutRect::from_location_and_size(IntPoint::ZERO, size);
            object.constraint = Some(constraint);
            object.self_needs_layout = false;
            object.child_needs_layout = false;
        }
    }

    pub(crate) fn set_location(&mut self, id: LayoutId, location: IntPoint) {
        if let Some(object) = self.object_mut(id) {
            if object.location != location {
                object.should_invalidate_paint = true;
            }
            object.location = location;
        }
    }

    /// Whether the in-flow children of `id` form an inline formatting context.
    pub(crate) fn has_inline_content(&self, id: LayoutId) -> bool {
        self.children(id).any(|child| {
            self.object(child)
                .is_some_and(|object| object.is_inline_level())
        })
    }

    /// Lay out a block container and everything it contains.
    pub(crate) fn layout_block(
        &mut self,
        id: LayoutId,
        constraint: WidthConstraint,
        laid_out: &mut usize,
    ) {
        let Some(object) = self.object(id) else {
            return;
        };
        if self.is_clean_for(object, constraint) {
            return;
        }
        *laid_out += 1;
        let style = Arc::clone(&object.style);
        let is_view = object.is_view();
        let width = match constraint {
            WidthConstraint::Exact(width) => width,
            WidthConstraint::Fill(available) if object.is_anonymous() => available,
            WidthConstraint::Fill(available) => style
                .width
                .resolve(available as f32)
                .map_or_else(|| available - snap(style.margin.horizontal()), snap),
        }
        .max(0);
        let content_width = (width - snap(style.padding.horizontal())).max(0);

        let content_height = if self.has_inline_content(id) {
            self.layout_inline_content(id, content_width, laid_out)
        } else {
            self.layout_block_children(id, &style, content_width, laid_out)
        };
        let height = if is_view {
            self.view_size.height
        } else if let SizeSpecified::Px(height) = style.height {
            snap(height)
        } else {
            content_height + snap(style.padding.vertical())
        };
        self.finish_object(id, IntSize::new(width, height.max(0)), constraint);
        self.layout_positioned_objects(id, laid_out);
        self.compute_overflow(id);
    }

    /// Stack block-level children vertically; returns the content height.
    fn layout_block_children(
        &mut self,
        id: LayoutId,
        style: &ComputedStyle,
        content_width: i32,
        laid_out: &mut usize,
    ) -> i32 {
        let left = snap(style.padding.left);
        let top = snap(style.padding.top);
        let mut cursor = top;
        let children: Vec<LayoutId> = self.children(id).collect();
        for child in children {
            let Some(object) = self.object(child) else {
                continue;
            };
            if object.is_out_of_flow_positioned() {
                continue;
            }
            let child_style = Arc::clone(&object.style);
            let constraint = WidthConstraint::Fill(content_width);
            if matches!(object.kind, LayoutObjectKind::Replaced { .. }) {
                self.layout_replaced(child, constraint, laid_out);
            } else {
                self.layout_block(child, constraint, laid_out);
            }
            let margin_top = snap(child_style.margin.top);
            let location = IntPoint::new(left + snap(child_style.margin.left), cursor + margin_top)
                + relative_offset(&child_style);
            self.set_location(child, location);
            let height = self.object(child).map_or(0, |object| object.size.height);
            cursor += margin_top + height + snap(child_style.margin.bottom);
        }
        cursor - top
    }

    /// Replaced content uses its specified size or the default intrinsic size.
    pub(crate) fn layout_replaced(
        &mut self,
        id: LayoutId,
        constraint: WidthConstraint,
        laid_out: &mut usize,
    ) {
        let Some(object) = self.object(id) else {
            return;
        };
        if self.is_clean_for(object, constraint) {
            return;
        }
        *laid_out += 1;
        let style = Arc::clone(&object.style);
        let width = match constraint {
            WidthConstraint::Exact(width) => width,
            WidthConstraint::Fill(available) => style
                .width
                .resolve(available as f32)
                .map_or(DEFAULT_REPLACED_WIDTH, snap),
        };
        let height = match style.height {
            SizeSpecified::Px(height) => snap(height),
            SizeSpecified::Auto | SizeSpecified::Percent(_) => DEFAULT_REPLACED_HEIGHT,
        };
        self.finish_object(id, IntSize::new(width.max(0), height.max(0)), constraint);
    }

    /// Union of the border box with the overflow of contained boxes, unless clipped.
    fn compute_overflow(&mut self, id: LayoutId) {
        let Some(object) = self.object(id) else {
            return;
        };
        let border_box = LayoutRect::from_location_and_size(IntPoint::ZERO, object.size);
        let clips = !object.is_view() && object.style.has_overflow_clip();
        let mut overflow = border_box;
        if !clips {
            for contained in self.descendants(id).skip(1) {
                if self.containing_block(contained) != Some(id) {
                    continue;
                }
                let Some(child) = self.object(contained) else {
                    continue;
                };
                let offset = IntSize::new(child.location.x, child.location.y);
                let child_rect = if child.style.has_overflow_clip() && !child.is_text() {
                    child.frame_rect()
                } else {
                    child.overflow.translated(offset)
                };
                overflow = overflow.united(&child_rect);
            }
        }
        if let Some(object) = self.object_mut(id) {
            object.overflow = overflow;
        }
    }

    /// Scrollable height of an object: its overflow extent or its own height.
    pub fn scroll_height(&self, id: LayoutId) -> i32 {
        self.object(id)
            .map_or(0, |object| object.overflow.max_y().max(object.size.height))
    }

    /// Size of the document content, never smaller than the view.
    pub fn document_size(&self) -> IntSize {
        self.object(self.view).map_or(IntSize::ZERO, |view| {
            IntSize::new(
                view.overflow.max_x().max(view.size.width),
                view.overflow.max_y().max(view.size.height),
            )
        })
    }
}
