use crate::geometry::{IntPoint, IntSize, LayoutRect};
use html::NodeId;
use std::sync::Arc;
use style_engine::{ComputedStyle, Display};

/// Stable handle to a layout object in the layout arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutId(pub(crate) indextree::NodeId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutObjectKind {
    /// The root of the layout tree, sized to the frame's layout viewport.
    View,
    Block,
    Inline,
    Text { text: String },
    /// Replaced content with intrinsic size, e.g. an embedded frame or plugin.
    Replaced { widget: bool },
    /// Wraps a run of inline-level children inside a block container that
    /// also has block-level children.
    AnonymousBlock,
}

/// Whether paint invalidation rects are kept relative to the document or
/// the viewport (for boxes inside a fixed-position subtree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaintSpace {
    Content,
    Viewport,
}

/// How the width of a box was decided by its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WidthConstraint {
    /// Fill the available width minus margins, unless the style fixes it.
    Fill(i32),
    /// Width already decided, e.g. shrink-to-fit for positioned boxes.
    Exact(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRect {
    pub rect: LayoutRect,
    pub space: PaintSpace,
}

#[derive(Debug, Clone)]
pub struct LayoutObject {
    pub(crate) kind: LayoutObjectKind,
    /// Non-owning back-reference; `None` for anonymous boxes.
    pub(crate) node: Option<NodeId>,
    pub(crate) style: Arc<ComputedStyle>,
    pub(crate) self_needs_layout: bool,
    pub(crate) child_needs_layout: bool,
    /// Offset from the containing block's border box origin.
    pub(crate) location: IntPoint,
    pub(crate) size: IntSize,
    /// Border box plus in-flow descendants' overflow, in local coordinates.
    pub(crate) overflow: LayoutRect,
    /// Width input of the last layout; a change forces relayout.
    pub(crate) constraint: Option<WidthConstraint>,
    pub(crate) autosize_multiplier: f32,
    pub(crate) should_invalidate_paint: bool,
    pub(crate) previous_visual_rect: Option<VisualRect>,
}

impl LayoutObject {
    pub(crate) fn new(kind: LayoutObjectKind, node: Option<NodeId>, style: Arc<ComputedStyle>) -> Self {
        Self {
            kind,
            node,
            style,
            self_needs_layout: true,
            child_needs_layout: false,
            location: IntPoint::ZERO,
            size: IntSize::ZERO,
            overflow: LayoutRect::default(),
            constraint: None,
            autosize_multiplier: 1.0,
            should_invalidate_paint: true,
            previous_visual_rect: None,
        }
    }

    #[inline]
    pub const fn kind(&self) -> &LayoutObjectKind {
        &self.kind
    }

    #[inline]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    #[inline]
    pub fn style(&self) -> &Arc<ComputedStyle> {
        &self.style
    }

    pub const fn needs_layout(&self) -> bool {
        self.self_needs_layout || self.child_needs_layout
    }

    pub const fn self_needs_layout(&self) -> bool {
        self.self_needs_layout
    }

    pub const fn location(&self) -> IntPoint {
        self.location
    }

    pub const fn size(&self) -> IntSize {
        self.size
    }

    pub const fn frame_rect(&self) -> LayoutRect {
        LayoutRect::from_location_and_size(self.location, self.size)
    }

    pub const fn overflow_rect(&self) -> LayoutRect {
        self.overflow
    }

    pub const fn autosize_multiplier(&self) -> f32 {
        self.autosize_multiplier
    }

    pub const fn is_view(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::View)
    }

    pub const fn is_text(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Text { .. })
    }

    pub const fn is_anonymous(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::AnonymousBlock)
    }

    pub const fn is_widget(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Replaced { widget: true })
    }

    /// Absolute and fixed boxes are taken out of the normal flow.
    pub fn is_out_of_flow_positioned(&self) -> bool {
        !self.is_text() && self.style.position.is_out_of_flow()
    }

    /// Whether the object takes part in an inline formatting context.
    pub fn is_inline_level(&self) -> bool {
        match self.kind {
            LayoutObjectKind::Text { .. } | LayoutObjectKind::Inline => true,
            LayoutObjectKind::Replaced { .. } => self.style.display != Display::Block,
            LayoutObjectKind::Block => {
                self.style.display == Display::InlineBlock && !self.is_out_of_flow_positioned()
            }
            LayoutObjectKind::View | LayoutObjectKind::AnonymousBlock => false,
        }
    }

    /// Atomic inline boxes are laid out as a unit inside a line.
    pub fn is_atomic_inline(&self) -> bool {
        self.is_inline_level()
            && matches!(
                self.kind,
                LayoutObjectKind::Block | LayoutObjectKind::Replaced { .. }
            )
    }

    pub fn is_block_container(&self) -> bool {
        matches!(
            self.kind,
            LayoutObjectKind::View | LayoutObjectKind::Block | LayoutObjectKind::AnonymousBlock
        )
    }

    /// Relayout boundary: a clipped box with fixed width and height
    /// cannot change size when its contents change.
    pub fn is_relayout_boundary(&self) -> bool {
        matches!(self.kind, LayoutObjectKind::Block)
            && self.style.has_overflow_clip()
            && self.style.width.is_fixed()
            && self.style.height.is_fixed()
    }
}
