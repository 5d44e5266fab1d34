//! Scrollbar policy and presence for the frame viewport.

use super::FrameView;
use crate::document::Document;
use layouter::IntSize;
use log::debug;
use style_engine::{ComputedStyle, Overflow};

/// Scrollbar policy for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollbarMode {
    #[default]
    Auto,
    AlwaysOff,
    AlwaysOn,
}

impl ScrollbarMode {
    /// The policy a viewport overflow value asks for, if it asks for one.
    const fn from_overflow(overflow: Overflow) -> Option<Self> {
        match overflow {
            Overflow::Hidden => Some(Self::AlwaysOff),
            Overflow::Scroll => Some(Self::AlwaysOn),
            Overflow::Auto => Some(Self::Auto),
            Overflow::Visible => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Scrollbars {
    pub(crate) horizontal_mode: ScrollbarMode,
    pub(crate) vertical_mode: ScrollbarMode,
    pub(crate) has_horizontal: bool,
    pub(crate) has_vertical: bool,
    pub(crate) can_have_scrollbars: bool,
    /// Layout space one visible scrollbar takes; zero for overlay scrollbars.
    pub(crate) space: i32,
    /// Set by the owner element (`scrolling="no"`), overrides everything.
    pub(crate) owner_mode: ScrollbarMode,
}

impl Scrollbars {
    pub(crate) const fn new(space: i32) -> Self {
        Self {
            horizontal_mode: ScrollbarMode::Auto,
            vertical_mode: ScrollbarMode::Auto,
            has_horizontal: false,
            has_vertical: false,
            can_have_scrollbars: true,
            space,
            owner_mode: ScrollbarMode::Auto,
        }
    }

    /// Presence both bars would have for `contents` in a frame of `frame`.
    pub(crate) fn compute_existence(&self, frame: IntSize, contents: IntSize) -> (bool, bool) {
        let vertical_for = |height_available: i32| match self.vertical_mode {
            ScrollbarMode::AlwaysOn => true,
            ScrollbarMode::AlwaysOff => false,
            ScrollbarMode::Auto => contents.height > height_available,
        };
        let mut vertical = vertical_for(frame.height);
        let width_available = frame.width - if vertical { self.space } else { 0 };
        let horizontal = match self.horizontal_mode {
            ScrollbarMode::AlwaysOn => true,
            ScrollbarMode::AlwaysOff => false,
            ScrollbarMode::Auto => contents.width > width_available,
        };
        // A horizontal bar eats height and can bring the vertical one back.
        if horizontal && !vertical {
            vertical = vertical_for(frame.height - self.space);
        }
        (horizontal, vertical)
    }

    /// Recompute presence; returns whether either bar appeared or vanished.
    pub(crate) fn update(&mut self, frame: IntSize, contents: IntSize) -> bool {
        let (horizontal, vertical) = self.compute_existence(frame, contents);
        let changed = horizontal != self.has_horizontal || vertical != self.has_vertical;
        self.has_horizontal = horizontal;
        self.has_vertical = vertical;
        changed
    }
}

impl FrameView {
    pub const fn horizontal_scrollbar_mode(&self) -> ScrollbarMode {
        self.scrollbars.horizontal_mode
    }

    pub const fn vertical_scrollbar_mode(&self) -> ScrollbarMode {
        self.scrollbars.vertical_mode
    }

    pub const fn has_horizontal_scrollbar(&self) -> bool {
        self.scrollbars.has_horizontal
    }

    pub const fn has_vertical_scrollbar(&self) -> bool {
        self.scrollbars.has_vertical
    }

    pub const fn set_can_have_scrollbars(&mut self, can_have_scrollbars: bool) {
        self.scrollbars.can_have_scrollbars = can_have_scrollbars;
    }

    /// Policy imposed by the frame owner; `AlwaysOff` suppresses both bars.
    pub const fn set_owner_scrollbar_mode(&mut self, mode: ScrollbarMode) {
        self.scrollbars.owner_mode = mode;
    }

    /// Scrollbar policy for the next layout, taken from the overflow of the
    /// viewport-defining element: `body` when the root's overflow is
    /// visible, otherwise the root itself.
    pub(crate) fn calculate_scrollbar_modes(
        document: &Document,
        is_subtree_layout: bool,
    ) -> (ScrollbarMode, ScrollbarMode) {
        let Some(view) = document.frame_view.as_ref() else {
            return (ScrollbarMode::AlwaysOff, ScrollbarMode::AlwaysOff);
        };
        if view.scrollbars.owner_mode == ScrollbarMode::AlwaysOff {
            return (ScrollbarMode::AlwaysOff, ScrollbarMode::AlwaysOff);
        }
        let initial = if view.scrollbars.can_have_scrollbars {
            ScrollbarMode::Auto
        } else {
            ScrollbarMode::AlwaysOff
        };
        let mut modes = (initial, initial);
        if is_subtree_layout {
            return modes;
        }
        if let Some(style) = viewport_defining_style(document) {
            if let Some(mode) = ScrollbarMode::from_overflow(style.overflow_x) {
                modes.0 = mode;
            }
            if let Some(mode) = ScrollbarMode::from_overflow(style.overflow_y) {
                modes.1 = mode;
            }
        }
        modes
    }

    /// Apply new policies, refreshing scrollbar presence and the layout size.
    pub fn set_scrollbar_modes(
        document: &mut Document,
        horizontal: ScrollbarMode,
        vertical: ScrollbarMode,
    ) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.scrollbars.horizontal_mode == horizontal && view.scrollbars.vertical_mode == vertical
        {
            return;
        }
        view.scrollbars.horizontal_mode = horizontal;
        view.scrollbars.vertical_mode = vertical;
        let (frame, contents) = (view.frame_size, view.contents_size);
        if view.scrollbars.update(frame, contents) {
            view.clamp_scroll_offset();
        }
        Self::sync_layout_size(document);
    }

    /// Track the document size after layout, updating scrollbars and telling
    /// the embedder when it changes.
    pub(crate) fn adjust_view_size(document: &mut Document) {
        let size = document.layout_tree.document_size();
        Self::set_contents_size(document, size);
    }

    pub(crate) fn set_contents_size(document: &mut Document, size: IntSize) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.contents_size == size {
            return;
        }
        view.contents_size = size;
        let frame = view.frame_size;
        let scrollbars_changed = view.scrollbars.update(frame, size);
        view.clamp_scroll_offset();
        debug!(
            "contents size of {:?} now {size:?}, scrollbars changed: {scrollbars_changed}",
            view.id
        );
        if let Some(embedder) = document.clients.embedder() {
            embedder.contents_size_changed(size);
        }
        if scrollbars_changed {
            Self::sync_layout_size(document);
            Self::process_relayout_requests(document);
        }
    }

    /// After a style change that layout will not revisit: relayout if
    /// scrollbar presence would change, otherwise just track the new size.
    pub(crate) fn recalc_overflow_after_style_change(document: &mut Document) {
        if document.frame_view.is_none() || document.layout_tree.needs_layout() {
            return;
        }
        let (horizontal, vertical) = Self::calculate_scrollbar_modes(document, false);
        let Some(view) = document.frame_view.as_ref() else {
            return;
        };
        let mut candidate = view.scrollbars;
        candidate.horizontal_mode = horizontal;
        candidate.vertical_mode = vertical;
        let existence = candidate.compute_existence(view.frame_size, view.contents_size);
        if existence != (view.scrollbars.has_horizontal, view.scrollbars.has_vertical) {
            let root = document.layout_tree.view();
            document.layout_tree.set_needs_layout(root);
            Self::process_relayout_requests(document);
            return;
        }
        Self::adjust_view_size(document);
    }
}

/// Style of the element whose overflow drives the viewport scrollbars.
fn viewport_defining_style(document: &Document) -> Option<&ComputedStyle> {
    let html = document.dom.document_element()?;
    let html_object = document.layout_tree.object_for_node(html)?;
    let html_style = document.layout_tree.object(html_object)?.style();
    let root_overflow_visible =
        html_style.overflow_x == Overflow::Visible && html_style.overflow_y == Overflow::Visible;
    if root_overflow_visible
        && let Some(body_style) = document
            .dom
            .body()
            .and_then(|body| document.layout_tree.object_for_node(body))
            .and_then(|body| document.layout_tree.object(body))
            .map(|object| object.style().as_ref())
    {
        return Some(body_style);
    }
    Some(html_style.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A horizontal bar can force a vertical one by taking height.
    ///
    /// # Panics
    /// Panics if presence is wrong.
    #[test]
    fn horizontal_bar_brings_vertical_bar() {
        let mut scrollbars = Scrollbars::new(15);
        let frame = IntSize::new(200, 100);
        assert!(!scrollbars.update(frame, IntSize::new(200, 100)));
        assert!(scrollbars.update(frame, IntSize::new(300, 90)));
        assert!(scrollbars.has_horizontal);
        assert!(scrollbars.has_vertical);

        scrollbars.vertical_mode = ScrollbarMode::AlwaysOff;
        scrollbars.update(frame, IntSize::new(300, 90));
        assert!(!scrollbars.has_vertical);
    }
}
