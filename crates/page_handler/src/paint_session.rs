//! Process-wide paint state, passed explicitly into paint calls.
//!
//! One [`PaintSession`] is created by the embedder at startup and handed to
//! every [`FrameView::paint`](crate::frame_view::FrameView::paint). It carries
//! the timestamp of the frame being produced and whether a paint is in
//! progress anywhere, so nested frames painting inside a parent can tell.

use core::cell::Cell;
use layouter::{LayoutId, LayoutRect};
use style_engine::ColorRGBA;

#[derive(Debug, Default)]
pub struct PaintSession {
    frame_timestamp: Cell<f64>,
    paint_depth: Cell<u32>,
}

impl PaintSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start producing the frame shown at `timestamp` seconds.
    pub fn begin_frame(&self, timestamp: f64) {
        self.frame_timestamp.set(timestamp);
    }

    pub fn current_frame_timestamp(&self) -> f64 {
        self.frame_timestamp.get()
    }

    /// Whether some frame is painting right now.
    pub fn in_paint_contents(&self) -> bool {
        self.paint_depth.get() > 0
    }

    /// Mark a paint as running until the guard drops.
    pub fn enter_paint(&self) -> PaintScope<'_> {
        self.paint_depth.set(self.paint_depth.get().saturating_add(1));
        PaintScope { session: self }
    }
}

#[must_use = "the session leaves paint when the scope drops"]
pub struct PaintScope<'session> {
    session: &'session PaintSession,
}

impl Drop for PaintScope<'_> {
    fn drop(&mut self) {
        let depth = &self.session.paint_depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

/// One painted box, in paint order, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintChunk {
    pub object: LayoutId,
    pub rect: LayoutRect,
    pub background: ColorRGBA,
}
