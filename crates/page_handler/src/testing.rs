//! Recording collaborators for tests.
//!
//! Each recorder keeps every call it receives so tests can assert on
//! invalidations, blits and notifications after driving a document.

use crate::frame_view::{AnnotatedRegion, FrameViewId};
use crate::host::{AxObjectCache, EmbedderClient, HostWindow, PageClients};
use core::cell::{Cell, RefCell};
use core::mem;
use html::NodeId;
use layouter::{IntSize, LayoutRect};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Invalidate(LayoutRect),
    Scroll {
        delta: IntSize,
        rect_to_scroll: LayoutRect,
        clip: LayoutRect,
    },
    ScheduleAnimation,
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: RefCell<Vec<HostCall>>,
    cannot_blit: Cell<bool>,
}

impl RecordingHost {
    pub fn set_can_blit(&self, can_blit: bool) {
        self.cannot_blit.set(!can_blit);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<HostCall> {
        mem::take(&mut *self.calls.borrow_mut())
    }

    /// Rects passed to `invalidate_contents_and_root_view`, in call order.
    pub fn invalidated_rects(&self) -> Vec<LayoutRect> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HostCall::Invalidate(rect) => Some(*rect),
                HostCall::Scroll { .. } | HostCall::ScheduleAnimation => None,
            })
            .collect()
    }

    pub fn scroll_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, HostCall::Scroll { .. }))
            .count()
    }
}

impl HostWindow for RecordingHost {
    fn invalidate_contents_and_root_view(&self, rect: LayoutRect) {
        self.calls.borrow_mut().push(HostCall::Invalidate(rect));
    }

    fn scroll(&self, delta: IntSize, rect_to_scroll: LayoutRect, clip: LayoutRect) {
        self.calls.borrow_mut().push(HostCall::Scroll {
            delta,
            rect_to_scroll,
            clip,
        });
    }

    fn schedule_animation(&self) {
        self.calls.borrow_mut().push(HostCall::ScheduleAnimation);
    }

    fn can_blit_on_scroll(&self) -> bool {
        !self.cannot_blit.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxEvent {
    LayoutComplete(FrameViewId),
    ScrollPositionChanged(FrameViewId),
    FocusChanged {
        old: Option<NodeId>,
        new: Option<NodeId>,
    },
    ScrolledToAnchor(NodeId),
}

#[derive(Debug, Default)]
pub struct RecordingAxCache {
    events: RefCell<Vec<AxEvent>>,
}

impl RecordingAxCache {
    pub fn events(&self) -> Vec<AxEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<AxEvent> {
        mem::take(&mut *self.events.borrow_mut())
    }
}

impl AxObjectCache for RecordingAxCache {
    fn handle_layout_complete(&self, frame: FrameViewId) {
        self.events.borrow_mut().push(AxEvent::LayoutComplete(frame));
    }

    fn handle_scroll_position_changed(&self, frame: FrameViewId) {
        self.events
            .borrow_mut()
            .push(AxEvent::ScrollPositionChanged(frame));
    }

    fn handle_focused_ui_element_changed(&self, old: Option<NodeId>, new: Option<NodeId>) {
        self.events
            .borrow_mut()
            .push(AxEvent::FocusChanged { old, new });
    }

    fn handle_scrolled_to_anchor(&self, anchor: NodeId) {
        self.events.borrow_mut().push(AxEvent::ScrolledToAnchor(anchor));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedderEvent {
    FirstLayout,
    FirstVisuallyNonEmptyLayout,
    ContentsSizeChanged(IntSize),
    FocusedNodeChanged(Option<NodeId>),
    AnnotatedRegionsChanged(Vec<AnnotatedRegion>),
    TitleChanged(String),
}

#[derive(Debug)]
pub struct RecordingEmbedder {
    events: RefCell<Vec<EmbedderEvent>>,
    focused: Cell<bool>,
    view_size: Cell<Option<IntSize>>,
}

impl Default for RecordingEmbedder {
    fn default() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            focused: Cell::new(true),
            view_size: Cell::new(None),
        }
    }
}

impl RecordingEmbedder {
    pub fn set_focused(&self, focused: bool) {
        self.focused.set(focused);
    }

    pub fn set_view_size(&self, size: Option<IntSize>) {
        self.view_size.set(size);
    }

    pub fn events(&self) -> Vec<EmbedderEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<EmbedderEvent> {
        mem::take(&mut *self.events.borrow_mut())
    }
}

impl EmbedderClient for RecordingEmbedder {
    fn view_size(&self) -> Option<IntSize> {
        self.view_size.get()
    }

    fn has_focus(&self) -> bool {
        self.focused.get()
    }

    fn did_first_layout(&self) {
        self.events.borrow_mut().push(EmbedderEvent::FirstLayout);
    }

    fn did_first_visually_non_empty_layout(&self) {
        self.events
            .borrow_mut()
            .push(EmbedderEvent::FirstVisuallyNonEmptyLayout);
    }

    fn contents_size_changed(&self, size: IntSize) {
        self.events
            .borrow_mut()
            .push(EmbedderEvent::ContentsSizeChanged(size));
    }

    fn focused_node_changed(&self, node: Option<NodeId>) {
        self.events
            .borrow_mut()
            .push(EmbedderEvent::FocusedNodeChanged(node));
    }

    fn annotated_regions_changed(&self, regions: &[AnnotatedRegion]) {
        self.events
            .borrow_mut()
            .push(EmbedderEvent::AnnotatedRegionsChanged(regions.to_vec()));
    }

    fn title_changed(&self, title: &str) {
        self.events
            .borrow_mut()
            .push(EmbedderEvent::TitleChanged(title.to_owned()));
    }
}

/// One recorder of each kind, plus the [`PageClients`] wiring them up.
#[derive(Default)]
pub struct Recorders {
    pub host: Rc<RecordingHost>,
    pub ax_cache: Rc<RecordingAxCache>,
    pub embedder: Rc<RecordingEmbedder>,
}

impl Recorders {
    pub fn clients(&self) -> PageClients {
        PageClients {
            host: Some(Rc::clone(&self.host) as Rc<dyn HostWindow>),
            ax_cache: Some(Rc::clone(&self.ax_cache) as Rc<dyn AxObjectCache>),
            embedder: Some(Rc::clone(&self.embedder) as Rc<dyn EmbedderClient>),
        }
    }
}
