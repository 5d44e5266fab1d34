//! Page handler: the document lifecycle and frame view orchestration.
//!
//! A [`Document`] owns the DOM, the style engine and the layout tree, and
//! drives them through the lifecycle phases: style recalc, layout, paint
//! invalidation and paint. Its [`FrameView`] schedules layouts, runs the
//! tasks around them, scrolls and sizes the frame. Script is modeled by
//! closures (event listeners, widget callbacks, a script handler for
//! written markup) that receive the document and may reenter any of it.

pub mod config;
pub mod document;
pub mod events;
pub mod frame_view;
pub mod host;
pub mod paint_session;
pub mod tasks;
pub mod telemetry;
pub mod testing;

pub use config::FrameConfig;
pub use document::{
    AnimationCallback, ChildFrame, Document, PendingSheetLayout, ReadyState, ScriptHandler,
};
pub use events::{Event, EventTarget, EventType, Listener, ListenerId};
pub use frame_view::{
    AnnotatedRegion, FrameView, FrameViewId, MediaType, ScrollbarMode, WidgetClient, WidgetEntry,
};
pub use host::{AxObjectCache, EmbedderClient, HostWindow, PageClients};
pub use paint_session::{PaintChunk, PaintSession};
pub use tasks::{Task, TimerKind};
pub use telemetry::PerfCounters;
