mod common;

use anyhow::{Error, anyhow};
use common::{Page, init_logging};
use core::cell::Cell;
use html::NodeId;
use layouter::{IntSize, LayoutRect};
use lifecycle::LifecycleState;
use page_handler::testing::Recorders;
use page_handler::{
    Document, Event, EventTarget, EventType, FrameConfig, FrameView, Listener, Task, WidgetClient,
};
use std::rc::Rc;

/// Tears the document down from inside the geometry callback.
#[derive(Default)]
struct DetachingClient {
    calls: Cell<u32>,
}

impl WidgetClient for DetachingClient {
    fn set_frame_rect(&self, document: &mut Document, _owner: NodeId, _rect: LayoutRect) {
        self.calls.set(self.calls.get() + 1);
        document.detach();
    }
}

/// A widget callback that detaches the document mid post-layout stops the
/// pass cleanly: nothing touches the dropped view and the lifecycle ends
/// stopped.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the pass carries on after the detach.
#[test]
fn detach_from_widget_callback() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "embed", "display: block; width: 30px; height: 30px")?;
    page.element(body, "embed", "display: block; width: 30px; height: 30px")?;
    let client = Rc::new(DetachingClient::default());
    page.doc
        .set_widget_client(Some(Rc::clone(&client) as Rc<dyn WidgetClient>));

    page.doc.update_lifecycle_to_paint_invalidation_clean();
    assert_eq!(client.calls.get(), 1);
    assert!(page.doc.frame_view().is_none());
    assert_eq!(page.doc.lifecycle().state(), LifecycleState::Stopped);

    // Everything after teardown is a no-op.
    page.doc.pump(16.0);
    page.doc.update_style_and_layout();
    page.doc.detach();
    assert_eq!(page.doc.lifecycle().state(), LifecycleState::Stopped);
    Ok(())
}

/// A task that detaches stops the rest of the pump.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if a later task or callback runs.
#[test]
fn detach_from_task_stops_the_pump() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    page.settle();
    let ran_after = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran_after);

    page.doc
        .post_task(Task::Callback(Box::new(|document: &mut Document| document.detach())));
    page.doc.post_task(Task::Callback(Box::new(move |_: &mut Document| flag.set(true))));
    page.doc.pump(16.0);
    assert!(!ran_after.get());
    assert_eq!(page.doc.lifecycle().state(), LifecycleState::Stopped);
    Ok(())
}

/// A scroll listener that detaches runs on the next pump without leaving
/// anything behind.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the detach is not clean.
#[test]
fn detach_from_scroll_listener() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "div", "height: 3000px")?;
    page.settle();
    let detach: Listener = Rc::new(|document: &mut Document, _: &Event| document.detach());
    page.doc
        .add_event_listener(EventTarget::Document, EventType::Scroll, detach);

    assert!(FrameView::set_scroll_offset(&mut page.doc, IntSize::new(0, 40)));
    assert!(page.doc.frame_view().is_some());
    page.doc.pump(16.0);
    assert!(page.doc.frame_view().is_none());
    assert_eq!(page.doc.lifecycle().state(), LifecycleState::Stopped);
    Ok(())
}

/// Child frames are sized to their owner boxes, pumped with the parent,
/// and detached when the owner leaves the document.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the child frame outlives its owner.
#[test]
fn child_frame_follows_its_owner() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let owner = page.element(body, "iframe", "display: block; width: 200px; height: 100px")?;

    let child_recorders = Recorders::default();
    let mut child = Document::new(
        FrameConfig::new(IntSize::new(10, 10), true),
        child_recorders.clients(),
    );
    let child_root = child.dom().root();
    let child_html = child.create_element("html");
    child.append_child(child_root, child_html)?;
    child.attach();
    page.doc.add_child_frame(owner, child);

    page.doc.pump(16.0);
    let child_frame = page
        .doc
        .child_frames()
        .first()
        .ok_or_else(|| anyhow!("child frame missing"))?;
    let child_view = child_frame
        .document
        .frame_view()
        .ok_or_else(|| anyhow!("child view missing"))?;
    assert_eq!(child_view.frame_size(), IntSize::new(200, 100));
    assert_eq!(
        child_frame.document.lifecycle().state(),
        LifecycleState::PaintInvalidationClean
    );

    page.doc.remove_child(body, owner)?;
    assert!(page.doc.child_frames().is_empty());
    Ok(())
}
