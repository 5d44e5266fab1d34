mod common;

use anyhow::{Error, anyhow};
use common::{Page, init_logging};
use core::cell::{Cell, RefCell};
use html::NodeId;
use layouter::LayoutRect;
use lifecycle::LifecycleState;
use page_handler::{Document, FrameView, WidgetClient};
use std::rc::Rc;

/// Restyles `target` the first time it is told a widget rect, then forces
/// a layout from inside the post-layout tasks.
struct RestylingClient {
    target: NodeId,
    restyled: Cell<bool>,
    rects: RefCell<Vec<(NodeId, LayoutRect)>>,
    updates: RefCell<Vec<NodeId>>,
}

impl RestylingClient {
    fn new(target: NodeId) -> Self {
        Self {
            target,
            restyled: Cell::new(false),
            rects: RefCell::new(Vec::new()),
            updates: RefCell::new(Vec::new()),
        }
    }
}

impl WidgetClient for RestylingClient {
    fn update_widget(&self, _document: &mut Document, owner: NodeId) {
        self.updates.borrow_mut().push(owner);
    }

    fn set_frame_rect(&self, document: &mut Document, owner: NodeId, rect: LayoutRect) {
        self.rects.borrow_mut().push((owner, rect));
        if self.restyled.replace(true) {
            return;
        }
        if document
            .set_attribute(self.target, "style", "height: 30px")
            .is_ok()
        {
            document.update_style_and_layout();
        }
    }
}

/// A layout forced by a widget callback runs nested: it defers its
/// post-layout tasks to a task and leaves paint invalidation to the outer
/// pass.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the nested pass runs post-layout work inline or invalidates.
#[test]
fn widget_callback_layout_is_nested() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let target = page.element(body, "div", "height: 10px")?;
    let frame = page.element(body, "iframe", "display: block; width: 100px; height: 50px")?;
    let client = Rc::new(RestylingClient::new(target));
    page.doc
        .set_widget_client(Some(Rc::clone(&client) as Rc<dyn WidgetClient>));

    page.doc.update_style_and_layout();

    let counters = page.doc.counters();
    assert_eq!(counters.nested_layout_peak, 2);
    assert_eq!(counters.post_layout_runs_sync, 1);
    assert_eq!(counters.post_layout_runs_deferred, 0);
    assert_eq!(counters.paint_invalidation_passes, 1);
    let view = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    assert_eq!(view.nested_layout_count(), 0);
    assert!(view.post_layout_tasks_pending());
    assert!(view.widget_updates_pending());
    assert_eq!(page.doc.lifecycle().state(), LifecycleState::LayoutClean);
    assert_eq!(page.rect_of(target), Some(LayoutRect::new(8, 8, 784, 30)));

    page.doc.pump(16.0);
    assert_eq!(page.doc.counters().post_layout_runs_deferred, 1);
    let pumped = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    assert!(!pumped.post_layout_tasks_pending());
    assert_eq!(*client.updates.borrow(), vec![frame]);
    // The second report carries the position after the restyle moved it down.
    assert_eq!(
        client.rects.borrow().last().copied(),
        Some((frame, LayoutRect::new(8, 38, 100, 50)))
    );
    Ok(())
}

/// Flushing runs deferred post-layout tasks and widget updates now.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if deferred work is left pending.
#[test]
fn flush_runs_deferred_work() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let target = page.element(body, "div", "height: 10px")?;
    let frame = page.element(body, "iframe", "display: block; width: 100px; height: 50px")?;
    let client = Rc::new(RestylingClient::new(target));
    page.doc
        .set_widget_client(Some(Rc::clone(&client) as Rc<dyn WidgetClient>));

    page.doc.update_style_and_layout_ignore_pending_stylesheets(true);
    let view = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    assert!(!view.post_layout_tasks_pending());
    assert!(!view.widget_updates_pending());
    assert_eq!(*client.updates.borrow(), vec![frame]);
    assert!(!FrameView::needs_layout(&page.doc));
    Ok(())
}
