mod common;

use common::init_logging;
use core::cell::Cell;
use html::NodeId;
use layouter::IntSize;
use page_handler::testing::Recorders;
use page_handler::{Document, FrameConfig, ReadyState, ScriptHandler};
use std::rc::Rc;

fn document() -> (Document, Recorders) {
    let recorders = Recorders::default();
    let config = FrameConfig::new(IntSize::new(400, 300), true);
    let mut doc = Document::new(config, recorders.clients());
    doc.attach();
    (doc, recorders)
}

/// A script that writes itself again is cut off at the recursion limit,
/// and the outer write still finishes.
///
/// # Panics
/// Panics if the handler runs more or fewer times than the limit allows.
#[test]
fn self_writing_script_stops_at_the_limit() {
    init_logging();
    let (mut doc, _recorders) = document();
    let runs = Rc::new(Cell::new(0_u32));
    let counter = Rc::clone(&runs);
    let handler: ScriptHandler = Rc::new(move |document: &mut Document, _: NodeId, _: &str| {
        counter.set(counter.get() + 1);
        document.write("<script>again</script>");
    });
    doc.set_script_handler(Some(handler));

    doc.write("<html><body><script>again</script>");
    assert_eq!(runs.get(), doc.config().max_write_recursion_depth);
    assert_eq!(runs.get(), 21);
    assert_eq!(doc.write_depth(), 0);

    // Back at the top level writes go through again.
    doc.set_script_handler(None);
    doc.write("<p id=after>done</p></body></html>");
    doc.close();
    assert!(doc.dom().get_element_by_id("after").is_some());
    assert_eq!(doc.ready_state(), ReadyState::Complete);
}

/// `open` from inside a write is ignored, so the markup written so far
/// survives.
///
/// # Panics
/// Panics if the document was cleared.
#[test]
fn open_inside_write_is_ignored() {
    init_logging();
    let (mut doc, _recorders) = document();
    let handler: ScriptHandler = Rc::new(|document: &mut Document, _: NodeId, _: &str| {
        document.open();
        document.write("<p id=second>two</p>");
    });
    doc.set_script_handler(Some(handler));

    doc.write("<html><body><p id=first>one</p><script>open</script>");
    doc.close();
    assert!(doc.dom().get_element_by_id("first").is_some());
    assert!(doc.dom().get_element_by_id("second").is_some());
}

/// Script sees the tree built so far and its own source text.
///
/// # Panics
/// Panics if the handler saw the wrong state.
#[test]
fn script_runs_with_the_tree_so_far() {
    init_logging();
    let (mut doc, _recorders) = document();
    let seen = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen);
    let handler: ScriptHandler = Rc::new(move |document: &mut Document, _: NodeId, source: &str| {
        flag.set(source == "check" && document.dom().get_element_by_id("before").is_some());
    });
    doc.set_script_handler(Some(handler));

    doc.write("<html><body><div id=before></div><script>check</script></body></html>");
    doc.close();
    assert!(seen.get());
    assert!(doc.load_event_finished());
}
