mod common;

use anyhow::{Error, anyhow};
use common::{Page, init_logging};
use layouter::{IntSize, LayoutRect, TextAutosizer};
use lifecycle::DetachScope;
use std::rc::Rc;

/// Embedded frames register as widgets and unregister when hidden.
///
/// # Errors
/// Returns an error if the document cannot be built or mutated.
///
/// # Panics
/// Panics if widget changes are not reported.
#[test]
fn widget_registry_changes() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let frame = page.element(body, "iframe", "")?;
    page.attach();

    let frame_id = page.id(frame).ok_or_else(|| anyhow!("frame not rendered"))?;
    let changes = page.tree.take_changes();
    assert_eq!(changes.widgets_added, vec![(frame_id, frame)]);

    page.layout();
    let frame_box = page.object(frame).ok_or_else(|| anyhow!("frame"))?;
    assert_eq!(frame_box.size(), IntSize::new(300, 150));

    page.dom.set_attribute(frame, "style", "display: none")?;
    page.rebuild(body);
    let changes = page.tree.take_changes();
    assert_eq!(changes.widgets_removed, vec![(frame_id, frame)]);
    assert!(changes.destroyed.contains(&frame_id));
    assert!(page.id(frame).is_none());
    Ok(())
}

/// Removing a node destroys its layout subtree; laying out the stale root
/// afterwards does nothing.
///
/// # Errors
/// Returns an error if the document cannot be built or mutated.
///
/// # Panics
/// Panics if the detached root is laid out.
#[test]
fn detached_root_is_noop() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let doomed = page.element(body, "div", "height: 40px")?;
    page.text(doomed, "bye")?;
    page.attach();
    page.layout();
    drop(page.tree.collect_paint_invalidations(true, IntSize::ZERO));
    let doomed_id = page.id(doomed).ok_or_else(|| anyhow!("not rendered"))?;
    drop(page.tree.take_changes());

    page.dom.remove_child(body, doomed)?;
    {
        let _detach = DetachScope::new(Rc::clone(&page.lifecycle));
        page.tree.detach_node(doomed);
    }
    assert!(!page.tree.contains(doomed_id));
    assert!(page.tree.take_changes().destroyed.contains(&doomed_id));

    let outcome = page.layout_from(doomed_id, &TextAutosizer::disabled());
    assert_eq!(outcome.objects_laid_out, 0);
    assert_eq!(outcome.passes, 0);

    // The body shrank, and the removed box is repainted away.
    page.layout();
    let body_box = page.object(body).ok_or_else(|| anyhow!("body"))?;
    assert_eq!(body_box.size().height, 0);
    let invalidations = page.tree.collect_paint_invalidations(false, IntSize::ZERO);
    assert!(invalidations.iter().any(|invalidation| {
        invalidation.object == doomed_id
            && invalidation.old == Some(LayoutRect::new(8, 8, 784, 40))
            && invalidation.new.is_empty()
    }));
    Ok(())
}
