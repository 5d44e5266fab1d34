mod common;

use anyhow::{Error, anyhow};
use common::{Page, init_logging};
use layouter::{IntSize, LayoutRect};
use lifecycle::LifecycleState;
use page_handler::{FrameView, PaintSession};
use style_engine::ColorRGBA;
use page_handler::testing::{AxEvent, EmbedderEvent};

/// A full update leaves the document clean, and a second one without
/// changes lays nothing out.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if a phase is left dirty or layout is not idempotent.
#[test]
fn update_leaves_every_phase_clean() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let block = page.element(body, "div", "height: 50px")?;
    page.doc.update_lifecycle_to_paint_invalidation_clean();

    assert_eq!(
        page.doc.lifecycle().state(),
        LifecycleState::PaintInvalidationClean
    );
    assert!(!page.doc.needs_layout_tree_update());
    assert!(!FrameView::needs_layout(&page.doc));
    assert_eq!(page.rect_of(block), Some(LayoutRect::new(8, 8, 784, 50)));

    let layouts = page.doc.counters().layout_count;
    page.doc.update_style_and_layout();
    assert_eq!(page.doc.counters().layout_count, layouts);
    Ok(())
}

/// The first layout notifies the embedder once and the ax cache every time.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if a notification is missing or repeated.
#[test]
fn first_layout_is_reported_once() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "div", "height: 20px; background: #00ff00")?;
    page.doc.update_style_and_layout();

    let events = page.recorders.embedder.take_events();
    let first_layouts = events
        .iter()
        .filter(|event| **event == EmbedderEvent::FirstLayout)
        .count();
    assert_eq!(first_layouts, 1);
    assert!(events.contains(&EmbedderEvent::FirstVisuallyNonEmptyLayout));
    let view_id = page
        .doc
        .frame_view()
        .map(FrameView::id)
        .ok_or_else(|| anyhow!("no frame view"))?;
    assert!(
        page.recorders
            .ax_cache
            .events()
            .contains(&AxEvent::LayoutComplete(view_id))
    );

    page.element(body, "div", "height: 20px")?;
    page.doc.update_style_and_layout();
    assert!(
        !page
            .recorders
            .embedder
            .events()
            .contains(&EmbedderEvent::FirstLayout)
    );
    Ok(())
}

/// A DOM mutation schedules a visual update, and the next pump applies it.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the mutation is not picked up.
#[test]
fn mutation_schedules_a_visual_update() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let block = page.element(body, "div", "height: 50px")?;
    page.settle();
    let version = page.doc.style_version();

    page.doc.set_attribute(block, "style", "height: 80px")?;
    assert_eq!(
        page.doc.lifecycle().state(),
        LifecycleState::VisualUpdatePending
    );
    assert!(page.doc.style_version() > version);

    page.doc.pump(16.0);
    assert_eq!(
        page.doc.lifecycle().state(),
        LifecycleState::PaintInvalidationClean
    );
    assert_eq!(page.rect_of(block), Some(LayoutRect::new(8, 8, 784, 80)));
    Ok(())
}

/// Reattaching many siblings in one recalc rebuilds their parent once, so
/// the boxes come back in order with no duplicates.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if a box is missing, duplicated or out of place.
#[test]
fn wide_reattach_rebuilds_each_parent_once() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let blocks = (0..64)
        .map(|_| page.element(body, "div", "height: 10px"))
        .collect::<Result<Vec<_>, _>>()?;
    page.settle();

    for &block in &blocks {
        page.doc.set_attribute(block, "style", "display: none")?;
    }
    page.doc.pump(16.0);
    assert!(blocks.iter().all(|&block| page.rect_of(block).is_none()));

    for &block in &blocks {
        page.doc.set_attribute(block, "style", "height: 10px")?;
    }
    page.doc.pump(16.0);
    let tree = page.doc.layout_tree();
    let body_box = tree
        .object_for_node(body)
        .ok_or_else(|| anyhow!("body has no box"))?;
    assert_eq!(tree.children(body_box).count(), blocks.len());
    for (row, &block) in (0_i32..).zip(&blocks) {
        assert_eq!(
            page.rect_of(block),
            Some(LayoutRect::new(8, 8 + row * 10, 784, 10))
        );
    }
    Ok(())
}

/// Removing an element drops its box and repaints where it was.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the box survives or nothing is repainted.
#[test]
fn removal_repaints_the_old_rect() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let block = page.element(body, "div", "height: 50px; background: #00ff00")?;
    page.settle();

    page.doc.remove_child(body, block)?;
    assert_eq!(page.rect_of(block), None);
    page.doc.update_lifecycle_to_paint_invalidation_clean();
    assert!(!page.recorders.host.invalidated_rects().is_empty());
    Ok(())
}

/// Content taller than the frame makes it scrollable; a resize updates the
/// layout size and relayouts.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the contents size or layout size is wrong.
#[test]
fn contents_size_follows_layout() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "div", "height: 2000px")?;
    page.settle();

    let view = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    let contents = view.contents_size();
    assert!(contents.height >= 2008);
    assert_eq!(view.maximum_scroll_offset(), IntSize::new(0, contents.height - 600));

    FrameView::resize(&mut page.doc, IntSize::new(400, 300));
    assert!(FrameView::needs_layout(&page.doc));
    page.doc.update_style_and_layout();
    let resized = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    assert_eq!(resized.layout_size(), IntSize::new(400, 300));
    let resized_contents = resized.contents_size();
    assert_eq!(
        resized.maximum_scroll_offset(),
        IntSize::new(0, resized_contents.height - 300)
    );
    Ok(())
}

/// Painting walks the tree in order, in viewport coordinates, starting with
/// the view filled with the base background.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the chunks are wrong.
#[test]
fn paint_produces_chunks_in_viewport_space() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "div", "height: 2000px")?;
    let marker = page.element(body, "div", "height: 10px; background: #ff0000")?;
    page.element(body, "div", "height: 1000px")?;
    page.settle();
    assert!(FrameView::set_scroll_offset(&mut page.doc, IntSize::new(0, 1800)));
    let offset = page.doc.frame_view().map(FrameView::scroll_offset);
    assert_eq!(offset, Some(IntSize::new(0, 1800)));
    page.doc.update_lifecycle_to_paint_invalidation_clean();

    let session = PaintSession::new();
    session.begin_frame(1.0);
    let chunks = FrameView::paint(&mut page.doc, &session);
    assert!(!session.in_paint_contents());
    let view_chunk = chunks.first().ok_or_else(|| anyhow!("nothing painted"))?;
    assert_eq!(view_chunk.rect, LayoutRect::new(0, 0, 800, 600));
    assert_eq!(view_chunk.background, ColorRGBA::WHITE);

    let marker_object = page
        .doc
        .layout_tree()
        .object_for_node(marker)
        .ok_or_else(|| anyhow!("marker not rendered"))?;
    let marker_chunk = chunks
        .iter()
        .find(|chunk| chunk.object == marker_object)
        .ok_or_else(|| anyhow!("marker not painted"))?;
    assert_eq!(marker_chunk.rect, LayoutRect::new(8, 208, 784, 10));
    Ok(())
}

/// Layouts that paint nothing do not count as visually non-empty; the
/// first one with text does, once.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the notification fires for empty content or repeats.
#[test]
fn visually_non_empty_needs_painted_content() -> Result<(), Error> {
    init_logging();
    let mut page = Page::new()?;
    let body = page.body;
    let block = page.element(body, "div", "height: 40px")?;
    page.doc.update_style_and_layout();
    let visually_non_empty = |events: &[EmbedderEvent]| {
        events
            .iter()
            .filter(|event| **event == EmbedderEvent::FirstVisuallyNonEmptyLayout)
            .count()
    };
    assert_eq!(visually_non_empty(&page.recorders.embedder.take_events()), 0);
    let empty = page.doc.frame_view().map(FrameView::is_visually_non_empty);
    assert_eq!(empty, Some(false));

    let text = page.doc.create_text("visible");
    page.doc.append_child(block, text)?;
    page.doc.update_style_and_layout();
    assert_eq!(visually_non_empty(&page.recorders.embedder.take_events()), 1);

    page.doc.set_text(text, "still visible")?;
    page.doc.update_style_and_layout();
    assert_eq!(visually_non_empty(&page.recorders.embedder.take_events()), 0);
    Ok(())
}
