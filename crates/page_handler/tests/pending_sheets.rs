mod common;

use anyhow::{Error, anyhow};
use common::{Page, init_logging};
use html::NodeId;
use layouter::{IntSize, LayoutRect};
use page_handler::testing::{AxEvent, EmbedderEvent};
use page_handler::{FrameView, PendingSheetLayout};

/// Build a page whose `#target` sits below a 1000px block, with content
/// after it so it can be scrolled to the top.
fn anchored_page() -> Result<(Page, NodeId), Error> {
    let mut page = Page::new()?;
    let body = page.body;
    page.element(body, "div", "height: 1000px")?;
    let target = page.element(body, "div", "height: 50px")?;
    page.doc.set_attribute(target, "id", "target")?;
    page.element(body, "div", "height: 2000px")?;
    Ok((page, target))
}

/// A forced layout with sheets pending is remembered; when the last sheet
/// arrives the frame is fully repainted and the deferred fragment scroll
/// happens.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the pending-sheet state machine misbehaves.
#[test]
fn layout_with_pending_sheets_repaints_when_they_arrive() -> Result<(), Error> {
    init_logging();
    let (mut page, target) = anchored_page()?;
    page.doc.add_pending_sheet();

    // Normal updates leave unrendered elements alone while sheets load.
    page.doc.update_style_and_layout();
    assert_eq!(page.rect_of(page.body), None);
    assert_eq!(
        page.doc.pending_sheet_layout(),
        PendingSheetLayout::NoLayoutWithPendingSheets
    );

    page.doc.update_style_and_layout_ignore_pending_stylesheets(true);
    assert_eq!(
        page.doc.pending_sheet_layout(),
        PendingSheetLayout::DidLayoutWithPendingSheets
    );
    assert!(page.rect_of(page.body).is_some());
    assert!(
        !page
            .recorders
            .embedder
            .events()
            .contains(&EmbedderEvent::FirstVisuallyNonEmptyLayout)
    );

    assert!(!FrameView::scroll_to_fragment(&mut page.doc, "target"));
    page.settle();
    let full_before = page.doc.counters().full_paint_invalidations;

    page.doc.remove_pending_sheet();
    assert_eq!(
        page.doc.pending_sheet_layout(),
        PendingSheetLayout::IgnoreLayoutWithPendingSheets
    );
    let view = page.doc.frame_view().ok_or_else(|| anyhow!("no frame view"))?;
    assert_eq!(view.maintained_anchor(), Some(target));
    let rect = page.rect_of(target).ok_or_else(|| anyhow!("target not rendered"))?;
    assert_eq!(view.scroll_offset(), IntSize::new(0, rect.y));
    assert!(
        page.recorders
            .ax_cache
            .events()
            .contains(&AxEvent::ScrolledToAnchor(target))
    );

    page.doc.update_lifecycle_to_paint_invalidation_clean();
    assert_eq!(page.doc.counters().full_paint_invalidations, full_before + 1);
    assert!(
        page.recorders
            .host
            .invalidated_rects()
            .contains(&LayoutRect::new(0, 0, 800, 600))
    );
    Ok(())
}

/// The view keeps its anchor in view across relayouts until the user
/// scrolls, and forgets it when the anchor is removed.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the anchor is not followed.
#[test]
fn anchor_is_followed_until_an_explicit_scroll() -> Result<(), Error> {
    init_logging();
    let (mut page, target) = anchored_page()?;
    let body = page.body;
    page.settle();

    assert!(FrameView::scroll_to_fragment(&mut page.doc, "target"));
    let first = page.rect_of(target).ok_or_else(|| anyhow!("target not rendered"))?;
    let offset = page.doc.frame_view().map(FrameView::scroll_offset);
    assert_eq!(offset, Some(IntSize::new(0, first.y)));

    // Content inserted above pushes the anchor down; the next layout follows it.
    let spacer = page.doc.create_element("div");
    page.doc.set_attribute(spacer, "style", "height: 100px")?;
    let first_child = page.doc.dom().children(body).next();
    page.doc.insert_before(body, spacer, first_child)?;
    page.doc.update_style_and_layout();
    let moved = page.rect_of(target).ok_or_else(|| anyhow!("target not rendered"))?;
    assert_eq!(moved.y, first.y + 100);
    let followed = page.doc.frame_view().map(FrameView::scroll_offset);
    assert_eq!(followed, Some(IntSize::new(0, moved.y)));

    assert!(FrameView::set_scroll_offset(&mut page.doc, IntSize::new(0, 10)));
    let anchor = page.doc.frame_view().and_then(FrameView::maintained_anchor);
    assert_eq!(anchor, None);

    FrameView::maintain_scroll_position_at_anchor(&mut page.doc, Some(target));
    page.doc.remove_child(body, target)?;
    let forgotten = page.doc.frame_view().and_then(FrameView::maintained_anchor);
    assert_eq!(forgotten, None);
    Ok(())
}

/// `top` and the empty fragment scroll to the top; unknown names do nothing.
///
/// # Errors
/// Returns an error if the document cannot be built.
///
/// # Panics
/// Panics if the scroll position is wrong.
#[test]
fn top_fragment_scrolls_home() -> Result<(), Error> {
    init_logging();
    let (mut page, _) = anchored_page()?;
    page.settle();
    assert!(FrameView::set_scroll_offset(&mut page.doc, IntSize::new(0, 500)));

    assert!(!FrameView::scroll_to_fragment(&mut page.doc, "missing"));
    assert!(FrameView::scroll_to_fragment(&mut page.doc, "top"));
    let offset = page.doc.frame_view().map(FrameView::scroll_offset);
    assert_eq!(offset, Some(IntSize::ZERO));
    Ok(())
}
