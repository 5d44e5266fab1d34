//! Turning layout changes into repaint rects, and painting the frame.

use super::FrameView;
use crate::document::Document;
use crate::paint_session::{PaintChunk, PaintSession};
use core::mem;
use layouter::{LayoutRect, PaintInvalidation};
use lifecycle::LifecycleState;
use log::{error, trace};
use smallvec::SmallVec;
use tracing::info_span;

impl FrameView {
    /// Repaint what the last layout moved, or the whole frame when a full
    /// invalidation was requested. Consumes the full-invalidation flag.
    pub(crate) fn invalidate_tree(document: &mut Document) {
        let _span = info_span!("frame_view.paint_invalidation").entered();
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        let full = mem::take(&mut view.paint.do_full_invalidation);
        let scroll = view.scroll_offset;
        let layout_size = view.layout_size();
        let frame_size = view.frame_size;
        let invalidations = document
            .layout_tree
            .collect_paint_invalidations(full, scroll);
        let counters = &mut document.counters;
        counters.paint_invalidation_passes = counters.paint_invalidation_passes.saturating_add(1);

        let host = document.clients.host();
        if full {
            counters.full_paint_invalidations = counters.full_paint_invalidations.saturating_add(1);
            counters.invalidation_rects = counters.invalidation_rects.saturating_add(1);
            trace!("full paint invalidation of {:?}", view.id);
            if let Some(host) = host {
                host.invalidate_contents_and_root_view(LayoutRect::new(
                    0,
                    0,
                    frame_size.width,
                    frame_size.height,
                ));
            }
            return;
        }

        let viewport = LayoutRect::new(0, 0, layout_size.width, layout_size.height);
        let rects = repaint_rects(&invalidations, &viewport);
        counters.invalidation_rects = counters
            .invalidation_rects
            .saturating_add(rects.len() as u64);
        if let Some(host) = host {
            for rect in rects {
                host.invalidate_contents_and_root_view(rect);
            }
        }
    }

    /// Repaint the whole view on the next pass and every composited layer
    /// now, as after a stylesheet change that may have restyled everything.
    pub(crate) fn invalidate_paint_for_view_and_composited_layers(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        view.paint.do_full_invalidation = true;
        let layout_size = view.layout_size();
        let viewport = LayoutRect::new(0, 0, layout_size.width, layout_size.height);
        let scroll = view.scroll_offset;
        let layer_rects: Vec<LayoutRect> = view
            .composited_layers
            .iter()
            .map(|(_, rect)| rect.translated(-scroll).intersection(&viewport))
            .filter(|rect| !rect.is_empty())
            .collect();
        if let Some(host) = document.clients.host() {
            for rect in layer_rects {
                host.invalidate_contents_and_root_view(rect);
            }
        }
        document.schedule_animation();
    }

    /// Paint the frame into chunks in paint order, in viewport coordinates.
    /// Only valid once the lifecycle reached `PaintInvalidationClean`.
    pub fn paint(document: &mut Document, session: &PaintSession) -> Vec<PaintChunk> {
        let state = document.lifecycle.state();
        debug_assert_eq!(
            state,
            LifecycleState::PaintInvalidationClean,
            "paint outside PaintInvalidationClean"
        );
        if state != LifecycleState::PaintInvalidationClean {
            error!("paint refused in {state:?}");
            return Vec::new();
        }
        let Some(view) = document.frame_view.as_mut() else {
            return Vec::new();
        };
        let _span = info_span!("frame_view.paint").entered();
        let _paint = session.enter_paint();
        view.surface.is_painting = true;

        let tree = &document.layout_tree;
        let layout_size = view.layout_size();
        let viewport = LayoutRect::new(0, 0, layout_size.width, layout_size.height);
        let root = tree.view();
        let view_background = tree
            .object(root)
            .map(|object| object.style().background_color)
            .filter(|color| color.is_opaque())
            .unwrap_or(view.base_background);
        let mut chunks = vec![PaintChunk {
            object: root,
            rect: viewport,
            background: view_background,
        }];
        for id in tree.descendants(root).skip(1) {
            let Some(object) = tree.object(id) else {
                continue;
            };
            let rect = tree
                .visual_rect_in_viewport(id, view.scroll_offset)
                .intersection(&viewport);
            if rect.is_empty() {
                continue;
            }
            chunks.push(PaintChunk {
                object: id,
                rect,
                background: object.style().background_color,
            });
        }
        view.surface.is_painting = false;
        trace!("painted {} chunks at {}", chunks.len(), session.current_frame_timestamp());
        chunks
    }
}

/// Old and new rects of every invalidation, clipped to the viewport, with
/// empty and unchanged rects dropped.
fn repaint_rects(
    invalidations: &[PaintInvalidation],
    viewport: &LayoutRect,
) -> SmallVec<LayoutRect, 8> {
    let mut rects = SmallVec::new();
    for invalidation in invalidations {
        let new = invalidation.new.intersection(viewport);
        let old = invalidation.old.map(|rect| rect.intersection(viewport));
        if let Some(old) = old
            && old != new
            && !old.is_empty()
        {
            rects.push(old);
        }
        if !new.is_empty() {
            rects.push(new);
        }
    }
    rects
}
