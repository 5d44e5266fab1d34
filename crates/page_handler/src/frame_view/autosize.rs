//! Sizing the frame to its content between configured bounds.

use super::{FrameView, ScrollbarMode};
use crate::document::Document;
use layouter::IntSize;
use log::{debug, trace};
use tracing::info_span;

/// Measurement passes per autosize. A second pass picks up the change in
/// available width caused by scrollbars appearing or vanishing.
const MAX_AUTOSIZE_ITERATIONS: usize = 2;

impl FrameView {
    /// Whether the frame sizes itself to its content.
    #[inline]
    pub const fn is_autosize_enabled(&self) -> bool {
        self.autosize.enabled
    }

    /// Enable or disable autosizing between `min` and `max`, forgetting any
    /// size already chosen.
    pub fn enable_auto_size_mode(
        document: &mut Document,
        enabled: bool,
        min: IntSize,
        max: IntSize,
    ) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        debug_assert!(
            !enabled || (min.width <= max.width && min.height <= max.height),
            "autosize bounds inverted"
        );
        if view.autosize.enabled == enabled && view.autosize.min == min && view.autosize.max == max
        {
            return;
        }
        view.autosize.enabled = enabled;
        view.autosize.min = min;
        view.autosize.max = max;
        view.autosize.did_run = false;
        view.layout.pending = false;
        debug!("autosize of {:?} {}", view.id, if enabled { "on" } else { "off" });
        let root = document.layout_tree.view();
        if document.lifecycle.state_allows_layout_invalidation() {
            document.layout_tree.set_needs_layout(root);
            Self::process_relayout_requests(document);
        }
    }

    /// Measure the content and resize the frame to fit it, within bounds.
    /// Runs from inside layout; the in-progress flag stops the layouts it
    /// triggers from autosizing again.
    pub(crate) fn auto_size_if_enabled(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if !view.autosize.enabled || view.autosize.in_progress {
            return;
        }
        if !document.lifecycle.is_active() || document.dom.document_element().is_none() {
            return;
        }
        let id = view.id;
        let _span = info_span!("frame_view.autosize").entered();
        view.autosize.in_progress = true;

        if !view.autosize.did_run {
            // Start narrow so the content reports its natural width.
            let size = IntSize::new(view.frame_size.width, view.autosize.min.height);
            Self::resize(document, size);
        }
        Self::measure_and_resize(document);

        if let Some(current) = Self::view_mut(document, id) {
            current.autosize.in_progress = false;
            current.autosize.did_run = true;
        }
    }

    fn measure_and_resize(document: &mut Document) {
        let Some((id, mut size)) = document
            .frame_view
            .as_ref()
            .map(|initial| (initial.id, initial.frame_size))
        else {
            return;
        };
        for iteration in 0..MAX_AUTOSIZE_ITERATIONS {
            document.update_style_and_layout_ignore_pending_stylesheets(false);
            let Some(view) = document
                .frame_view
                .as_ref()
                .filter(|candidate| candidate.id == id)
            else {
                return;
            };
            document.counters.autosize_measurement_passes = document
                .counters
                .autosize_measurement_passes
                .saturating_add(1);

            let (min, max, space) = (view.autosize.min, view.autosize.max, view.scrollbars.space);
            let did_run = view.autosize.did_run;
            let tree = &document.layout_tree;
            let Some(html_object) = document
                .dom
                .document_element()
                .and_then(|html| tree.object_for_node(html))
            else {
                return;
            };
            let mut width = tree.min_preferred_width(tree.view());
            let mut height = tree.scroll_height(html_object);
            // Room for the scrollbar the other axis will need.
            if width > max.width {
                height += space;
            } else if height > max.height {
                width += space;
            }
            let mut new_size = IntSize::new(width.max(min.width), height.max(min.height));
            let horizontal = if new_size.width > max.width {
                new_size.width = max.width;
                ScrollbarMode::AlwaysOn
            } else {
                ScrollbarMode::AlwaysOff
            };
            let vertical = if new_size.height > max.height {
                new_size.height = max.height;
                ScrollbarMode::AlwaysOn
            } else {
                ScrollbarMode::AlwaysOff
            };
            trace!("autosize pass {iteration} measured {width}x{height}, chose {new_size:?}");
            if new_size == size {
                Self::set_scrollbar_modes(document, horizontal, vertical);
                continue;
            }
            // Once laid out at a size within bounds, do not shrink until the
            // load completes, so content loading in does not make it jitter.
            let within_max = size.width <= max.width && size.height <= max.height;
            if did_run
                && within_max
                && !document.load_event_finished
                && (new_size.width < size.width || new_size.height < size.height)
            {
                break;
            }
            size = new_size;
            Self::resize(document, new_size);
            Self::set_scrollbar_modes(document, horizontal, vertical);
        }
    }
}
