//! Seams to the collaborators outside the pipeline: the host window that
//! owns the pixels, the accessibility cache and the embedding application.
//!
//! Every collaborator is optional. A missing peer means "do nothing", never
//! an error, and none of them is handed the document, so a notification can
//! not reenter the pipeline.

use crate::frame_view::{AnnotatedRegion, FrameViewId};
use html::NodeId;
use layouter::{IntSize, LayoutRect};
use std::rc::Rc;

/// The window or compositor the frame draws into.
pub trait HostWindow {
    /// Repaint `rect`, given in root view coordinates.
    fn invalidate_contents_and_root_view(&self, rect: LayoutRect);

    /// Blit the pixels of `rect_to_scroll` by `delta`, clipped to `clip`.
    fn scroll(&self, delta: IntSize, rect_to_scroll: LayoutRect, clip: LayoutRect);

    /// Ask for a visual update pump on the next animation frame.
    fn schedule_animation(&self);

    /// Whether the backing surface can be blit-scrolled at all.
    fn can_blit_on_scroll(&self) -> bool {
        true
    }
}

/// Accessibility notification sink.
pub trait AxObjectCache {
    fn handle_layout_complete(&self, _frame: FrameViewId) {}

    fn handle_scroll_position_changed(&self, _frame: FrameViewId) {}

    fn handle_focused_ui_element_changed(&self, _old: Option<NodeId>, _new: Option<NodeId>) {}

    fn handle_scrolled_to_anchor(&self, _anchor: NodeId) {}
}

/// The embedding application: synchronous queries and one-way notifications.
pub trait EmbedderClient {
    /// Physical view size, when the embedder knows it.
    fn view_size(&self) -> Option<IntSize> {
        None
    }

    /// Whether the page has input focus. Focus events only fire while it does.
    fn has_focus(&self) -> bool {
        true
    }

    fn did_first_layout(&self) {}

    fn did_first_visually_non_empty_layout(&self) {}

    fn contents_size_changed(&self, _size: IntSize) {}

    fn focused_node_changed(&self, _node: Option<NodeId>) {}

    fn annotated_regions_changed(&self, _regions: &[AnnotatedRegion]) {}

    fn title_changed(&self, _title: &str) {}
}

/// The collaborators a document talks to.
#[derive(Clone, Default)]
pub struct PageClients {
    pub host: Option<Rc<dyn HostWindow>>,
    pub ax_cache: Option<Rc<dyn AxObjectCache>>,
    pub embedder: Option<Rc<dyn EmbedderClient>>,
}

impl PageClients {
    #[inline]
    pub fn host(&self) -> Option<&dyn HostWindow> {
        self.host.as_deref()
    }

    #[inline]
    pub fn ax_cache(&self) -> Option<&dyn AxObjectCache> {
        self.ax_cache.as_deref()
    }

    #[inline]
    pub fn embedder(&self) -> Option<&dyn EmbedderClient> {
        self.embedder.as_deref()
    }

    /// Page focus as reported by the embedder; a page without one is focused.
    pub fn page_has_focus(&self) -> bool {
        self.embedder().is_none_or(EmbedderClient::has_focus)
    }
}
