//! Embedded widgets (plugins and child frames) hosted by the view.
//!
//! Widgets are told their geometry after layout and get a deferred update
//! once they are attached. Both callbacks may run script, so every call is
//! followed by a liveness check on the view.

use super::FrameView;
use crate::document::Document;
use crate::tasks::{Task, TimerKind};
use core::mem;
use html::NodeId;
use layouter::{IntSize, LayoutId, LayoutRect};
use log::{debug, trace};
use std::rc::Rc;
use tracing::info_span;

/// Timer firings retry the update set at most this many times.
const MAX_UPDATE_WIDGETS_ITERATIONS: usize = 2;

/// The embedder side of widget hosting. Both calls may reenter the document.
pub trait WidgetClient {
    /// The widget owned by `owner` was attached and should load or refresh.
    fn update_widget(&self, _document: &mut Document, _owner: NodeId) {}

    /// The widget owned by `owner` now occupies `rect`, in document coordinates.
    fn set_frame_rect(&self, _document: &mut Document, _owner: NodeId, _rect: LayoutRect) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetEntry {
    pub object: LayoutId,
    pub owner: NodeId,
    /// Last rect reported through [`WidgetClient::set_frame_rect`].
    pub frame_rect: Option<LayoutRect>,
}

impl FrameView {
    pub fn widgets(&self) -> &[WidgetEntry] {
        &self.widgets
    }

    pub(crate) fn add_widget(&mut self, object: LayoutId, owner: NodeId) {
        if self.widgets.iter().any(|entry| entry.object == object) {
            return;
        }
        trace!("widget {object:?} for {owner:?} registered");
        self.widgets.push(WidgetEntry {
            object,
            owner,
            frame_rect: None,
        });
        if !self.widget_update_set.contains(&owner) {
            self.widget_update_set.push(owner);
        }
    }

    pub(crate) fn remove_widget(&mut self, object: LayoutId, owner: NodeId) {
        self.widgets.retain(|entry| entry.object != object);
        self.widget_update_set.retain(|pending| *pending != owner);
    }

    /// Report changed widget rects and resize child frames. Returns false if
    /// the view was detached by a callback.
    pub(crate) fn update_widget_positions(document: &mut Document) -> bool {
        let Some(view) = document.frame_view.as_ref() else {
            return false;
        };
        let id = view.id;
        let objects: Vec<LayoutId> = view.widgets.iter().map(|entry| entry.object).collect();
        for object in objects {
            if !Self::update_widget_position(document, object) {
                return false;
            }
        }
        if !Self::is_alive(document, id) {
            return false;
        }
        Self::update_child_frames(document);
        true
    }

    /// Returns false if the view was detached by the callback.
    fn update_widget_position(document: &mut Document, object: LayoutId) -> bool {
        let Some(view) = document.frame_view.as_mut() else {
            return false;
        };
        let id = view.id;
        if !document.layout_tree.is_attached(object) {
            return true;
        }
        let rect = document.layout_tree.absolute_rect(object, view.scroll_offset);
        let Some(entry) = view.widgets.iter_mut().find(|entry| entry.object == object) else {
            return true;
        };
        if entry.frame_rect == Some(rect) {
            return true;
        }
        entry.frame_rect = Some(rect);
        let owner = entry.owner;
        trace!("widget {owner:?} moved to {rect:?}");
        if let Some(client) = document.widget_client.as_ref().map(Rc::clone) {
            client.set_frame_rect(document, owner, rect);
        }
        Self::is_alive(document, id)
    }

    /// Size child frames to their owner boxes and flag those overlapping a sibling.
    fn update_child_frames(document: &mut Document) {
        let scroll = document
            .frame_view
            .as_ref()
            .map_or(IntSize::ZERO, |view| view.scroll_offset);
        let tree = &document.layout_tree;
        let rects: Vec<Option<LayoutRect>> = document
            .child_frames
            .iter()
            .map(|child| {
                tree.object_for_node(child.owner)
                    .map(|object| tree.absolute_rect(object, scroll))
            })
            .collect();
        for (index, (child, rect)) in document
            .child_frames
            .iter_mut()
            .zip(rects.iter().copied())
            .enumerate()
        {
            let Some(rect) = rect else {
                continue;
            };
            let overlapped = rects.iter().enumerate().any(|(other, other_rect)| {
                other != index && other_rect.is_some_and(|candidate| candidate.intersects(&rect))
            });
            Self::resize(&mut child.document, rect.size());
            if let Some(child_view) = child.document.frame_view.as_mut() {
                child_view.surface.is_overlapped = overlapped;
            }
        }
    }

    /// Run pending widget updates once. Returns true when nothing is left.
    pub(crate) fn update_widgets(document: &mut Document) -> bool {
        let Some(view) = document.frame_view.as_mut() else {
            return true;
        };
        if view.nested_layout_count > 1 || view.widget_update_set.is_empty() {
            return true;
        }
        let id = view.id;
        let owners = mem::take(&mut view.widget_update_set);
        let client = document.widget_client.as_ref().map(Rc::clone);
        for owner in owners {
            let Some(object) = document.layout_tree.object_for_node(owner) else {
                continue;
            };
            if let Some(client) = &client {
                client.update_widget(document, owner);
                if !Self::is_alive(document, id) {
                    return true;
                }
            }
            if !Self::update_widget_position(document, object) {
                return true;
            }
            // A widget that re-queued itself while updating waits for the next timer.
            if let Some(current) = document.frame_view.as_mut() {
                current.widget_update_set.retain(|pending| *pending != owner);
            }
        }
        document
            .frame_view
            .as_ref()
            .is_none_or(|view| view.widget_update_set.is_empty())
    }

    pub(crate) fn schedule_update_widgets_if_necessary(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        debug_assert!(!view.layout.in_perform_layout, "widget update scheduled during layout");
        if view.update_widgets_timer.is_active() || view.widget_update_set.is_empty() {
            return;
        }
        let generation = view.update_widgets_timer.start();
        let kind = TimerKind::UpdateWidgets(view.id);
        document.tasks.post(Task::Timer { kind, generation });
    }

    pub(crate) fn update_widgets_timer_fired(document: &mut Document, generation: u64) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        if view.update_widgets_timer.fire(generation) {
            Self::run_widget_updates(document);
        }
    }

    /// Run widget updates now instead of waiting for the timer.
    pub(crate) fn flush_widget_updates(document: &mut Document) {
        let Some(view) = document.frame_view.as_mut() else {
            return;
        };
        view.update_widgets_timer.stop();
        Self::run_widget_updates(document);
    }

    fn run_widget_updates(document: &mut Document) {
        let _span = info_span!("frame_view.update_widgets").entered();
        for iteration in 0..MAX_UPDATE_WIDGETS_ITERATIONS {
            if Self::update_widgets(document) {
                return;
            }
            debug!("widget update set still dirty after iteration {iteration}");
        }
    }
}
