//! Focus changes and sequential focus navigation.
//!
//! A focus change dispatches `blur`, `focusout` and `DOMFocusOut` on the old
//! element, then `focus`, `focusin` and `DOMFocusIn` on the new one. Any of
//! these handlers may move focus again. After each dispatch the change
//! checks that focus is still where it expects; if script moved it, the rest
//! of the sequence is abandoned and the change reports itself blocked.

use super::Document;
use crate::events::{Event, EventTarget, EventType};
use crate::tasks::{Task, TimerKind};
use html::{NodeId, StyleChangeType};
use log::{debug, trace};
use tracing::info_span;

/// Elements focusable without a `tabindex`.
const NATIVELY_FOCUSABLE: [&str; 6] = ["a", "button", "input", "select", "textarea", "iframe"];
/// Elements the `disabled` attribute takes out of the focus order.
const DISABLEABLE: [&str; 4] = ["button", "input", "select", "textarea"];

impl Document {
    #[inline]
    pub const fn focused_element(&self) -> Option<NodeId> {
        self.focused
    }

    /// Whether `node` can take focus: a rendered, visible element that is
    /// natively focusable or has a tab index, and is not disabled.
    pub fn is_focusable(&self, node: NodeId) -> bool {
        if !self.dom.is_connected(node) {
            return false;
        }
        let Some(tag) = self.dom.tag(node) else {
            return false;
        };
        let rendered_visible = self
            .layout_tree
            .object_for_node(node)
            .and_then(|object| self.layout_tree.object(object))
            .is_some_and(|object| object.style().is_visible());
        if !rendered_visible {
            return false;
        }
        if DISABLEABLE.contains(&tag) && self.dom.attribute(node, "disabled").is_some() {
            return false;
        }
        let natively_focusable = NATIVELY_FOCUSABLE.contains(&tag)
            && (tag != "a" || self.dom.attribute(node, "href").is_some());
        natively_focusable || self.dom.tab_index(node).is_some()
    }

    /// Move focus to `new_focus`, or clear it with `None`. Returns false if
    /// an event handler moved focus elsewhere during the change, in which
    /// case the handler's choice stands.
    pub fn set_focused_element(&mut self, mut new_focus: Option<NodeId>) -> bool {
        if self.focused == new_focus {
            return true;
        }
        let _span = info_span!("document.set_focused_element").entered();
        let mut blocked = false;
        let old_focus = self.focused.take();
        let page_has_focus = self.clients.page_has_focus();

        if let Some(old) = old_focus {
            self.mark_focus_style_dirty(old);
            if page_has_focus {
                self.dispatch_focus_event(EventType::Blur, old, new_focus);
                if self.focused.is_some() {
                    trace!("blur handler moved focus");
                    blocked = true;
                    new_focus = None;
                }
                self.dispatch_focus_event(EventType::FocusOut, old, new_focus);
                self.dispatch_focus_event(EventType::DomFocusOut, old, new_focus);
                if self.focused.is_some() {
                    trace!("focusout handler moved focus");
                    blocked = true;
                    new_focus = None;
                }
            }
        }

        if let Some(target) = new_focus {
            self.update_style_and_layout_tree();
            if self.is_focusable(target)
                && !self.focus_new_element(target, old_focus, page_has_focus)
            {
                blocked = true;
            }
        }

        if !blocked {
            if let Some(ax_cache) = self.clients.ax_cache()
                && self.focused.is_some()
            {
                ax_cache.handle_focused_ui_element_changed(old_focus, self.focused);
            }
            if let Some(embedder) = self.clients.embedder() {
                embedder.focused_node_changed(self.focused);
            }
        }
        self.schedule_layout_tree_update_if_needed();
        debug!("focus now {:?}, blocked: {blocked}", self.focused);
        !blocked
    }

    /// Give focus to `target` and fire its focus events. Returns false if a
    /// handler moved focus away.
    fn focus_new_element(
        &mut self,
        target: NodeId,
        old_focus: Option<NodeId>,
        page_has_focus: bool,
    ) -> bool {
        self.focused = Some(target);
        self.mark_focus_style_dirty(target);
        if !page_has_focus {
            return true;
        }
        for event_type in [EventType::Focus, EventType::FocusIn, EventType::DomFocusIn] {
            self.dispatch_focus_event(event_type, target, old_focus);
            if self.focused != Some(target) {
                trace!("focus handler moved focus away from {target:?}");
                return false;
            }
        }
        true
    }

    fn dispatch_focus_event(
        &mut self,
        event_type: EventType,
        target: NodeId,
        related: Option<NodeId>,
    ) {
        let event = Event::new(event_type, EventTarget::Node(target)).with_related_target(related);
        self.dispatch_event(&event);
    }

    /// `:focus` styles depend on the focused element.
    fn mark_focus_style_dirty(&mut self, node: NodeId) {
        if self.dom.is_connected(node) {
            self.dom
                .set_needs_style_recalc(node, StyleChangeType::LocalStyleChange);
        }
    }

    /// The focused element left the document. Its listeners are gone, so
    /// focus is cleared without events.
    pub(crate) fn focused_element_removed(&mut self) {
        let old = self.focused.take();
        self.clear_focused_element_timer.stop();
        if let Some(ax_cache) = self.clients.ax_cache() {
            ax_cache.handle_focused_ui_element_changed(old, None);
        }
        if let Some(embedder) = self.clients.embedder() {
            embedder.focused_node_changed(None);
        }
    }

    /// After a recalc, a focused element that stopped being focusable (for
    /// instance `visibility: hidden`) loses focus on a later task.
    pub(crate) fn clear_focused_element_if_unfocusable(&mut self) {
        let Some(focused) = self.focused else {
            return;
        };
        if self.is_focusable(focused) || self.clear_focused_element_timer.is_active() {
            return;
        }
        let generation = self.clear_focused_element_timer.start();
        trace!("{focused:?} no longer focusable; clearing focus soon");
        self.tasks.post(Task::Timer {
            kind: TimerKind::ClearFocusedElement,
            generation,
        });
        self.schedule_animation();
    }

    pub(crate) fn clear_focused_element_timer_fired(&mut self, generation: u64) {
        if !self.clear_focused_element_timer.fire(generation) {
            return;
        }
        if self.focused.is_some_and(|focused| !self.is_focusable(focused)) {
            self.set_focused_element(None);
        }
    }

    /// Focusable elements in sequential navigation order: positive tab
    /// indices ascending, then tab index zero and native controls in tree
    /// order. Negative tab indices are skipped.
    pub fn focus_order(&self) -> Vec<NodeId> {
        let mut positive: Vec<(i32, NodeId)> = Vec::new();
        let mut rest = Vec::new();
        for element in self.dom.elements() {
            if !self.is_focusable(element) {
                continue;
            }
            match self.dom.tab_index(element) {
                Some(index) if index < 0 => {}
                Some(index) if index > 0 => positive.push((index, element)),
                _ => rest.push(element),
            }
        }
        // Stable, so equal indices keep tree order.
        positive.sort_by_key(|(index, _)| *index);
        positive
            .into_iter()
            .map(|(_, element)| element)
            .chain(rest)
            .collect()
    }

    /// Focus the element after the focused one in navigation order, or the
    /// first when nothing is focused. Returns false at the end of the order.
    pub fn focus_next(&mut self) -> bool {
        self.update_style_and_layout_tree();
        let order = self.focus_order();
        let position = self
            .focused
            .and_then(|focused| order.iter().position(|node| *node == focused));
        let next = position.map_or_else(
            || order.first().copied(),
            |current| order.get(current + 1).copied(),
        );
        next.is_some_and(|target| self.set_focused_element(Some(target)))
    }

    /// Focus the element before the focused one, or the last when nothing
    /// is focused. Returns false at the start of the order.
    pub fn focus_previous(&mut self) -> bool {
        self.update_style_and_layout_tree();
        let order = self.focus_order();
        let position = self
            .focused
            .and_then(|focused| order.iter().position(|node| *node == focused));
        let previous = position.map_or_else(
            || order.last().copied(),
            |current| current.checked_sub(1).and_then(|index| order.get(index).copied()),
        );
        previous.is_some_and(|target| self.set_focused_element(Some(target)))
    }
}
