//! DOM events fired by the pipeline: focus changes, scroll, resize and load.
//!
//! Listeners are plain closures that receive the document, so a handler can
//! run "script" that reenters the pipeline. Dispatch clones the listener list
//! of each target before calling into it, which keeps the registry free to
//! change while handlers run.

use crate::document::Document;
use core::mem;
use html::{DOM, NodeId};
use smallvec::SmallVec;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Blur,
    FocusOut,
    DomFocusOut,
    Focus,
    FocusIn,
    DomFocusIn,
    Scroll,
    Resize,
    Load,
    Custom(String),
}

impl EventType {
    /// `blur`, `focus`, `load` and `resize` stay on their target.
    pub const fn bubbles(&self) -> bool {
        !matches!(self, Self::Blur | Self::Focus | Self::Load | Self::Resize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub target: EventTarget,
    /// The element losing or gaining focus on the other side of a focus change.
    pub related_target: Option<NodeId>,
    pub bubbles: bool,
}

impl Event {
    pub fn new(event_type: EventType, target: EventTarget) -> Self {
        let bubbles = event_type.bubbles();
        Self {
            event_type,
            target,
            related_target: None,
            bubbles,
        }
    }

    #[must_use]
    pub const fn with_related_target(mut self, related: Option<NodeId>) -> Self {
        self.related_target = related;
        self
    }
}

pub type Listener = Rc<dyn Fn(&mut Document, &Event)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    target: EventTarget,
    event_type: EventType,
    listener: Listener,
}

#[derive(Default)]
pub struct EventListeners {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl EventListeners {
    pub fn add(&mut self, target: EventTarget, event_type: EventType, listener: Listener) -> ListenerId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = ListenerId(self.next_id);
        self.registrations.push(Registration {
            id,
            target,
            event_type,
            listener,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        self.registrations.len() != before
    }

    /// Drop every listener registered on a node leaving the document.
    pub fn remove_for_node(&mut self, node: NodeId) {
        self.registrations
            .retain(|registration| registration.target != EventTarget::Node(node));
    }

    pub fn listeners_for(&self, target: EventTarget, event_type: &EventType) -> Vec<Listener> {
        self.registrations
            .iter()
            .filter(|registration| {
                registration.target == target && registration.event_type == *event_type
            })
            .map(|registration| Rc::clone(&registration.listener))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Targets an event visits: the target itself, then its element ancestors
/// and the document when it bubbles.
pub fn propagation_path(dom: &DOM, event: &Event) -> SmallVec<EventTarget, 16> {
    let mut path = SmallVec::new();
    path.push(event.target);
    if !event.bubbles {
        return path;
    }
    if let EventTarget::Node(node) = event.target {
        for ancestor in dom.ancestors(node) {
            if dom.is_element(ancestor) {
                path.push(EventTarget::Node(ancestor));
            }
        }
        path.push(EventTarget::Document);
    }
    path
}

/// Events waiting for the next pump, such as scroll and resize. An event
/// already queued is not queued twice.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    pub fn enqueue(&mut self, event: Event) -> bool {
        if self.events.contains(&event) {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn take(&mut self) -> Vec<Event> {
        mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::DomError;
    use lifecycle::{DocumentLifecycle, LifecycleState};

    /// Bubbling events climb through elements to the document; others stay put.
    ///
    /// # Errors
    /// Returns an error if the tree cannot be built.
    ///
    /// # Panics
    /// Panics if a path is wrong.
    #[test]
    fn propagation_paths() -> Result<(), DomError> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        let mut dom = DOM::new(lifecycle);
        let html = dom.create_element("html");
        let button = dom.create_element("button");
        dom.append_child(dom.root(), html)?;
        dom.append_child(html, button)?;

        let focus_in = Event::new(EventType::FocusIn, EventTarget::Node(button));
        let path = propagation_path(&dom, &focus_in);
        assert_eq!(
            path.as_slice(),
            &[
                EventTarget::Node(button),
                EventTarget::Node(html),
                EventTarget::Document
            ]
        );

        let focus = Event::new(EventType::Focus, EventTarget::Node(button));
        assert_eq!(propagation_path(&dom, &focus).as_slice(), &[EventTarget::Node(button)]);
        Ok(())
    }

    /// A second identical scroll event is coalesced.
    ///
    /// # Panics
    /// Panics if the duplicate is queued.
    #[test]
    fn queue_coalesces_duplicates() {
        let mut queue = EventQueue::default();
        assert!(queue.enqueue(Event::new(EventType::Scroll, EventTarget::Document)));
        assert!(!queue.enqueue(Event::new(EventType::Scroll, EventTarget::Document)));
        assert!(queue.enqueue(Event::new(EventType::Resize, EventTarget::Document)));
        assert_eq!(queue.take().len(), 2);
        assert!(queue.is_empty());
    }
}
