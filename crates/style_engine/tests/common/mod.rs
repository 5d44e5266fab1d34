use html::{DOM, DOMSubscriber as _, DomError, NodeId};
use lifecycle::{DocumentLifecycle, LifecycleState};
use std::rc::Rc;
use style_engine::StyleEngine;

pub fn init_logging() {
    drop(env_logger::builder().is_test(true).try_init());
}

/// An active document tree: `<html><body><div class=card><span id=label>`.
pub struct Fixture {
    pub dom: DOM,
    pub body: NodeId,
    pub card: NodeId,
    pub label: NodeId,
}

pub fn fixture() -> Result<Fixture, DomError> {
    let lifecycle = Rc::new(DocumentLifecycle::new());
    assert!(lifecycle.advance_to(LifecycleState::Inactive));
    assert!(lifecycle.advance_to(LifecycleState::StyleClean));
    let mut dom = DOM::new(lifecycle);
    let html = dom.create_element("html");
    let body = dom.create_element("body");
    let card = dom.create_element("div");
    let label = dom.create_element("span");
    dom.append_child(dom.root(), html)?;
    dom.append_child(html, body)?;
    dom.append_child(body, card)?;
    dom.append_child(card, label)?;
    dom.set_attribute(card, "class", "card")?;
    dom.set_attribute(label, "id", "label")?;
    for node in dom.descendants(dom.root()).collect::<Vec<_>>() {
        dom.clear_needs_style_recalc(node);
        dom.clear_child_needs_style_recalc(node);
    }
    drop(dom.take_updates());
    Ok(Fixture {
        dom,
        body,
        card,
        label,
    })
}

/// Forward recorded DOM updates to the engine, as the document does.
pub fn flush_updates(dom: &mut DOM, engine: &mut StyleEngine) {
    for update in dom.take_updates() {
        engine.apply_update(dom, &update);
    }
}
