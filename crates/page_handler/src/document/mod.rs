//! The document: pipeline entry point and mutation scheduler.
//!
//! A [`Document`] owns the DOM, the style engine, the layout tree and its
//! [`FrameView`]. Mutations go through the document so the style engine and
//! layout tree hear about them, and so a visual update gets scheduled. The
//! host drives updates by calling [`Document::pump`] once per animation frame.

mod focus;
mod layout_update;
mod style_update;
mod write;

pub use write::ScriptHandler;
use style_update::ChildRebuilds;

use crate::config::FrameConfig;
use crate::events::{
    Event, EventListeners, EventQueue, EventTarget, EventType, Listener, ListenerId,
    propagation_path,
};
use crate::frame_view::{FrameView, FrameViewId, WidgetClient};
use crate::host::{EmbedderClient, PageClients};
use crate::tasks::{OneShotTimer, Task, TaskQueue, TimerKind};
use crate::telemetry::{PerfCounters, maybe_emit, perf_counters_json};
use core::mem;
use html::{DOM, DOMSubscriber as _, DOMUpdate, DocumentParser, DomError, NodeId, StyleChangeType};
use layouter::{LayoutTree, TextAutosizer};
use lifecycle::{DetachScope, DocumentLifecycle, LifecycleState};
use log::{debug, error, trace};
use std::rc::Rc;
use style_engine::{StyleContext, StyleEngine, StyleResolver};
use tracing::info_span;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// Whether the document was laid out while render-blocking sheets were
/// still loading, which owes a full repaint once they arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingSheetLayout {
    #[default]
    NoLayoutWithPendingSheets,
    DidLayoutWithPendingSheets,
    IgnoreLayoutWithPendingSheets,
}

/// Runs once at the next pump with the frame timestamp.
pub type AnimationCallback = Box<dyn FnOnce(&mut Document, f64)>;

/// A subframe: its document is sized to the box of the owner element.
pub struct ChildFrame {
    pub owner: NodeId,
    pub document: Document,
}

#[derive(Debug, Default, Clone, Copy)]
struct WriteState {
    depth: u32,
    too_deep: bool,
}

pub struct Document {
    pub(crate) config: FrameConfig,
    pub(crate) lifecycle: Rc<DocumentLifecycle>,
    pub(crate) dom: DOM,
    pub(crate) styles: StyleEngine,
    pub(crate) layout_tree: LayoutTree,
    pub(crate) autosizer: TextAutosizer,
    pub(crate) frame_view: Option<FrameView>,
    /// Id of the last frame view this document created.
    last_frame_view_id: FrameViewId,
    pub(crate) clients: PageClients,
    pub(crate) widget_client: Option<Rc<dyn WidgetClient>>,
    pub(crate) child_frames: Vec<ChildFrame>,
    pub(crate) counters: PerfCounters,
    pub(crate) tasks: TaskQueue,
    pub(crate) event_queue: EventQueue,
    listeners: EventListeners,
    animation_callbacks: Vec<AnimationCallback>,
    /// DOM parents whose layout children must be rebuilt at the next recalc.
    pending_child_rebuilds: ChildRebuilds,
    focused: Option<NodeId>,
    clear_focused_element_timer: OneShotTimer,
    ready_state: ReadyState,
    pub(crate) load_event_finished: bool,
    pub(crate) pending_sheet_layout: PendingSheetLayout,
    /// Fragment to scroll to once render-blocking sheets have loaded.
    pub(crate) goto_anchor_needed: Option<String>,
    parser: Option<Rc<DocumentParser>>,
    script_handler: Option<ScriptHandler>,
    write_state: WriteState,
    rendering_throttled: bool,
    title: String,
}

impl Document {
    /// A new, inactive document using the default style resolver.
    pub fn new(config: FrameConfig, clients: PageClients) -> Self {
        Self::with_styles(config, clients, StyleEngine::default())
    }

    pub fn with_resolver(
        config: FrameConfig,
        clients: PageClients,
        resolver: Box<dyn StyleResolver>,
    ) -> Self {
        Self::with_styles(config, clients, StyleEngine::new(resolver))
    }

    fn with_styles(config: FrameConfig, clients: PageClients, styles: StyleEngine) -> Self {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        lifecycle.advance_to(LifecycleState::Inactive);
        let dom = DOM::new(Rc::clone(&lifecycle));
        let mut layout_tree = LayoutTree::new(Rc::clone(&lifecycle));
        layout_tree.set_glyph_advance_ratio(config.glyph_advance_ratio);
        let autosizer = if config.text_autosizing_enabled {
            TextAutosizer::new(
                config.text_autosizing_device_width,
                config.text_autosizing_max_multiplier,
            )
        } else {
            TextAutosizer::disabled()
        };
        Self {
            config,
            lifecycle,
            dom,
            styles,
            layout_tree,
            autosizer,
            frame_view: None,
            last_frame_view_id: FrameViewId::default(),
            clients,
            widget_client: None,
            child_frames: Vec::new(),
            counters: PerfCounters::default(),
            tasks: TaskQueue::default(),
            event_queue: EventQueue::default(),
            listeners: EventListeners::default(),
            animation_callbacks: Vec::new(),
            pending_child_rebuilds: ChildRebuilds::default(),
            focused: None,
            clear_focused_element_timer: OneShotTimer::default(),
            ready_state: ReadyState::Loading,
            load_event_finished: false,
            pending_sheet_layout: PendingSheetLayout::default(),
            goto_anchor_needed: None,
            parser: None,
            script_handler: None,
            write_state: WriteState::default(),
            rendering_throttled: false,
            title: String::new(),
        }
    }

    /// Give the document a frame view and start rendering it.
    pub fn attach(&mut self) {
        if self.lifecycle.state() != LifecycleState::Inactive {
            debug!("attach ignored in {:?}", self.lifecycle.state());
            return;
        }
        let _span = info_span!("document.attach").entered();
        self.last_frame_view_id = self.last_frame_view_id.next();
        self.frame_view = Some(FrameView::new(&self.config, self.last_frame_view_id));
        self.lifecycle.advance_to(LifecycleState::StyleClean);
        if let Some(size) = self.clients.embedder().and_then(EmbedderClient::view_size) {
            FrameView::resize(self, size);
        }
        FrameView::sync_layout_size(self);
        self.queue_child_rebuild(self.dom.root());
        if let Some(html) = self.dom.document_element() {
            self.dom
                .set_needs_style_recalc(html, StyleChangeType::SubtreeStyleChange);
        }
        self.schedule_layout_tree_update_if_needed();
        FrameView::process_relayout_requests(self);
    }

    /// Tear down rendering. The frame view is dropped, deferred work is
    /// discarded and the lifecycle ends in `Stopped`. Safe to call from
    /// script running inside any pipeline phase that runs script.
    pub fn detach(&mut self) {
        if self.lifecycle.state() >= LifecycleState::Stopping {
            return;
        }
        let _span = info_span!("document.detach").entered();
        if let Err(refused) = self.lifecycle.try_advance_to(LifecycleState::Stopping) {
            error!("detach refused: {refused}");
            return;
        }
        {
            let _detach = DetachScope::new(Rc::clone(&self.lifecycle));
            self.layout_tree.detach_all();
            self.layout_tree.take_changes();
            self.layout_tree.take_relayout_requests();
        }
        self.frame_view = None;
        self.tasks.clear();
        self.event_queue.take();
        self.animation_callbacks.clear();
        self.pending_child_rebuilds.clear();
        self.clear_focused_element_timer.stop();
        self.focused = None;
        self.parser = None;
        for child in &mut self.child_frames {
            child.document.detach();
        }
        self.lifecycle.advance_to(LifecycleState::Stopped);
        debug!("document detached");
    }

    #[inline]
    pub fn lifecycle(&self) -> &Rc<DocumentLifecycle> {
        &self.lifecycle
    }

    #[inline]
    pub const fn dom(&self) -> &DOM {
        &self.dom
    }

    #[inline]
    pub const fn styles(&self) -> &StyleEngine {
        &self.styles
    }

    #[inline]
    pub const fn layout_tree(&self) -> &LayoutTree {
        &self.layout_tree
    }

    #[inline]
    pub const fn frame_view(&self) -> Option<&FrameView> {
        self.frame_view.as_ref()
    }

    #[inline]
    pub const fn frame_view_mut(&mut self) -> Option<&mut FrameView> {
        self.frame_view.as_mut()
    }

    #[inline]
    pub const fn config(&self) -> &FrameConfig {
        &self.config
    }

    #[inline]
    pub const fn counters(&self) -> &PerfCounters {
        &self.counters
    }

    #[inline]
    pub const fn style_version(&self) -> u64 {
        self.counters.style_version
    }

    #[inline]
    pub const fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    #[inline]
    pub const fn load_event_finished(&self) -> bool {
        self.load_event_finished
    }

    #[inline]
    pub const fn pending_sheet_layout(&self) -> PendingSheetLayout {
        self.pending_sheet_layout
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn child_frames(&self) -> &[ChildFrame] {
        &self.child_frames
    }

    pub fn child_frames_mut(&mut self) -> &mut [ChildFrame] {
        &mut self.child_frames
    }

    /// Host `document` as a subframe owned by the element `owner`.
    pub fn add_child_frame(&mut self, owner: NodeId, document: Self) {
        self.child_frames.push(ChildFrame { owner, document });
        if let Some(object) = self.layout_tree.object_for_node(owner)
            && self.lifecycle.state_allows_layout_invalidation()
        {
            self.layout_tree.set_needs_layout(object);
            FrameView::process_relayout_requests(self);
        }
    }

    pub fn set_widget_client(&mut self, client: Option<Rc<dyn WidgetClient>>) {
        self.widget_client = client;
    }

    /// Swap the style resolver and restyle everything.
    pub fn set_style_resolver(&mut self, resolver: Box<dyn StyleResolver>) {
        self.styles.set_resolver(resolver);
        self.style_resolver_changed();
    }

    /// Stop asking the host for visual updates, as for a hidden frame.
    pub fn set_rendering_throttled(&mut self, throttled: bool) {
        self.rendering_throttled = throttled;
        if !throttled && self.needs_layout_tree_update() {
            self.schedule_animation();
        }
    }

    #[inline]
    pub const fn is_rendering_throttled(&self) -> bool {
        self.rendering_throttled
    }

    /// Ask the host for a visual update.
    pub(crate) fn schedule_animation(&self) {
        if self.rendering_throttled || self.frame_view.is_none() {
            return;
        }
        if let Some(host) = self.clients.host() {
            host.schedule_animation();
        }
    }

    /// Rewind the lifecycle so the next update revisits `target`. States in
    /// the middle of a phase are left alone; the phase will finish anyway.
    pub(crate) fn rewind_lifecycle_to(&self, target: LifecycleState) -> bool {
        let state = self.lifecycle.state();
        if state <= target {
            return true;
        }
        if !self.lifecycle.can_rewind_to(target) {
            trace!("lifecycle stays in {state:?}, not rewound to {target:?}");
            return false;
        }
        self.lifecycle.ensure_state_at_most(target)
    }

    /// Inputs for style resolution taken from the frame view.
    pub fn style_context(&self) -> StyleContext {
        let (size, printing) = self.frame_view.as_ref().map_or(
            (self.config.frame_size, false),
            |view| (view.layout_size(), view.is_printing()),
        );
        StyleContext {
            viewport_width: size.width as f32,
            viewport_height: size.height as f32,
            printing,
        }
    }

    /// Whether style must be recalculated or layout objects rebuilt.
    pub fn needs_layout_tree_update(&self) -> bool {
        self.dom.needs_style_recalc_anywhere()
            || self.styles.has_pending_invalidations()
            || !self.pending_child_rebuilds.is_empty()
    }

    fn queue_child_rebuild(&mut self, parent: NodeId) {
        self.pending_child_rebuilds.push(parent);
    }

    // DOM mutation entry points.

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.dom.create_element(tag)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.dom.create_text(text)
    }

    /// # Errors
    /// Fails on an invalid hierarchy or while the lifecycle forbids tree mutations.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.dom.append_child(parent, child)?;
        self.did_mutate_dom();
        Ok(())
    }

    /// # Errors
    /// Fails on an invalid hierarchy or while the lifecycle forbids tree mutations.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.dom.insert_before(parent, child, reference)?;
        self.did_mutate_dom();
        Ok(())
    }

    /// # Errors
    /// Fails if `child` is not a child of `parent` or while the lifecycle
    /// forbids tree mutations.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.dom.remove_child(parent, child)?;
        self.did_mutate_dom();
        Ok(())
    }

    /// # Errors
    /// Fails if `node` is not an element.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.dom.set_attribute(node, name, value)?;
        self.did_mutate_dom();
        Ok(())
    }

    /// # Errors
    /// Fails if `node` is not an element.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.dom.remove_attribute(node, name)?;
        self.did_mutate_dom();
        Ok(())
    }

    /// # Errors
    /// Fails if `node` is not a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.dom.set_text(node, text)?;
        self.did_mutate_dom();
        Ok(())
    }

    fn did_mutate_dom(&mut self) {
        self.flush_dom_updates();
        self.schedule_layout_tree_update_if_needed();
    }

    /// Feed queued DOM updates to the style engine and tear down layout
    /// objects of removed nodes.
    pub(crate) fn flush_dom_updates(&mut self) {
        let updates = self.dom.take_updates();
        if updates.is_empty() {
            return;
        }
        let mut focused_removed = false;
        let mut end_of_document = false;
        for update in &updates {
            self.styles.apply_update(&self.dom, update);
            match update {
                DOMUpdate::RemoveNode {
                    parent,
                    node,
                    subtree,
                } => {
                    {
                        let _detach = DetachScope::new(Rc::clone(&self.lifecycle));
                        self.layout_tree.detach_node(*node);
                    }
                    for removed in subtree {
                        self.listeners.remove_for_node(*removed);
                    }
                    if self.focused.is_some_and(|focused| subtree.contains(&focused)) {
                        focused_removed = true;
                    }
                    for child in &mut self.child_frames {
                        if subtree.contains(&child.owner) {
                            child.document.detach();
                        }
                    }
                    self.child_frames
                        .retain(|child| !subtree.contains(&child.owner));
                    if let Some(view) = self.frame_view.as_mut() {
                        view.forget_removed_anchor(subtree);
                    }
                    self.queue_child_rebuild(*parent);
                }
                DOMUpdate::SetText { node } => {
                    if let Some(parent) = self.dom.parent(*node) {
                        self.queue_child_rebuild(parent);
                    }
                }
                DOMUpdate::EndOfDocument => end_of_document = true,
                DOMUpdate::InsertNode { .. } | DOMUpdate::SetAttr { .. } => {}
            }
        }
        FrameView::sync_layout_tree_changes(self);
        FrameView::process_relayout_requests(self);
        if focused_removed {
            self.focused_element_removed();
        }
        if end_of_document {
            self.update_title();
        }
    }

    fn update_title(&mut self) {
        let title = self
            .dom
            .elements()
            .find(|element| self.dom.tag(*element) == Some("title"))
            .map(|element| self.dom.text_content(element).trim().to_owned())
            .unwrap_or_default();
        if title == self.title {
            return;
        }
        self.title = title;
        if let Some(embedder) = self.clients.embedder() {
            embedder.title_changed(&self.title);
        }
    }

    // Stylesheet loading.

    /// A render-blocking stylesheet started loading.
    pub fn add_pending_sheet(&mut self) {
        self.styles.add_pending_sheet();
        debug!("pending sheets: {}", self.styles.pending_sheet_count());
    }

    /// A render-blocking stylesheet finished loading.
    pub fn remove_pending_sheet(&mut self) {
        if !self.styles.remove_pending_sheet() {
            return;
        }
        debug!("all pending sheets loaded");
        self.style_resolver_changed();
        if let Some(fragment) = self.goto_anchor_needed.take() {
            FrameView::scroll_to_fragment(self, &fragment);
        }
    }

    /// Restyle after the set of rules changed. Placeholder-styled nodes
    /// always need their real style, and a layout done with pending sheets
    /// owes a full repaint once they are all in.
    fn style_resolver_changed(&mut self) {
        if let Some(html) = self.dom.document_element() {
            self.dom
                .set_needs_style_recalc(html, StyleChangeType::SubtreeStyleChange);
        }
        if self.pending_sheet_layout == PendingSheetLayout::DidLayoutWithPendingSheets
            && !self.styles.has_pending_script_blocking_sheets()
        {
            self.pending_sheet_layout = PendingSheetLayout::IgnoreLayoutWithPendingSheets;
            FrameView::invalidate_paint_for_view_and_composited_layers(self);
        }
        self.schedule_layout_tree_update_if_needed();
    }

    // Events.

    pub fn add_event_listener(
        &mut self,
        target: EventTarget,
        event_type: EventType,
        listener: Listener,
    ) -> ListenerId {
        self.listeners.add(target, event_type, listener)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Run listeners synchronously along the propagation path. Listeners
    /// may mutate the document, including removing other listeners.
    pub fn dispatch_event(&mut self, event: &Event) {
        let path = propagation_path(&self.dom, event);
        trace!("dispatching {:?} along {} targets", event.event_type, path.len());
        for target in path {
            for listener in self.listeners.listeners_for(target, &event.event_type) {
                listener(self, event);
            }
        }
    }

    /// Queue a callback for the next pump and ask for one.
    pub fn request_animation_frame(&mut self, callback: AnimationCallback) {
        self.animation_callbacks.push(callback);
        self.schedule_animation();
    }

    /// Post a task for the next pump.
    pub fn post_task(&mut self, task: Task) {
        self.tasks.post(task);
        self.schedule_animation();
    }

    /// One visual update: deferred tasks, queued events, animation
    /// callbacks, then style, layout and paint invalidation. Subframes are
    /// pumped after their parent.
    pub fn pump(&mut self, timestamp: f64) {
        let _span = info_span!("document.pump", timestamp).entered();
        for task in self.tasks.take_ready() {
            if !self.lifecycle.is_active() {
                break;
            }
            self.run_task(task);
        }
        for event in self.event_queue.take() {
            if !self.lifecycle.is_active() {
                break;
            }
            self.dispatch_event(&event);
        }
        for callback in mem::take(&mut self.animation_callbacks) {
            if !self.lifecycle.is_active() {
                break;
            }
            callback(self, timestamp);
        }
        if self.lifecycle.is_active() {
            self.update_lifecycle_to_paint_invalidation_clean();
        }
        for child in &mut self.child_frames {
            child.document.pump(timestamp);
        }
        maybe_emit(
            self.config.telemetry_enabled,
            &perf_counters_json(&self.counters),
        );
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Timer { kind, generation } => match kind {
                TimerKind::PostLayoutTasks(id) => {
                    if FrameView::is_alive(self, id) {
                        FrameView::post_layout_timer_fired(self, generation);
                    }
                }
                TimerKind::UpdateWidgets(id) => {
                    if FrameView::is_alive(self, id) {
                        FrameView::update_widgets_timer_fired(self, generation);
                    }
                }
                TimerKind::ClearFocusedElement => self.clear_focused_element_timer_fired(generation),
            },
            Task::Callback(callback) => callback(self),
        }
    }
}
