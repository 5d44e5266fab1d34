//! Style engine: resolves and caches computed styles for the document.
//!
//! Resolution itself sits behind [`StyleResolver`]. The engine owns the
//! pieces the document lifecycle interacts with: shared style storage, the
//! invalidation queue fed by DOM mutations, render-blocking stylesheet
//! accounting and placeholder styles for elements styled while sheets load.

use html::{DOM, DOMSubscriber, DOMUpdate, NodeId};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace_span;

mod computed_style;
mod declarations;
mod difference;
mod interning;
mod invalidation;
mod resolver;

pub use computed_style::{
    AppRegion, ColorRGBA, ComputedStyle, Display, Edges, Offsets, Overflow, Position,
    SizeSpecified, Visibility,
};
pub use declarations::{Declaration, apply_declaration, parse_declarations, parse_px};
pub use difference::StyleDifference;
pub use interning::{StyleInterner, StyleInternerStats};
pub use invalidation::{InvalidationQueue, InvalidationScope};
pub use resolver::{
    DefaultStyleResolver, ElementRef, Selector, SimpleSelector, StyleContext, StyleResolver,
    StyleRule,
};

pub struct StyleEngine {
    resolver: Box<dyn StyleResolver>,
    interner: StyleInterner,
    invalidations: InvalidationQueue,
    placeholder: Arc<ComputedStyle>,
    /// Nodes currently holding the placeholder style.
    placeholder_nodes: HashSet<NodeId>,
    /// Render-blocking stylesheets still loading.
    pending_sheets: u32,
    ignore_pending_sheets: bool,
    /// Viewport the styles were last resolved against.
    last_context: Option<StyleContext>,
    last_resolve_count: u64,
    total_resolve_count: u64,
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new(Box::new(DefaultStyleResolver::new()))
    }
}

impl StyleEngine {
    pub fn new(resolver: Box<dyn StyleResolver>) -> Self {
        let mut interner = StyleInterner::new();
        let placeholder = interner.intern(ComputedStyle::placeholder());
        Self {
            resolver,
            interner,
            invalidations: InvalidationQueue::default(),
            placeholder,
            placeholder_nodes: HashSet::new(),
            pending_sheets: 0,
            ignore_pending_sheets: false,
            last_context: None,
            last_resolve_count: 0,
            total_resolve_count: 0,
        }
    }

    /// Swap the resolver. Every existing style is stale afterwards; the caller
    /// marks the tree for a full recalc.
    pub fn set_resolver(&mut self, resolver: Box<dyn StyleResolver>) {
        self.resolver = resolver;
        self.last_context = None;
    }

    pub fn resolver(&self) -> &dyn StyleResolver {
        self.resolver.as_ref()
    }

    /// Resolve `node`'s style and store it, returning the previous style.
    ///
    /// While render-blocking sheets are loading (and not being ignored), an
    /// element that has no layout object gets the `display: none` placeholder
    /// instead of a real style, so nothing is laid out against missing rules.
    pub fn resolve_style_for_element(
        &mut self,
        dom: &DOM,
        node: NodeId,
        parent_style: Option<&ComputedStyle>,
        has_layout_object: bool,
        context: &StyleContext,
    ) -> (Arc<ComputedStyle>, Option<Arc<ComputedStyle>>) {
        self.last_resolve_count = self.last_resolve_count.saturating_add(1);
        self.total_resolve_count = self.total_resolve_count.saturating_add(1);
        self.last_context = Some(*context);

        if self.should_use_placeholder(has_layout_object) {
            debug!("placeholder style for {node:?} while sheets are pending");
            self.placeholder_nodes.insert(node);
            let previous = self
                .interner
                .set_node_style_arc(node, Arc::clone(&self.placeholder));
            return (Arc::clone(&self.placeholder), previous);
        }
        self.placeholder_nodes.remove(&node);
        let style = self
            .resolver
            .resolve_style(ElementRef::new(dom, node), parent_style, context);
        self.interner.set_node_style(node, style)
    }

    pub fn computed_style(&self, node: NodeId) -> Option<Arc<ComputedStyle>> {
        self.interner.node_style(node).cloned()
    }

    pub fn clear_computed_style(&mut self, node: NodeId) {
        self.interner.remove_node(node);
        self.placeholder_nodes.remove(&node);
    }

    pub fn uses_placeholder_style(&self, node: NodeId) -> bool {
        self.placeholder_nodes.contains(&node)
    }

    pub fn placeholder_node_count(&self) -> usize {
        self.placeholder_nodes.len()
    }

    pub fn should_use_placeholder(&self, has_layout_object: bool) -> bool {
        self.pending_sheets > 0 && !self.ignore_pending_sheets && !has_layout_object
    }

    /// Start a style pass; resets the per-pass counter.
    pub fn begin_recalc(&mut self) {
        self.last_resolve_count = 0;
    }

    pub const fn last_resolve_count(&self) -> u64 {
        self.last_resolve_count
    }

    pub const fn total_resolve_count(&self) -> u64 {
        self.total_resolve_count
    }

    /// Whether resolved styles may be stale because the viewport changed and
    /// some rule depends on it.
    pub fn viewport_dependent_styles_stale(&self, context: &StyleContext) -> bool {
        self.resolver.is_viewport_dependent()
            && self.last_context.is_some_and(|last| {
                last.viewport_width.to_bits() != context.viewport_width.to_bits()
                    || last.viewport_height.to_bits() != context.viewport_height.to_bits()
                    || last.printing != context.printing
            })
    }

    pub fn has_pending_script_blocking_sheets(&self) -> bool {
        self.pending_sheets > 0
    }

    pub const fn pending_sheet_count(&self) -> u32 {
        self.pending_sheets
    }

    pub fn add_pending_sheet(&mut self) {
        self.pending_sheets = self.pending_sheets.saturating_add(1);
    }

    /// Returns true when the last pending sheet finished.
    pub fn remove_pending_sheet(&mut self) -> bool {
        debug_assert!(self.pending_sheets > 0, "unbalanced remove_pending_sheet");
        self.pending_sheets = self.pending_sheets.saturating_sub(1);
        self.pending_sheets == 0
    }

    pub fn set_ignore_pending_sheets(&mut self, ignore: bool) {
        self.ignore_pending_sheets = ignore;
    }

    pub const fn ignoring_pending_sheets(&self) -> bool {
        self.ignore_pending_sheets
    }

    pub fn schedule_invalidation(&mut self, node: NodeId, scope: InvalidationScope) {
        self.invalidations.schedule(node, scope);
    }

    pub fn has_pending_invalidations(&self) -> bool {
        !self.invalidations.is_empty()
    }

    /// Apply queued invalidations to the tree. May mark more nodes dirty than
    /// were mutated, e.g. descendants of an element whose class changed.
    pub fn invalidate(&mut self, dom: &mut DOM) -> usize {
        let _span = trace_span!("style_invalidate", queued = self.invalidations.len()).entered();
        self.invalidations.apply(dom)
    }

    pub fn interner_stats(&self) -> StyleInternerStats {
        self.interner.stats()
    }

    pub fn collect_garbage(&mut self) -> usize {
        self.interner.collect_garbage()
    }

    fn invalidate_class_change(&mut self, node: NodeId, old: Option<&str>, new: Option<&str>) {
        let old_classes: HashSet<&str> = old.unwrap_or_default().split_ascii_whitespace().collect();
        let new_classes: HashSet<&str> = new.unwrap_or_default().split_ascii_whitespace().collect();
        let scope = old_classes
            .symmetric_difference(&new_classes)
            .map(|class| self.resolver.invalidation_scope_for_class(class))
            .max();
        if let Some(scope) = scope {
            self.invalidations.schedule(node, scope);
        }
    }
}

impl DOMSubscriber for StyleEngine {
    fn apply_update(&mut self, _dom: &DOM, update: &DOMUpdate) {
        match update {
            DOMUpdate::SetAttr {
                node,
                name,
                old,
                value,
            } => match name.as_str() {
                "class" => self.invalidate_class_change(*node, old.as_deref(), value.as_deref()),
                // Id selectors and inline declarations only affect the element itself.
                _ => self.invalidations.schedule(*node, InvalidationScope::SelfOnly),
            },
            DOMUpdate::RemoveNode { subtree, .. } => {
                for removed in subtree {
                    self.clear_computed_style(*removed);
                    self.invalidations.forget(*removed);
                }
            }
            DOMUpdate::InsertNode { .. } | DOMUpdate::SetText { .. } | DOMUpdate::EndOfDocument => {}
        }
    }
}
