//! Style resolution behind the [`StyleResolver`] seam.
//!
//! The pipeline treats resolution as a black box: given an element and its
//! parent's style it wants a [`ComputedStyle`]. [`DefaultStyleResolver`]
//! provides tag defaults, a small author rule list and the inline `style`
//! attribute, which is all the lifecycle code needs to exercise.

use crate::computed_style::{ComputedStyle, Display, Edges};
use crate::declarations::{Declaration, apply_declaration, parse_declarations};
use crate::invalidation::InvalidationScope;
use html::{DOM, NodeId};

/// Inputs that are not part of the tree but still influence resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleContext {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub printing: bool,
}

impl Default for StyleContext {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            viewport_height: 600.0,
            printing: false,
        }
    }
}

/// A borrowed element handle passed to resolvers.
#[derive(Clone, Copy)]
pub struct ElementRef<'dom> {
    dom: &'dom DOM,
    node: NodeId,
}

impl<'dom> ElementRef<'dom> {
    pub const fn new(dom: &'dom DOM, node: NodeId) -> Self {
        Self { dom, node }
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub const fn dom(&self) -> &'dom DOM {
        self.dom
    }

    pub fn tag(&self) -> &'dom str {
        self.dom.tag(self.node).unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&'dom str> {
        self.dom.attribute(self.node, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.dom
            .node(self.node)
            .is_some_and(|node| node.has_class(class))
    }

    pub fn parent_element(&self) -> Option<Self> {
        self.dom
            .parent(self.node)
            .filter(|parent| self.dom.is_element(*parent))
            .map(|parent| Self::new(self.dom, parent))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = Self> + 'dom {
        let dom = self.dom;
        dom.ancestors(self.node)
            .filter(move |ancestor| dom.is_element(*ancestor))
            .map(move |ancestor| Self::new(dom, ancestor))
    }
}

/// Computes styles for elements.
pub trait StyleResolver {
    /// Resolve the style of `element` given its parent's resolved style.
    fn resolve_style(
        &self,
        element: ElementRef<'_>,
        parent_style: Option<&ComputedStyle>,
        context: &StyleContext,
    ) -> ComputedStyle;

    /// Whether any rule depends on the viewport size. When true, a viewport
    /// resize forces a full style recalc before the next layout.
    fn is_viewport_dependent(&self) -> bool {
        false
    }

    /// How far a change to `class` reaches.
    fn invalidation_scope_for_class(&self, _class: &str) -> InvalidationScope {
        InvalidationScope::SelfOnly
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Tag(String),
    Class(String),
    Id(String),
}

impl SimpleSelector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "*" {
            return Some(Self::Universal);
        }
        if let Some(class) = text.strip_prefix('.') {
            return (!class.is_empty()).then(|| Self::Class(class.to_owned()));
        }
        if let Some(id) = text.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_owned()));
        }
        let valid = !text.is_empty()
            && text
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        valid.then(|| Self::Tag(text.to_ascii_lowercase()))
    }

    fn matches(&self, element: &ElementRef<'_>) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => element.tag() == tag,
            Self::Class(class) => element.has_class(class),
            Self::Id(id) => element.attribute("id") == Some(id.as_str()),
        }
    }

    /// (ids, classes, tags)
    const fn specificity(&self) -> (u8, u8, u8) {
        match self {
            Self::Universal => (0, 0, 0),
            Self::Tag(_) => (0, 0, 1),
            Self::Class(_) => (0, 1, 0),
            Self::Id(_) => (1, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Simple(SimpleSelector),
    /// `ancestor subject`
    Descendant {
        ancestor: SimpleSelector,
        subject: SimpleSelector,
    },
}

impl Selector {
    /// Parse a compound-free selector: one simple selector, or two separated
    /// by a descendant combinator.
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split_ascii_whitespace().collect();
        match parts.as_slice() {
            [single] => SimpleSelector::parse(single).map(Self::Simple),
            [ancestor, subject] => Some(Self::Descendant {
                ancestor: SimpleSelector::parse(ancestor)?,
                subject: SimpleSelector::parse(subject)?,
            }),
            _ => None,
        }
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        match self {
            Self::Simple(simple) => simple.matches(element),
            Self::Descendant { ancestor, subject } => {
                subject.matches(element)
                    && element
                        .ancestors()
                        .any(|candidate| ancestor.matches(&candidate))
            }
        }
    }

    fn specificity(&self) -> (u8, u8, u8) {
        match self {
            Self::Simple(simple) => simple.specificity(),
            Self::Descendant { ancestor, subject } => {
                let (ids, classes, tags) = ancestor.specificity();
                let (more_ids, more_classes, more_tags) = subject.specificity();
                (ids + more_ids, classes + more_classes, tags + more_tags)
            }
        }
    }
}

/// One author rule, optionally gated on `(max-width: N)` of the viewport.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
    pub max_viewport_width: Option<f32>,
}

/// Tag defaults, author rules sorted by specificity then source order, and
/// the inline `style` attribute last.
#[derive(Debug, Default, Clone)]
pub struct DefaultStyleResolver {
    rules: Vec<StyleRule>,
}

impl DefaultStyleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; returns false if the selector is not understood.
    pub fn add_rule(&mut self, selector: &str, declarations: &str) -> bool {
        self.push_rule(selector, declarations, None)
    }

    /// Add a rule that only applies while the viewport is at most `max_width` px wide.
    pub fn add_media_rule(&mut self, max_width: f32, selector: &str, declarations: &str) -> bool {
        self.push_rule(selector, declarations, Some(max_width))
    }

    fn push_rule(&mut self, selector: &str, declarations: &str, max_width: Option<f32>) -> bool {
        let Some(selector) = Selector::parse(selector) else {
            return false;
        };
        self.rules.push(StyleRule {
            selector,
            declarations: parse_declarations(declarations),
            max_viewport_width: max_width,
        });
        // Stable: equal specificity keeps source order.
        self.rules.sort_by_key(|rule| rule.selector.specificity());
        true
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }
}

/// User agent defaults for an element.
fn apply_tag_defaults(style: &mut ComputedStyle, tag: &str) {
    match tag {
        "html" | "div" | "p" | "section" | "article" | "header" | "footer" | "nav" | "main"
        | "ul" | "ol" | "li" | "form" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre"
        | "blockquote" | "hr" => style.display = Display::Block,
        "body" => {
            style.display = Display::Block;
            style.margin = Edges::uniform(8.0);
        }
        "head" | "script" | "style" | "title" | "meta" | "link" | "template" | "noscript" => {
            style.display = Display::None;
        }
        _ => {}
    }
    match tag {
        "p" | "ul" | "ol" | "pre" | "blockquote" => {
            style.margin.top = style.font_size;
            style.margin.bottom = style.font_size;
        }
        "h1" => {
            style.font_size *= 2.0;
            style.margin.top = style.font_size * 0.67;
            style.margin.bottom = style.font_size * 0.67;
        }
        _ => {}
    }
}

impl StyleResolver for DefaultStyleResolver {
    fn resolve_style(
        &self,
        element: ElementRef<'_>,
        parent_style: Option<&ComputedStyle>,
        context: &StyleContext,
    ) -> ComputedStyle {
        let mut style = parent_style.map_or_else(ComputedStyle::default, ComputedStyle::inherit_from);
        apply_tag_defaults(&mut style, element.tag());

        for rule in &self.rules {
            let media_matches = rule
                .max_viewport_width
                .is_none_or(|max_width| context.viewport_width <= max_width);
            if !media_matches || !rule.selector.matches(&element) {
                continue;
            }
            for declaration in &rule.declarations {
                apply_declaration(&mut style, declaration);
            }
        }

        if let Some(inline) = element.attribute("style") {
            for declaration in parse_declarations(inline) {
                apply_declaration(&mut style, &declaration);
            }
        }
        style
    }

    fn is_viewport_dependent(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.max_viewport_width.is_some())
    }

    fn invalidation_scope_for_class(&self, class: &str) -> InvalidationScope {
        let reaches_descendants = self.rules.iter().any(|rule| {
            matches!(
                &rule.selector,
                Selector::Descendant { ancestor: SimpleSelector::Class(name), .. } if name == class
            )
        });
        if reaches_descendants {
            InvalidationScope::Descendants
        } else {
            InvalidationScope::SelfOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed_style::SizeSpecified;
    use html::DomError;
    use lifecycle::{DocumentLifecycle, LifecycleState};
    use std::rc::Rc;

    fn tree() -> Result<(DOM, NodeId, NodeId), DomError> {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        let mut dom = DOM::new(lifecycle);
        let outer = dom.create_element("div");
        let inner = dom.create_element("span");
        dom.append_child(dom.root(), outer)?;
        dom.append_child(outer, inner)?;
        dom.set_attribute(outer, "class", "wide card")?;
        dom.set_attribute(inner, "id", "label")?;
        Ok((dom, outer, inner))
    }

    /// Higher specificity wins regardless of source order, and inline style wins last.
    ///
    /// # Panics
    /// Panics if the cascade order is wrong.
    #[test]
    fn specificity_then_inline() -> Result<(), DomError> {
        let (mut dom, outer, _) = tree()?;
        let mut resolver = DefaultStyleResolver::new();
        assert!(resolver.add_rule(".card", "width: 100px"));
        assert!(resolver.add_rule("div", "width: 50px; display: block"));
        let context = StyleContext::default();

        let style = resolver.resolve_style(ElementRef::new(&dom, outer), None, &context);
        assert_eq!(style.width, SizeSpecified::Px(100.0));

        dom.set_attribute(outer, "style", "width: 10px")?;
        let style = resolver.resolve_style(ElementRef::new(&dom, outer), None, &context);
        assert_eq!(style.width, SizeSpecified::Px(10.0));
        Ok(())
    }

    /// Descendant rules match through ancestors and widen class invalidation.
    ///
    /// # Panics
    /// Panics if descendant matching or the invalidation scope is wrong.
    #[test]
    fn descendant_rules() -> Result<(), DomError> {
        let (dom, outer, inner) = tree()?;
        let mut resolver = DefaultStyleResolver::new();
        assert!(resolver.add_rule(".wide #label", "font-size: 20px"));
        let context = StyleContext::default();
        let parent = resolver.resolve_style(ElementRef::new(&dom, outer), None, &context);
        let style = resolver.resolve_style(ElementRef::new(&dom, inner), Some(&parent), &context);
        assert!((style.font_size - 20.0).abs() < f32::EPSILON);
        assert_eq!(
            resolver.invalidation_scope_for_class("wide"),
            InvalidationScope::Descendants
        );
        assert_eq!(
            resolver.invalidation_scope_for_class("card"),
            InvalidationScope::SelfOnly
        );
        Ok(())
    }

    /// Media rules follow the viewport width carried in the context.
    ///
    /// # Panics
    /// Panics if the media gate is ignored.
    #[test]
    fn media_rules_follow_viewport() -> Result<(), DomError> {
        let (dom, outer, _) = tree()?;
        let mut resolver = DefaultStyleResolver::new();
        assert!(resolver.add_media_rule(400.0, "div", "display: none"));
        assert!(resolver.is_viewport_dependent());

        let narrow = StyleContext {
            viewport_width: 300.0,
            ..StyleContext::default()
        };
        let wide = StyleContext::default();
        let element = ElementRef::new(&dom, outer);
        assert_eq!(resolver.resolve_style(element, None, &narrow).display, Display::None);
        assert_eq!(resolver.resolve_style(element, None, &wide).display, Display::Block);
        Ok(())
    }
}
