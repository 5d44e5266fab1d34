//! Markup parser for documents opened with `write()`.
//!
//! Tokenizing is done by html5ever; tree construction is a small
//! open-element-stack builder. The parser yields to the caller every time a
//! `<script>` element closes so the caller can run it. A script that writes
//! more markup feeds its own [`ParserInput`] through the same tokenizer
//! before the outer input resumes, which places written markup right after
//! the script that produced it.

mod sink;
mod tree_builder;

use crate::dom::{DOM, DOMUpdate, DomError};
use core::cell::{Cell, RefCell};
use html5ever::buffer_queue::BufferQueue;
use html5ever::tendril::StrTendril;
use html5ever::TokenizerResult;
use html5ever::tokenizer::{Tokenizer, TokenizerOpts};
use indextree::NodeId;
use log::debug;
use sink::ParserSink;
use tree_builder::TreeBuilder;

pub use sink::ParseOp;

/// A chunk of markup waiting to be tokenized.
pub struct ParserInput {
    queue: BufferQueue,
}

impl ParserInput {
    pub fn new(markup: &str) -> Self {
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(markup));
        Self { queue }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Why [`DocumentParser::pump`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpResult {
    /// All of the input was consumed.
    Exhausted,
    /// A script element closed; the remaining input is still queued.
    Script(NodeId),
}

pub struct DocumentParser {
    tokenizer: Tokenizer<ParserSink>,
    builder: RefCell<TreeBuilder>,
    finished: Cell<bool>,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(ParserSink::default(), TokenizerOpts::default()),
            builder: RefCell::new(TreeBuilder::default()),
            finished: Cell::new(false),
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Tokenize `input` into `dom` until it is exhausted or a script closes.
    ///
    /// # Errors
    /// Propagates tree mutation failures, for instance when called while the
    /// document lifecycle forbids tree mutations.
    pub fn pump(&self, input: &ParserInput, dom: &mut DOM) -> Result<PumpResult, DomError> {
        if self.finished.get() {
            return Ok(PumpResult::Exhausted);
        }
        loop {
            let result = self.tokenizer.feed(&input.queue);
            let script = self.flush(dom)?;
            match (result, script) {
                (TokenizerResult::Script(()), Some(script)) => {
                    debug!("parser yielding at script {script:?}");
                    return Ok(PumpResult::Script(script));
                }
                // A stray end tag with no open script element.
                (TokenizerResult::Script(()), None) => {}
                (TokenizerResult::Done, _) => return Ok(PumpResult::Exhausted),
            }
        }
    }

    /// Signal end of input and flush anything the tokenizer still buffers.
    ///
    /// # Errors
    /// Propagates tree mutation failures.
    pub fn finish(&self, dom: &mut DOM) -> Result<(), DomError> {
        if self.finished.replace(true) {
            return Ok(());
        }
        self.tokenizer.end();
        self.flush(dom)?;
        dom.push_update(DOMUpdate::EndOfDocument);
        Ok(())
    }

    fn flush(&self, dom: &mut DOM) -> Result<Option<NodeId>, DomError> {
        let ops = self.tokenizer.sink.take_ops();
        self.builder.borrow_mut().apply(dom, ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle::{DocumentLifecycle, LifecycleState};
    use std::rc::Rc;

    fn new_dom() -> DOM {
        let lifecycle = Rc::new(DocumentLifecycle::new());
        assert!(lifecycle.advance_to(LifecycleState::Inactive));
        DOM::new(lifecycle)
    }

    const fn script_of(result: PumpResult) -> Option<NodeId> {
        match result {
            PumpResult::Script(script) => Some(script),
            PumpResult::Exhausted => None,
        }
    }

    /// Markup without structure lands inside an implied html/body.
    ///
    /// # Panics
    /// Panics if the implied structure is missing.
    #[test]
    fn implied_structure() -> Result<(), DomError> {
        let mut dom = new_dom();
        let parser = DocumentParser::new();
        let input = ParserInput::new("<p id=greeting>Hello <b>world</b></p><br>tail");
        assert_eq!(parser.pump(&input, &mut dom)?, PumpResult::Exhausted);
        parser.finish(&mut dom)?;

        let body = dom.body();
        assert!(body.is_some());
        let paragraph = dom.get_element_by_id("greeting");
        assert_eq!(paragraph.and_then(|node| dom.parent(node)), body);
        assert_eq!(
            paragraph.map(|node| dom.text_content(node)),
            Some("Hello world".to_owned())
        );
        let tags: Vec<_> = body
            .into_iter()
            .flat_map(|body| dom.element_children(body))
            .filter_map(|node| dom.tag(node))
            .collect();
        assert_eq!(tags, vec!["p", "br"]);
        Ok(())
    }

    /// The parser stops right after each script and resumes on the next pump.
    ///
    /// # Panics
    /// Panics if the parser does not yield at the scripts.
    #[test]
    fn yields_at_each_script() -> Result<(), DomError> {
        let mut dom = new_dom();
        let parser = DocumentParser::new();
        let input =
            ParserInput::new("<div>a</div><script>first()</script><div>b</div><script>second()</script>");

        let first = script_of(parser.pump(&input, &mut dom)?);
        assert_eq!(
            first.map(|script| dom.text_content(script)),
            Some("first()".to_owned())
        );
        // Markup after the script has not been built yet.
        assert_eq!(dom.elements().filter(|node| dom.tag(*node) == Some("div")).count(), 1);

        let second = script_of(parser.pump(&input, &mut dom)?);
        assert_eq!(
            second.map(|script| dom.text_content(script)),
            Some("second()".to_owned())
        );
        assert_eq!(parser.pump(&input, &mut dom)?, PumpResult::Exhausted);
        Ok(())
    }

    /// Markup fed while the outer input is suspended at a script lands before
    /// the rest of the outer input.
    ///
    /// # Panics
    /// Panics if the nested markup is placed after the outer tail.
    #[test]
    fn nested_input_lands_after_script() -> Result<(), DomError> {
        let mut dom = new_dom();
        let parser = DocumentParser::new();
        let outer = ParserInput::new("<script>w()</script><i>outer</i>");
        assert!(matches!(parser.pump(&outer, &mut dom)?, PumpResult::Script(_)));

        let nested = ParserInput::new("<b>nested</b>");
        assert_eq!(parser.pump(&nested, &mut dom)?, PumpResult::Exhausted);
        assert_eq!(parser.pump(&outer, &mut dom)?, PumpResult::Exhausted);

        let tags: Vec<_> = dom
            .body()
            .into_iter()
            .flat_map(|body| dom.element_children(body))
            .filter_map(|node| dom.tag(node))
            .collect();
        assert_eq!(tags, vec!["script", "b", "i"]);
        Ok(())
    }
}
