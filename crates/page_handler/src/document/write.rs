//! `open`, `write`, `writeln` and `close`.
//!
//! Markup written from a script handler is parsed through the same
//! tokenizer before the outer input resumes. Writes nest at most
//! `max_write_recursion_depth` deep; once a write goes deeper, every write
//! is dropped until the outermost one returns.

use super::{Document, ReadyState};
use crate::events::{Event, EventTarget, EventType};
use html::{DocumentParser, NodeId, ParserInput, PumpResult};
use log::{debug, warn};
use std::rc::Rc;
use tracing::info_span;

/// Runs the script element `script` with its source text. May write.
pub type ScriptHandler = Rc<dyn Fn(&mut Document, NodeId, &str)>;

impl Document {
    pub fn set_script_handler(&mut self, handler: Option<ScriptHandler>) {
        self.script_handler = handler;
    }

    /// Whether a parser is open and has not seen the end of its input.
    pub fn is_parsing(&self) -> bool {
        self.parser
            .as_ref()
            .is_some_and(|parser| !parser.is_finished())
    }

    #[inline]
    pub const fn write_depth(&self) -> u32 {
        self.write_state.depth
    }

    /// Replace the document content with a fresh parser. Ignored while a
    /// write is running.
    pub fn open(&mut self) {
        if self.write_state.depth > 0 {
            debug!("open ignored inside write");
            return;
        }
        self.open_parser();
    }

    fn open_parser(&mut self) {
        let root = self.dom.root();
        if let Err(refused) = self.dom.remove_children(root) {
            warn!("open refused: {refused}");
            return;
        }
        self.did_mutate_dom();
        self.parser = Some(Rc::new(DocumentParser::new()));
        self.ready_state = ReadyState::Loading;
        self.load_event_finished = false;
        if let Some(view) = self.frame_view.as_mut() {
            view.reset();
        }
        debug!("document opened");
    }

    /// Parse `markup` at the current insertion point, opening the document
    /// first if no parser is running.
    pub fn write(&mut self, markup: &str) {
        let state = &mut self.write_state;
        state.depth = state.depth.saturating_add(1);
        state.too_deep = (state.depth > 1 && state.too_deep)
            || state.depth > self.config.max_write_recursion_depth;
        if state.too_deep {
            debug!("write dropped at depth {}", state.depth);
        } else {
            self.insert_markup(markup);
        }
        self.write_state.depth = self.write_state.depth.saturating_sub(1);
    }

    pub fn writeln(&mut self, markup: &str) {
        self.write(markup);
        self.write("\n");
    }

    fn insert_markup(&mut self, markup: &str) {
        if !self.is_parsing() {
            self.open_parser();
        }
        let Some(parser) = self.parser.as_ref().map(Rc::clone) else {
            return;
        };
        let _span = info_span!("document.write", depth = self.write_state.depth).entered();
        let input = ParserInput::new(markup);
        loop {
            let result = parser.pump(&input, &mut self.dom);
            self.did_mutate_dom();
            match result {
                Ok(PumpResult::Exhausted) => return,
                Ok(PumpResult::Script(script)) => self.execute_script(script),
                Err(refused) => {
                    warn!("write stopped: {refused}");
                    return;
                }
            }
            // The script may have closed or torn down the document.
            if self
                .parser
                .as_ref()
                .is_none_or(|current| !Rc::ptr_eq(current, &parser))
            {
                return;
            }
        }
    }

    fn execute_script(&mut self, script: NodeId) {
        let Some(handler) = self.script_handler.as_ref().map(Rc::clone) else {
            return;
        };
        let source = self.dom.text_content(script);
        handler(self, script, &source);
    }

    /// End the input stream, then fire `load`.
    pub fn close(&mut self) {
        let Some(parser) = self.parser.as_ref().map(Rc::clone) else {
            return;
        };
        if parser.is_finished() {
            return;
        }
        let _span = info_span!("document.close").entered();
        if let Err(refused) = parser.finish(&mut self.dom) {
            warn!("close could not flush the parser: {refused}");
        }
        self.ready_state = ReadyState::Interactive;
        self.did_mutate_dom();

        self.ready_state = ReadyState::Complete;
        self.dispatch_event(&Event::new(EventType::Load, EventTarget::Document));
        self.load_event_finished = true;
        if self.lifecycle.is_active() {
            self.update_style_and_layout();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::FrameConfig;
    use crate::document::{Document, ReadyState};
    use crate::testing::Recorders;
    use layouter::IntSize;

    fn document() -> Document {
        let recorders = Recorders::default();
        Document::new(FrameConfig::new(IntSize::new(200, 100), false), recorders.clients())
    }

    /// Written markup builds the tree; close completes the load.
    ///
    /// # Panics
    /// Panics if the tree or ready state is wrong.
    #[test]
    fn write_then_close_loads_the_document() {
        drop(env_logger::builder().is_test(true).try_init());
        let mut doc = document();
        doc.write("<html><body><p id=first>one</p>");
        assert!(doc.is_parsing());
        doc.writeln("<p id=second>two</p></body></html>");
        doc.close();
        assert!(!doc.is_parsing());
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert!(doc.load_event_finished());
        assert!(doc.dom().get_element_by_id("first").is_some());
        assert!(doc.dom().get_element_by_id("second").is_some());
    }

    /// The title is picked up when parsing ends.
    ///
    /// # Panics
    /// Panics if the title is wrong.
    #[test]
    fn title_is_read_at_end_of_document() {
        let mut doc = document();
        doc.write("<html><head><title> Hello </title></head><body></body></html>");
        doc.close();
        assert_eq!(doc.title(), "Hello");
    }
}
