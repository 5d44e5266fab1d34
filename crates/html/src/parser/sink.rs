use core::cell::RefCell;
use core::mem;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{Tag, TagKind, Token, TokenSink, TokenSinkResult};
use log::trace;

/// One tree-construction step produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOp {
    StartElement {
        tag: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndElement {
        tag: String,
    },
    Text(String),
    Comment(String),
    /// A `</script>` end tag. The tokenizer suspends right after producing it.
    ScriptEnd,
}

/// Collects tokens as [`ParseOp`]s until the parser drains them into the tree.
#[derive(Default)]
pub struct ParserSink {
    ops: RefCell<Vec<ParseOp>>,
}

impl ParserSink {
    pub fn take_ops(&self) -> Vec<ParseOp> {
        mem::take(&mut *self.ops.borrow_mut())
    }

    fn push(&self, op: ParseOp) {
        self.ops.borrow_mut().push(op);
    }

    fn process_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                let raw = match name.as_str() {
                    "script" => Some(RawKind::ScriptData),
                    "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
                    "title" | "textarea" => Some(RawKind::Rcdata),
                    _ => None,
                };
                self.push(ParseOp::StartElement {
                    tag: name,
                    attrs: tag
                        .attrs
                        .iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                        .collect(),
                    self_closing: tag.self_closing,
                });
                raw.map_or(TokenSinkResult::Continue, TokenSinkResult::RawData)
            }
            TagKind::EndTag if name == "script" => {
                self.push(ParseOp::ScriptEnd);
                TokenSinkResult::Script(())
            }
            TagKind::EndTag => {
                self.push(ParseOp::EndElement { tag: name });
                TokenSinkResult::Continue
            }
        }
    }
}

impl TokenSink for ParserSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.process_tag(tag),
            Token::CharacterTokens(text) => {
                self.push(ParseOp::Text(text.to_string()));
                TokenSinkResult::Continue
            }
            Token::CommentToken(text) => {
                self.push(ParseOp::Comment(text.to_string()));
                TokenSinkResult::Continue
            }
            Token::ParseError(error) => {
                trace!("markup parse error: {error}");
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}
