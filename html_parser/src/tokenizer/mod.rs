// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tokenizer (§4.3): turns a decoded character stream into a sequence
//! of tokens, pushed one at a time into a [`TokenSink`].
//!
//! Dispatch is a plain `match` over [`states::State`] rather than the
//! teacher's `match_token!`-generated table; see `DESIGN.md`.

pub mod char_ref;
pub mod interface;
pub mod states;

use log::{debug, trace};
use markup_core::input_stream::InputStream;
use markup_core::tendril::StrTendril;
use markup_core::LocalName;

use self::char_ref::{CharRefTokenizer, Status as CharRefStatus};
use self::interface::{
    Doctype, Tag, TagKind, Token, TokenSink, TokenSinkResult,
};
use self::states::{
    AttrValueKind, DoctypeIdKind, RawKind, ScriptEscapeKind, State,
};

#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    pub exact_errors: bool,
    pub discard_bom: bool,
    pub profile: bool,
    pub initial_state: Option<State>,
    pub last_start_tag_name: Option<LocalName>,
}

impl Default for TokenizerOpts {
    fn default() -> Self {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            profile: false,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

struct AttrBuilder {
    name: StrTendril,
    value: StrTendril,
}

pub struct Tokenizer<Sink> {
    sink: Sink,
    opts: TokenizerOpts,
    state: State,

    current_tag_kind: TagKind,
    current_tag_name: StrTendril,
    current_tag_self_closing: bool,
    current_tag_attrs: Vec<markup_core::Attribute>,
    current_attr: Option<AttrBuilder>,

    current_comment: StrTendril,
    current_doctype: Doctype,

    temp_buf: StrTendril,
    last_start_tag_name: Option<LocalName>,

    char_ref_tokenizer: Option<Box<CharRefTokenizer>>,
    char_ref_tokenizer_attr: Option<AttrValueKind>,
    ignore_lf: bool,

    at_eof: bool,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    pub fn new(sink: Sink, mut opts: TokenizerOpts) -> Tokenizer<Sink> {
        let state = opts.initial_state.take().unwrap_or(State::Data);
        let last_start_tag_name = opts.last_start_tag_name.take();
        Tokenizer {
            sink,
            opts,
            state,
            current_tag_kind: TagKind::StartTag,
            current_tag_name: StrTendril::new(),
            current_tag_self_closing: false,
            current_tag_attrs: Vec::new(),
            current_attr: None,
            current_comment: StrTendril::new(),
            current_doctype: Doctype::new(),
            temp_buf: StrTendril::new(),
            last_start_tag_name,
            char_ref_tokenizer: None,
            char_ref_tokenizer_attr: None,
            ignore_lf: false,
            at_eof: false,
        }
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut Sink {
        &mut self.sink
    }

    pub fn end(mut self) -> Sink {
        self.sink.end();
        self.sink
    }

    /// Drive the tokenizer until the input stream runs out of decoded
    /// characters. Call again after more text is appended (§4.5).
    pub fn run(&mut self, input: &mut InputStream) {
        loop {
            if !self.step(input) {
                break;
            }
        }
    }

    pub fn end_of_input(&mut self, input: &mut InputStream) {
        self.at_eof = true;
        self.run(input);
        if let Some(mut crt) = self.char_ref_tokenizer.take() {
            // End of input with a reference still pending (`Stuck` forever):
            // treat whatever was buffered as a failed match.
            match crt.step(input) {
                CharRefStatus::Done(cr) => self.emit_char_ref_result(&mut crt, cr),
                _ => self.emit_char_ref_result(&mut crt, char_ref::CharRef { chars: ['\0', '\0'], num_chars: 0 }),
            }
        }
        self.emit_eof();
    }

    fn emit_eof(&mut self) {
        self.process(Token::Eof);
    }

    fn process(&mut self, token: Token) -> TokenSinkResult<Sink::Handle> {
        trace!("emitting token {:?}", token);
        let result = self.sink.process_token(token, 0);
        match result {
            TokenSinkResult::RawData(kind) => self.state = State::RawData(kind),
            TokenSinkResult::Plaintext => self.state = State::Plaintext,
            _ => {},
        }
        result
    }

    fn error(&mut self, msg: &'static str) {
        debug!("parse error: {}", msg);
        self.process(Token::ParseError(msg));
    }

    fn emit_tag(&mut self) {
        let tag = Tag {
            kind: self.current_tag_kind,
            name: LocalName::from(&*self.current_tag_name),
            self_closing: self.current_tag_self_closing,
            attrs: std::mem::take(&mut self.current_tag_attrs),
        };
        self.current_tag_name = StrTendril::new();
        self.current_tag_self_closing = false;
        if tag.kind == TagKind::StartTag {
            self.last_start_tag_name = Some(tag.name.clone());
        }
        self.process(Token::Tag(tag));
    }

    fn discard_tag(&mut self) {
        self.current_tag_name = StrTendril::new();
        self.current_tag_self_closing = false;
        self.current_tag_attrs.clear();
        self.current_attr = None;
    }

    fn create_tag(&mut self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_kind = kind;
        self.current_tag_name.push_char(c);
    }

    fn finish_attribute(&mut self) {
        let Some(attr) = self.current_attr.take() else { return };
        if attr.name.is_empty() {
            return;
        }
        let name = LocalName::from(&*attr.name);
        if self.current_tag_attrs.iter().any(|a| a.name.local == name) {
            self.error("duplicate-attribute");
            return;
        }
        self.current_tag_attrs.push(markup_core::Attribute {
            name: markup_core::QualName::html(name),
            value: attr.value,
        });
    }

    fn is_appropriate_end_tag(&self) -> bool {
        self.current_tag_kind == TagKind::EndTag
            && self.last_start_tag_name.as_deref() == Some(&*self.current_tag_name)
    }

    fn step(&mut self, input: &mut InputStream) -> bool {
        if self.char_ref_tokenizer.is_some() {
            return self.step_char_ref(input);
        }
        macro_rules! get_char {
            () => {
                match self.get_char(input) {
                    Some(c) => c,
                    None => return false,
                }
            };
        }

        match self.state {
            State::Data => {
                match input.chars_until(markup_core::small_char_set!(b'&' b'<' b'\0'), true) {
                    Some(run) if !run.is_empty() => {
                        self.emit_chars(run);
                        true
                    },
                    _ => {
                        let c = get_char!();
                        match c {
                            '&' => {
                                self.consume_char_ref(input, None);
                                true
                            },
                            '<' => {
                                self.state = State::TagOpen;
                                true
                            },
                            '\0' => {
                                self.error("unexpected-null-character");
                                self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                                true
                            },
                            _ => {
                                self.emit_chars(StrTendril::from_char(c));
                                true
                            },
                        }
                    },
                }
            },

            State::Plaintext => match get_char!() {
                '\0' => {
                    self.error("unexpected-null-character");
                    self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_char(c));
                    true
                },
            },

            State::TagOpen => match get_char!() {
                '!' => {
                    self.state = State::MarkupDeclarationOpen;
                    true
                },
                '/' => {
                    self.state = State::EndTagOpen;
                    true
                },
                c if c.is_ascii_alphabetic() => {
                    self.create_tag(TagKind::StartTag, c.to_ascii_lowercase());
                    self.state = State::TagName;
                    true
                },
                '?' => {
                    self.error("unexpected-question-mark-instead-of-tag-name");
                    self.current_comment = StrTendril::new();
                    input.unget('?');
                    self.state = State::BogusComment;
                    true
                },
                c => {
                    self.error("invalid-first-character-of-tag-name");
                    self.emit_chars(StrTendril::from_char('<'));
                    input.unget(c);
                    self.state = State::Data;
                    true
                },
            },

            State::EndTagOpen => match get_char!() {
                c if c.is_ascii_alphabetic() => {
                    self.create_tag(TagKind::EndTag, c.to_ascii_lowercase());
                    self.state = State::TagName;
                    true
                },
                '>' => {
                    self.error("missing-end-tag-name");
                    self.state = State::Data;
                    true
                },
                c => {
                    self.error("invalid-first-character-of-tag-name");
                    self.current_comment = StrTendril::new();
                    input.unget(c);
                    self.state = State::BogusComment;
                    true
                },
            },

            State::TagName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.state = State::BeforeAttributeName;
                    true
                },
                '/' => {
                    self.state = State::SelfClosingStartTag;
                    true
                },
                '>' => {
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.current_tag_name.push_char('\u{FFFD}');
                    true
                },
                c => {
                    self.current_tag_name.push_char(c.to_ascii_lowercase());
                    true
                },
            },

            State::RawLessThanSign(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)) => {
                match get_char!() {
                    '/' => {
                        self.temp_buf = StrTendril::new();
                        self.state = State::RawEndTagOpen(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped));
                        true
                    },
                    c if c.is_ascii_alphabetic() => {
                        self.temp_buf = StrTendril::new();
                        self.temp_buf.push_char(c.to_ascii_lowercase());
                        self.emit_chars(StrTendril::from_char('<'));
                        self.emit_chars(StrTendril::from_char(c));
                        self.state = State::ScriptDataEscapeStart(ScriptEscapeKind::DoubleEscaped);
                        true
                    },
                    c => {
                        self.emit_chars(StrTendril::from_char('<'));
                        input.unget(c);
                        self.state = State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped));
                        true
                    },
                }
            },

            State::RawLessThanSign(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)) => {
                match get_char!() {
                    '/' => {
                        self.temp_buf = StrTendril::new();
                        self.emit_chars(StrTendril::from_char('/'));
                        self.state = State::ScriptDataDoubleEscapeEnd;
                        true
                    },
                    c => {
                        input.unget(c);
                        self.state = State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped));
                        true
                    },
                }
            },

            State::RawLessThanSign(kind) => match get_char!() {
                '/' => {
                    self.temp_buf = StrTendril::new();
                    self.state = State::RawEndTagOpen(kind);
                    true
                },
                '!' if kind == RawKind::ScriptData => {
                    self.emit_chars(StrTendril::from_char('<'));
                    self.emit_chars(StrTendril::from_char('!'));
                    self.state = State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped);
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_char('<'));
                    input.unget(c);
                    self.state = State::RawData(kind);
                    true
                },
            },

            State::RawEndTagOpen(kind) => match get_char!() {
                c if c.is_ascii_alphabetic() => {
                    self.create_tag(TagKind::EndTag, c.to_ascii_lowercase());
                    self.temp_buf.push_char(c);
                    self.state = State::RawEndTagName(kind);
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_char('<'));
                    self.emit_chars(StrTendril::from_char('/'));
                    input.unget(c);
                    self.state = State::RawData(kind);
                    true
                },
            },

            State::RawEndTagName(kind) => {
                let c = get_char!();
                let is_whitespace = matches!(c, '\t' | '\n' | '\x0C' | ' ');
                if (is_whitespace || c == '/' || c == '>') && self.is_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => self.state = State::BeforeAttributeName,
                        '/' => self.state = State::SelfClosingStartTag,
                        '>' => {
                            self.emit_tag();
                            self.state = State::Data;
                        },
                        _ => unreachable!(),
                    }
                    return true;
                }
                if c.is_ascii_alphabetic() {
                    self.current_tag_name.push_char(c.to_ascii_lowercase());
                    self.temp_buf.push_char(c);
                    true
                } else {
                    self.emit_chars(StrTendril::from_char('<'));
                    self.emit_chars(StrTendril::from_char('/'));
                    self.emit_chars(self.temp_buf.clone());
                    input.unget(c);
                    self.discard_tag();
                    self.state = State::RawData(kind);
                    true
                }
            },

            State::RawData(kind) => match kind {
                RawKind::ScriptData => self.step_script_data(input),
                RawKind::ScriptDataEscaped(esc) => self.step_script_data_escaped(input, esc),
                RawKind::Rcdata | RawKind::Rawtext => {
                    match get_char!() {
                        '<' => {
                            self.state = State::RawLessThanSign(kind);
                            true
                        },
                        '\0' => {
                            self.error("unexpected-null-character");
                            self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                            true
                        },
                        c => {
                            self.emit_chars(StrTendril::from_char(c));
                            true
                        },
                    }
                },
            },

            State::ScriptDataEscapeStartDash => match get_char!() {
                '-' => {
                    self.emit_chars(StrTendril::from_char('-'));
                    self.state = State::ScriptDataEscapedDashDash(ScriptEscapeKind::Escaped);
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::RawData(RawKind::ScriptData);
                    true
                },
            },

            State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped) => match get_char!() {
                '-' => {
                    self.emit_chars(StrTendril::from_char('-'));
                    self.state = State::ScriptDataEscapeStartDash;
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::RawData(RawKind::ScriptData);
                    true
                },
            },

            // script-data-double-escape-start-state: accumulate `temp_buf`
            // and compare it to "script" once a delimiter is seen, deciding
            // whether the nested `<script>` actually opened double-escaped
            // mode.
            State::ScriptDataEscapeStart(ScriptEscapeKind::DoubleEscaped) => {
                let c = get_char!();
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            ScriptEscapeKind::DoubleEscaped
                        } else {
                            ScriptEscapeKind::Escaped
                        };
                        self.emit_chars(StrTendril::from_char(c));
                        self.state = State::RawData(RawKind::ScriptDataEscaped(esc));
                        true
                    },
                    c if c.is_ascii_alphabetic() => {
                        self.temp_buf.push_char(c.to_ascii_lowercase());
                        self.emit_chars(StrTendril::from_char(c));
                        true
                    },
                    c => {
                        input.unget(c);
                        self.state = State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped));
                        true
                    },
                }
            },

            State::ScriptDataEscapedDash(esc) => self.step_escaped_dash(input, esc, false),
            State::ScriptDataEscapedDashDash(esc) => self.step_escaped_dash(input, esc, true),

            State::ScriptDataDoubleEscapeEnd => {
                let c = get_char!();
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            ScriptEscapeKind::Escaped
                        } else {
                            ScriptEscapeKind::DoubleEscaped
                        };
                        self.emit_chars(StrTendril::from_char(c));
                        self.state = State::RawData(RawKind::ScriptDataEscaped(esc));
                        true
                    },
                    c if c.is_ascii_alphabetic() => {
                        self.temp_buf.push_char(c.to_ascii_lowercase());
                        self.emit_chars(StrTendril::from_char(c));
                        true
                    },
                    c => {
                        input.unget(c);
                        self.state = State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped));
                        true
                    },
                }
            },

            State::BeforeAttributeName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '/' => {
                    self.finish_attribute();
                    self.state = State::SelfClosingStartTag;
                    true
                },
                '>' => {
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                '=' => {
                    self.error("unexpected-equals-sign-before-attribute-name");
                    self.finish_attribute();
                    self.current_attr = Some(AttrBuilder {
                        name: StrTendril::from_char('='),
                        value: StrTendril::new(),
                    });
                    self.state = State::AttributeName;
                    true
                },
                c => {
                    self.finish_attribute();
                    self.current_attr = Some(AttrBuilder {
                        name: StrTendril::new(),
                        value: StrTendril::new(),
                    });
                    input.unget(c);
                    self.state = State::AttributeName;
                    true
                },
            },

            State::AttributeName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.state = State::AfterAttributeName;
                    true
                },
                '/' => {
                    self.state = State::SelfClosingStartTag;
                    true
                },
                '=' => {
                    self.state = State::BeforeAttributeValue;
                    true
                },
                '>' => {
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.attr_name_mut().push_char('\u{FFFD}');
                    true
                },
                c @ ('"' | '\'' | '<') => {
                    self.error("unexpected-character-in-attribute-name");
                    self.attr_name_mut().push_char(c);
                    true
                },
                c => {
                    self.attr_name_mut().push_char(c.to_ascii_lowercase());
                    true
                },
            },

            State::AfterAttributeName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '/' => {
                    self.finish_attribute();
                    self.state = State::SelfClosingStartTag;
                    true
                },
                '=' => {
                    self.state = State::BeforeAttributeValue;
                    true
                },
                '>' => {
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                c => {
                    self.finish_attribute();
                    self.current_attr = Some(AttrBuilder {
                        name: StrTendril::new(),
                        value: StrTendril::new(),
                    });
                    input.unget(c);
                    self.state = State::AttributeName;
                    true
                },
            },

            State::BeforeAttributeValue => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '"' => {
                    self.state = State::AttributeValue(AttrValueKind::DoubleQuoted);
                    true
                },
                '\'' => {
                    self.state = State::AttributeValue(AttrValueKind::SingleQuoted);
                    true
                },
                '>' => {
                    self.error("missing-attribute-value");
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::AttributeValue(AttrValueKind::Unquoted);
                    true
                },
            },

            State::AttributeValue(kind) => self.step_attr_value(input, kind),

            State::AfterAttributeValueQuoted => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.finish_attribute();
                    self.state = State::BeforeAttributeName;
                    true
                },
                '/' => {
                    self.finish_attribute();
                    self.state = State::SelfClosingStartTag;
                    true
                },
                '>' => {
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                c => {
                    self.error("missing-whitespace-between-attributes");
                    input.unget(c);
                    self.state = State::BeforeAttributeName;
                    true
                },
            },

            State::SelfClosingStartTag => match get_char!() {
                '>' => {
                    self.current_tag_self_closing = true;
                    self.finish_attribute();
                    self.emit_tag();
                    self.state = State::Data;
                    true
                },
                c => {
                    self.error("unexpected-solidus-in-tag");
                    input.unget(c);
                    self.state = State::BeforeAttributeName;
                    true
                },
            },

            State::BogusComment => match get_char!() {
                '>' => {
                    self.process(Token::Comment(std::mem::take(&mut self.current_comment)));
                    self.state = State::Data;
                    true
                },
                '\0' => {
                    self.current_comment.push_char('\u{FFFD}');
                    true
                },
                c => {
                    self.current_comment.push_char(c);
                    true
                },
            },

            State::MarkupDeclarationOpen => {
                if input.peek() == Some('-') {
                    input.consume();
                    if input.peek() == Some('-') {
                        input.consume();
                        self.current_comment = StrTendril::new();
                        self.state = State::CommentStart;
                        return true;
                    }
                    input.unget('-');
                }
                if self.match_keyword_ci(input, "doctype") {
                    self.state = State::Doctype;
                    return true;
                }
                if self.match_keyword_cs(input, "[CDATA[") {
                    self.state = State::CdataSection;
                    return true;
                }
                self.error("incorrectly-opened-comment");
                self.current_comment = StrTendril::new();
                self.state = State::BogusComment;
                true
            },

            State::CommentStart => match get_char!() {
                '-' => {
                    self.state = State::CommentStartDash;
                    true
                },
                '>' => {
                    self.error("abrupt-closing-of-empty-comment");
                    self.process(Token::Comment(std::mem::take(&mut self.current_comment)));
                    self.state = State::Data;
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::CommentStartDash => match get_char!() {
                '-' => {
                    self.state = State::CommentEnd;
                    true
                },
                '>' => {
                    self.error("abrupt-closing-of-empty-comment");
                    self.process(Token::Comment(std::mem::take(&mut self.current_comment)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.current_comment.push_char('-');
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::Comment => match get_char!() {
                '<' => {
                    self.current_comment.push_char('<');
                    self.state = State::CommentLessThanSign;
                    true
                },
                '-' => {
                    self.state = State::CommentEndDash;
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.current_comment.push_char('\u{FFFD}');
                    true
                },
                c => {
                    self.current_comment.push_char(c);
                    true
                },
            },

            State::CommentLessThanSign => match get_char!() {
                '!' => {
                    self.current_comment.push_char('!');
                    self.state = State::CommentLessThanSignBang;
                    true
                },
                '<' => {
                    self.current_comment.push_char('<');
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::CommentLessThanSignBang => match get_char!() {
                '-' => {
                    self.state = State::CommentLessThanSignBangDash;
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::CommentLessThanSignBangDash => match get_char!() {
                '-' => {
                    self.state = State::CommentLessThanSignBangDashDash;
                    true
                },
                c => {
                    input.unget(c);
                    self.state = State::CommentEndDash;
                    true
                },
            },

            State::CommentLessThanSignBangDashDash => match get_char!() {
                '>' => {
                    input.unget('>');
                    self.state = State::CommentEnd;
                    true
                },
                c => {
                    self.error("nested-comment");
                    input.unget(c);
                    self.state = State::CommentEnd;
                    true
                },
            },

            State::CommentEndDash => match get_char!() {
                '-' => {
                    self.state = State::CommentEnd;
                    true
                },
                c => {
                    self.current_comment.push_char('-');
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::CommentEnd => match get_char!() {
                '>' => {
                    self.process(Token::Comment(std::mem::take(&mut self.current_comment)));
                    self.state = State::Data;
                    true
                },
                '!' => {
                    self.state = State::CommentEndBang;
                    true
                },
                '-' => {
                    self.current_comment.push_char('-');
                    true
                },
                c => {
                    self.current_comment.push_slice("--");
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::CommentEndBang => match get_char!() {
                '-' => {
                    self.current_comment.push_slice("--!");
                    self.state = State::CommentEndDash;
                    true
                },
                '>' => {
                    self.error("incorrectly-closed-comment");
                    self.process(Token::Comment(std::mem::take(&mut self.current_comment)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.current_comment.push_slice("--!");
                    input.unget(c);
                    self.state = State::Comment;
                    true
                },
            },

            State::Doctype => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.state = State::BeforeDoctypeName;
                    true
                },
                c => {
                    self.error("missing-whitespace-before-doctype-name");
                    input.unget(c);
                    self.state = State::BeforeDoctypeName;
                    true
                },
            },

            State::BeforeDoctypeName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '\0' => {
                    self.error("unexpected-null-character");
                    self.current_doctype = Doctype::new();
                    self.current_doctype.name = Some(StrTendril::from_char('\u{FFFD}'));
                    self.state = State::DoctypeName;
                    true
                },
                '>' => {
                    self.error("missing-doctype-name");
                    self.current_doctype = Doctype::new();
                    self.current_doctype.correct = false;
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.current_doctype = Doctype::new();
                    self.current_doctype.name = Some(StrTendril::from_char(c.to_ascii_lowercase()));
                    self.state = State::DoctypeName;
                    true
                },
            },

            State::DoctypeName => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.state = State::AfterDoctypeName;
                    true
                },
                '>' => {
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.doctype_name_mut().push_char('\u{FFFD}');
                    true
                },
                c => {
                    self.doctype_name_mut().push_char(c.to_ascii_lowercase());
                    true
                },
            },

            State::AfterDoctypeName => {
                if self.match_keyword_ci(input, "public") {
                    self.state = State::AfterDoctypeKeyword(DoctypeIdKind::Public);
                    return true;
                }
                if self.match_keyword_ci(input, "system") {
                    self.state = State::AfterDoctypeKeyword(DoctypeIdKind::System);
                    return true;
                }
                match get_char!() {
                    '\t' | '\n' | '\x0C' | ' ' => true,
                    '>' => {
                        self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                        self.state = State::Data;
                        true
                    },
                    c => {
                        self.error("invalid-character-sequence-after-doctype-name");
                        self.current_doctype.correct = false;
                        input.unget(c);
                        self.state = State::BogusDoctype;
                        true
                    },
                }
            },

            State::AfterDoctypeKeyword(kind) => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    self.state = State::BeforeDoctypeIdentifier(kind);
                    true
                },
                '"' => {
                    self.error("missing-whitespace-after-doctype-public-keyword");
                    self.set_doctype_id(kind, StrTendril::new());
                    self.state = State::DoctypeIdentifierDoubleQuoted(kind);
                    true
                },
                '\'' => {
                    self.error("missing-whitespace-after-doctype-public-keyword");
                    self.set_doctype_id(kind, StrTendril::new());
                    self.state = State::DoctypeIdentifierSingleQuoted(kind);
                    true
                },
                '>' => {
                    self.error("missing-doctype-public-identifier");
                    self.current_doctype.correct = false;
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.error("missing-quote-before-doctype-public-identifier");
                    self.current_doctype.correct = false;
                    input.unget(c);
                    self.state = State::BogusDoctype;
                    true
                },
            },

            State::BeforeDoctypeIdentifier(kind) => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '"' => {
                    self.set_doctype_id(kind, StrTendril::new());
                    self.state = State::DoctypeIdentifierDoubleQuoted(kind);
                    true
                },
                '\'' => {
                    self.set_doctype_id(kind, StrTendril::new());
                    self.state = State::DoctypeIdentifierSingleQuoted(kind);
                    true
                },
                '>' => {
                    self.error("missing-doctype-identifier");
                    self.current_doctype.correct = false;
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.error("missing-quote-before-doctype-identifier");
                    self.current_doctype.correct = false;
                    input.unget(c);
                    self.state = State::BogusDoctype;
                    true
                },
            },

            State::DoctypeIdentifierDoubleQuoted(kind) => match get_char!() {
                '"' => {
                    self.state = State::AfterDoctypeIdentifier(kind);
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.doctype_id_mut(kind).push_char('\u{FFFD}');
                    true
                },
                '>' => {
                    self.error("abrupt-doctype-public-identifier");
                    self.current_doctype.correct = false;
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.doctype_id_mut(kind).push_char(c);
                    true
                },
            },

            State::DoctypeIdentifierSingleQuoted(kind) => match get_char!() {
                '\'' => {
                    self.state = State::AfterDoctypeIdentifier(kind);
                    true
                },
                '\0' => {
                    self.error("unexpected-null-character");
                    self.doctype_id_mut(kind).push_char('\u{FFFD}');
                    true
                },
                '>' => {
                    self.error("abrupt-doctype-public-identifier");
                    self.current_doctype.correct = false;
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c => {
                    self.doctype_id_mut(kind).push_char(c);
                    true
                },
            },

            State::AfterDoctypeIdentifier(kind) => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => {
                    if kind == DoctypeIdKind::Public {
                        self.state = State::BetweenDoctypePublicAndSystemIdentifiers;
                    }
                    true
                },
                '>' => {
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                c if kind == DoctypeIdKind::Public => {
                    self.error("missing-quote-before-doctype-system-identifier");
                    input.unget(c);
                    self.state = State::BogusDoctype;
                    true
                },
                c => {
                    self.error("unexpected-character-after-doctype-system-identifier");
                    input.unget(c);
                    self.state = State::BogusDoctype;
                    true
                },
            },

            State::BetweenDoctypePublicAndSystemIdentifiers => match get_char!() {
                '\t' | '\n' | '\x0C' | ' ' => true,
                '>' => {
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                '"' => {
                    self.set_doctype_id(DoctypeIdKind::System, StrTendril::new());
                    self.state = State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System);
                    true
                },
                '\'' => {
                    self.set_doctype_id(DoctypeIdKind::System, StrTendril::new());
                    self.state = State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System);
                    true
                },
                c => {
                    self.error("missing-quote-before-doctype-system-identifier");
                    input.unget(c);
                    self.state = State::BogusDoctype;
                    true
                },
            },

            State::BogusDoctype => match get_char!() {
                '>' => {
                    self.process(Token::Doctype(std::mem::take(&mut self.current_doctype)));
                    self.state = State::Data;
                    true
                },
                _ => true,
            },

            State::CdataSection => match get_char!() {
                ']' => {
                    self.state = State::CdataSectionBracket;
                    true
                },
                '\0' => {
                    self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_char(c));
                    true
                },
            },

            State::CdataSectionBracket => match get_char!() {
                ']' => {
                    self.state = State::CdataSectionEnd;
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_char(']'));
                    input.unget(c);
                    self.state = State::CdataSection;
                    true
                },
            },

            State::CdataSectionEnd => match get_char!() {
                ']' => {
                    self.emit_chars(StrTendril::from_char(']'));
                    true
                },
                '>' => {
                    self.state = State::Data;
                    true
                },
                c => {
                    self.emit_chars(StrTendril::from_slice("]]"));
                    input.unget(c);
                    self.state = State::CdataSection;
                    true
                },
            },
        }
    }

    fn step_script_data(&mut self, input: &mut InputStream) -> bool {
        match input.consume() {
            None => false,
            Some('<') => {
                self.state = State::RawLessThanSign(RawKind::ScriptData);
                true
            },
            Some('-') => {
                self.emit_chars(StrTendril::from_char('-'));
                self.state = State::ScriptDataEscapeStartDash;
                true
            },
            Some('\0') => {
                self.error("unexpected-null-character");
                self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                true
            },
            Some(c) => {
                self.emit_chars(StrTendril::from_char(c));
                true
            },
        }
    }

    fn step_script_data_escaped(&mut self, input: &mut InputStream, esc: ScriptEscapeKind) -> bool {
        match input.consume() {
            None => false,
            Some('<') => {
                self.state = State::RawLessThanSign(RawKind::ScriptDataEscaped(esc));
                true
            },
            Some('-') => {
                self.emit_chars(StrTendril::from_char('-'));
                self.state = State::ScriptDataEscapedDash(esc);
                true
            },
            Some('\0') => {
                self.error("unexpected-null-character");
                self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                true
            },
            Some(c) => {
                self.emit_chars(StrTendril::from_char(c));
                true
            },
        }
    }

    fn step_escaped_dash(
        &mut self,
        input: &mut InputStream,
        esc: ScriptEscapeKind,
        double_dash: bool,
    ) -> bool {
        match input.consume() {
            None => false,
            Some('-') => {
                self.emit_chars(StrTendril::from_char('-'));
                self.state = State::ScriptDataEscapedDashDash(esc);
                true
            },
            Some('<') => {
                if esc == ScriptEscapeKind::DoubleEscaped {
                    self.emit_chars(StrTendril::from_char('<'));
                }
                self.state = State::RawLessThanSign(RawKind::ScriptDataEscaped(esc));
                true
            },
            Some('>') if double_dash => {
                self.emit_chars(StrTendril::from_char('>'));
                self.state = State::RawData(RawKind::ScriptData);
                true
            },
            Some('\0') => {
                self.error("unexpected-null-character");
                self.emit_chars(StrTendril::from_char('\u{FFFD}'));
                self.state = State::RawData(RawKind::ScriptDataEscaped(esc));
                true
            },
            Some(c) => {
                self.emit_chars(StrTendril::from_char(c));
                self.state = State::RawData(RawKind::ScriptDataEscaped(esc));
                true
            },
        }
    }

    fn step_attr_value(&mut self, input: &mut InputStream, kind: AttrValueKind) -> bool {
        let terminator: Option<char> = match kind {
            AttrValueKind::DoubleQuoted => Some('"'),
            AttrValueKind::SingleQuoted => Some('\''),
            AttrValueKind::Unquoted => None,
        };
        match input.consume() {
            None => false,
            Some(c) if terminator == Some(c) => {
                self.state = State::AfterAttributeValueQuoted;
                true
            },
            Some('>') if terminator.is_none() => {
                self.finish_attribute();
                self.emit_tag();
                self.state = State::Data;
                true
            },
            Some(c) if terminator.is_none() && matches!(c, '\t' | '\n' | '\x0C' | ' ') => {
                self.finish_attribute();
                self.state = State::BeforeAttributeName;
                true
            },
            Some('&') => {
                let next_kind = if terminator.is_none() {
                    Some(AttrValueKind::Unquoted)
                } else {
                    Some(kind)
                };
                self.consume_char_ref(input, next_kind);
                true
            },
            Some('\0') => {
                self.error("unexpected-null-character");
                self.attr_value_mut().push_char('\u{FFFD}');
                true
            },
            Some(c @ ('"' | '\'' | '<' | '=' | '`')) if terminator.is_none() => {
                self.error("unexpected-character-in-unquoted-attribute-value");
                self.attr_value_mut().push_char(c);
                true
            },
            Some(c) => {
                self.attr_value_mut().push_char(c);
                true
            },
        }
    }

    fn attr_name_mut(&mut self) -> &mut StrTendril {
        &mut self.current_attr.as_mut().expect("attribute not started").name
    }

    fn attr_value_mut(&mut self) -> &mut StrTendril {
        &mut self.current_attr.as_mut().expect("attribute not started").value
    }

    fn doctype_name_mut(&mut self) -> &mut StrTendril {
        self.current_doctype.name.as_mut().expect("doctype name not started")
    }

    fn set_doctype_id(&mut self, kind: DoctypeIdKind, v: StrTendril) {
        match kind {
            DoctypeIdKind::Public => self.current_doctype.public_id = Some(v),
            DoctypeIdKind::System => self.current_doctype.system_id = Some(v),
        }
    }

    fn doctype_id_mut(&mut self, kind: DoctypeIdKind) -> &mut StrTendril {
        match kind {
            DoctypeIdKind::Public => self.current_doctype.public_id.as_mut(),
            DoctypeIdKind::System => self.current_doctype.system_id.as_mut(),
        }
        .expect("doctype identifier not started")
    }

    fn get_char(&mut self, input: &mut InputStream) -> Option<char> {
        input.consume()
    }

    fn emit_chars(&mut self, text: StrTendril) {
        if text.is_empty() {
            return;
        }
        if text.chars().all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' ')) {
            self.process(Token::SpaceCharacters(text));
        } else {
            self.process(Token::Characters(text));
        }
    }

    fn match_keyword_ci(&mut self, input: &mut InputStream, kw: &str) -> bool {
        let mut consumed = String::new();
        for expect in kw.chars() {
            match input.consume() {
                Some(c) if c.eq_ignore_ascii_case(&expect) => consumed.push(c),
                Some(c) => {
                    consumed.push(c);
                    input.unconsume(&consumed);
                    return false;
                },
                None => {
                    input.unconsume(&consumed);
                    return false;
                },
            }
        }
        true
    }

    fn match_keyword_cs(&mut self, input: &mut InputStream, kw: &str) -> bool {
        let mut consumed = String::new();
        for expect in kw.chars() {
            match input.consume() {
                Some(c) if c == expect => consumed.push(c),
                Some(c) => {
                    consumed.push(c);
                    input.unconsume(&consumed);
                    return false;
                },
                None => {
                    input.unconsume(&consumed);
                    return false;
                },
            }
        }
        true
    }

    fn consume_char_ref(&mut self, input: &mut InputStream, attr_kind: Option<AttrValueKind>) {
        let in_attr = attr_kind.is_some();
        let mut crt = Box::new(CharRefTokenizer::new(in_attr));
        self.char_ref_tokenizer_attr = attr_kind;
        match crt.step(input) {
            CharRefStatus::Done(cr) => self.emit_char_ref_result(&mut crt, cr),
            CharRefStatus::Progress | CharRefStatus::Stuck => {
                self.char_ref_tokenizer = Some(crt);
            },
        }
    }

    fn step_char_ref(&mut self, input: &mut InputStream) -> bool {
        let mut crt = self.char_ref_tokenizer.take().unwrap();
        match crt.step(input) {
            CharRefStatus::Progress => {
                self.char_ref_tokenizer = Some(crt);
                true
            },
            CharRefStatus::Stuck => {
                self.char_ref_tokenizer = Some(crt);
                false
            },
            CharRefStatus::Done(cr) => {
                self.emit_char_ref_result(&mut crt, cr);
                true
            },
        }
    }

    fn emit_char_ref_result(&mut self, crt: &mut CharRefTokenizer, cr: char_ref::CharRef) {
        for e in crt.errors.drain(..) {
            self.error(e);
        }
        let mut text = StrTendril::new();
        for &c in &cr.chars[..cr.num_chars as usize] {
            text.push_char(c);
        }
        if text.is_empty() {
            text.push_char('&');
        }
        match self.char_ref_tokenizer_attr.take() {
            Some(_) => self.attr_value_mut().push_tendril(&text),
            None => self.emit_chars(text),
        }
    }
}
