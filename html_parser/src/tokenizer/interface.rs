// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Token types the tokenizer emits (§3) and the [`TokenSink`] trait the
//! tree constructor implements to receive them.

use markup_core::tendril::StrTendril;
use markup_core::Attribute;

use crate::tokenizer::states::RawKind;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}
pub use TagKind::{EndTag, StartTag};

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: markup_core::LocalName,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// `true` if `self` and `other` are start/end tags of the same name —
    /// used to recognize CDATA-like end tags that must match the last
    /// start tag exactly (§4.3).
    pub fn equiv_modulo_attrs(&self, other: &Tag) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub correct: bool,
}

impl Doctype {
    pub fn new() -> Doctype {
        Doctype {
            correct: true,
            ..Default::default()
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Comment(StrTendril),
    Characters(StrTendril),
    /// Whitespace-only run, kept distinct per §3 so insertion modes that
    /// special-case whitespace don't need to re-scan it.
    SpaceCharacters(StrTendril),
    NullCharacter,
    ParseError(&'static str),
    Eof,
}

pub use Token::{Characters as CharacterTokens, Comment as CommentToken, Doctype as DoctypeToken};
pub use Token::{Eof as EOFToken, NullCharacter as NullCharacterToken, ParseError, Tag as TagToken};

/// What the tokenizer should do next, as instructed by the token sink
/// (§2: "control also flows backward").
pub enum TokenSinkResult<Handle> {
    Continue,
    Script(Handle),
    Plaintext,
    RawData(RawKind),
}

/// The tree constructor's view of the tokenizer: a sink that receives one
/// token at a time and can ask the tokenizer to change state.
pub trait TokenSink {
    type Handle;

    fn process_token(&mut self, token: Token, line_number: u64) -> TokenSinkResult<Self::Handle>;

    /// Called once, after the final `Eof` token, to let the sink flush any
    /// pending work (e.g. the table-text accumulator).
    fn end(&mut self) {}

    fn adjusted_current_node_present_but_in_html_namespace(&self) -> bool {
        false
    }
}
