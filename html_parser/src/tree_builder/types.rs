// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types shared across the tree constructor (§5): insertion modes, the
//! tree-builder's token vocabulary, and the small state machines
//! (adoption agency bookmarks, active-formatting-element markers) that
//! `mod.rs` and `rules.rs` build on.

use markup_core::tendril::StrTendril;

use crate::tokenizer::interface::{Doctype, Tag};

/// §5.2's insertion modes.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// The tree constructor's view of a token — the tokenizer's [`Token`]
/// minus the distinction the tree builder doesn't need (`SpaceCharacters`
/// collapses into `Characters` except where an insertion mode special-
/// cases whitespace, which inspects the original token before this
/// translation happens).
#[derive(Debug)]
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Comment(StrTendril),
    Characters(SplitStatus, StrTendril),
    NullCharacter,
    Eof,
}

/// Whether a just-consumed run of characters contained only whitespace,
/// and if not, whether the whitespace prefix was already split off by a
/// previous reprocessing pass (§5: insertion modes that only act on
/// leading whitespace reprocess the remainder once).
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum SplitStatus {
    NotSplit,
    Whitespace,
    NotWhitespace,
}

pub enum ProcessResult<Handle> {
    Done,
    DoneAckSelfClosing,
    SplitWhitespace(StrTendril),
    Reprocess(InsertionMode, Token),
    ReprocessForeign(Token),
    Script(Handle),
    ToPlaintext,
    ToRawText(crate::tokenizer::states::RawKind),
}

/// An entry in the list of active formatting elements (§5.3).
#[derive(Clone)]
pub enum FormatEntry<Handle> {
    Element(Handle, Tag),
    Marker,
}

/// Where to insert a new node, resolved by the foster-parenting algorithm
/// (§5.3 "appropriate place for inserting a node").
pub enum InsertionPoint<Handle> {
    LastChild(Handle),
    BeforeSibling(Handle),
    TableFosterParenting { element: Handle, prev_element: Handle },
}

/// A position to come back to after the adoption agency algorithm
/// reshuffles the list of active formatting elements (§5.3 step 14).
pub enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}
