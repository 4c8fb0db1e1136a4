// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! §5.2's insertion-mode dispatch tables. Each function implements "the
//! rules for the __ insertion mode" for one token, returning a
//! [`ProcessResult`] that tells `mod.rs` whether to continue, reprocess
//! the same token under a different mode, or hand control back to the
//! tokenizer (text modes, `<script>`).

use markup_core::tree_sink::{AppendNode, ElementFlags, QuirksMode, TreeSink};
use markup_core::{ns, LocalName};

use crate::tokenizer::interface::{Tag, TagKind};
use crate::tokenizer::states::RawKind;

use super::stack::Scope;
use super::types::{InsertionMode, ProcessResult, SplitStatus, Token};
use super::TreeBuilder;

type PR<Sink> = ProcessResult<<Sink as TreeSink>::Handle>;

const FORMATTING: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
];

fn is_whitespace(s: &str) -> bool {
    s.chars().all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
}

pub fn step<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, mode: InsertionMode, token: Token) -> PR<Sink> {
    match mode {
        InsertionMode::Initial => initial(tb, token),
        InsertionMode::BeforeHtml => before_html(tb, token),
        InsertionMode::BeforeHead => before_head(tb, token),
        InsertionMode::InHead => in_head(tb, token),
        InsertionMode::InHeadNoscript => in_head_noscript(tb, token),
        InsertionMode::AfterHead => after_head(tb, token),
        InsertionMode::InBody => in_body(tb, token),
        InsertionMode::Text => text_mode(tb, token),
        InsertionMode::InTable => in_table(tb, token),
        InsertionMode::InTableText => in_table_text(tb, token),
        InsertionMode::InCaption => in_caption(tb, token),
        InsertionMode::InColumnGroup => in_column_group(tb, token),
        InsertionMode::InTableBody => in_table_body(tb, token),
        InsertionMode::InRow => in_row(tb, token),
        InsertionMode::InCell => in_cell(tb, token),
        InsertionMode::InSelect => in_select(tb, token),
        InsertionMode::InSelectInTable => in_select_in_table(tb, token),
        InsertionMode::InTemplate => in_template(tb, token),
        InsertionMode::AfterBody => after_body(tb, token),
        InsertionMode::InFrameset => in_frameset(tb, token),
        InsertionMode::AfterFrameset => after_frameset(tb, token),
        InsertionMode::AfterAfterBody => after_after_body(tb, token),
        InsertionMode::AfterAfterFrameset => after_after_frameset(tb, token),
    }
}

fn is_tag(t: &Tag, kind: TagKind, name: &str) -> bool {
    t.kind == kind && &*t.name == name
}

fn is_start(t: &Tag, name: &str) -> bool {
    is_tag(t, TagKind::StartTag, name)
}
fn is_end(t: &Tag, name: &str) -> bool {
    is_tag(t, TagKind::EndTag, name)
}
fn is_start_any(t: &Tag, names: &[&str]) -> bool {
    t.kind == TagKind::StartTag && names.contains(&&*t.name)
}
fn is_end_any(t: &Tag, names: &[&str]) -> bool {
    t.kind == TagKind::EndTag && names.contains(&&*t.name)
}

fn initial<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
        Token::Comment(text) => {
            tb.append_comment_to_doc(text);
            ProcessResult::Done
        },
        Token::Doctype(d) => {
            let quirks = super::quirks::doctype_quirks_mode(&d, tb.opts.iframe_srcdoc);
            tb.sink.append_doctype_to_document(
                d.name.unwrap_or_default(),
                d.public_id.unwrap_or_default(),
                d.system_id.unwrap_or_default(),
            );
            tb.set_quirks_mode(quirks);
            tb.mode = InsertionMode::BeforeHtml;
            ProcessResult::Done
        },
        token => ProcessResult::Reprocess(InsertionMode::BeforeHtml, token),
    }
}

fn before_html<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
        Token::Comment(text) => {
            tb.append_comment_to_doc(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-before-html");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => {
            let elem = tb.create_element(LocalName::from("html"), t.attrs.clone(), ElementFlags::default());
            let doc = tb.doc_handle.clone();
            tb.sink.append(&doc, AppendNode(elem.clone()));
            tb.open_elems.push(elem);
            tb.mode = InsertionMode::BeforeHead;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["head", "body", "html", "br"]) => {
            before_html_anything_else(tb, token)
        },
        Token::Tag(ref t) if t.kind == TagKind::EndTag => ProcessResult::Done,
        _ => before_html_anything_else(tb, token),
    }
}

fn before_html_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    let elem = tb.create_element(LocalName::from("html"), Vec::new(), ElementFlags::default());
    let doc = tb.doc_handle.clone();
    tb.sink.append(&doc, AppendNode(elem.clone()));
    tb.open_elems.push(elem);
    tb.mode = InsertionMode::BeforeHead;
    ProcessResult::Reprocess(InsertionMode::BeforeHead, token)
}

fn before_head<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-before-head");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "head") => {
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            tb.head_elem = Some(elem);
            tb.mode = InsertionMode::InHead;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["head", "body", "html", "br"]) => {
            before_head_anything_else(tb, token)
        },
        Token::Tag(ref t) if t.kind == TagKind::EndTag => ProcessResult::Done,
        _ => before_head_anything_else(tb, token),
    }
}

fn before_head_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    let tag = Tag {
        kind: TagKind::StartTag,
        name: LocalName::from("head"),
        self_closing: false,
        attrs: Vec::new(),
    };
    let elem = tb.insert_element(tag, ElementFlags::default());
    tb.head_elem = Some(elem);
    tb.mode = InsertionMode::InHead;
    ProcessResult::Reprocess(InsertionMode::InHead, token)
}

fn in_head<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-head");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start_any(t, &["base", "basefont", "bgsound", "link"]) => {
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "meta") => {
            if let Some(enc) = crate::meta_scan::charset_from_attrs(&t.attrs) {
                tb.note_meta_encoding(enc);
            }
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "title") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::Rcdata)
        },
        Token::Tag(ref t) if is_start(t, "noscript") && tb.opts.scripting_enabled => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InHeadNoscript;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "noscript") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["noframes", "style"]) => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::Rawtext)
        },
        Token::Tag(ref t) if is_start(t, "script") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::ScriptData)
        },
        Token::Tag(ref t) if is_end(t, "head") => {
            tb.open_elems.pop();
            tb.mode = InsertionMode::AfterHead;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["body", "html", "br"]) => in_head_anything_else(tb, token),
        Token::Tag(ref t) if is_start(t, "template") => {
            tb.insert_element(
                t.clone(),
                ElementFlags {
                    template: true,
                    ..ElementFlags::default()
                },
            );
            tb.active_formatting.push_marker();
            tb.frameset_ok = false;
            tb.mode = InsertionMode::InTemplate;
            tb.template_modes.push(InsertionMode::InTemplate);
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "template") => {
            if !tb.open_elems.contains(&tb.sink, &tb.current_node())
                || !tb.elem_in(Scope::Default, "template")
            {
                tb.parse_error("unmatched-end-template");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named("template") {
                tb.parse_error("unexpected-open-elements-at-end-template");
            }
            tb.pop_until_named("template");
            tb.active_formatting.clear_to_last_marker();
            tb.template_modes.pop();
            tb.reset_insertion_mode();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "head") || t.kind == TagKind::EndTag => {
            tb.parse_error("unexpected-tag-in-head");
            ProcessResult::Done
        },
        _ => in_head_anything_else(tb, token),
    }
}

fn in_head_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    tb.open_elems.pop();
    tb.mode = InsertionMode::AfterHead;
    ProcessResult::Reprocess(InsertionMode::AfterHead, token)
}

fn in_head_noscript<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_end(t, "noscript") => {
            tb.open_elems.pop();
            tb.mode = InsertionMode::InHead;
            ProcessResult::Done
        },
        Token::Characters(SplitStatus::Whitespace, _) | Token::Comment(_) => in_head(tb, token),
        Token::Tag(ref t) if is_start_any(t, &["basefont", "bgsound", "link", "meta", "noframes", "style"]) => {
            in_head(tb, token)
        },
        Token::Tag(ref t) if is_end(t, "br") => in_head_noscript_anything_else(tb, token),
        Token::Tag(ref t) if is_start_any(t, &["head", "noscript"]) || t.kind == TagKind::EndTag => {
            tb.parse_error("unexpected-tag-in-head-noscript");
            ProcessResult::Done
        },
        _ => in_head_noscript_anything_else(tb, token),
    }
}

fn in_head_noscript_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    tb.parse_error("unexpected-in-head-noscript");
    tb.open_elems.pop();
    tb.mode = InsertionMode::InHead;
    ProcessResult::Reprocess(InsertionMode::InHead, token)
}

fn after_head<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-after-head");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "body") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.frameset_ok = false;
            tb.mode = InsertionMode::InBody;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "frameset") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InFrameset;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(
                t,
                &[
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ],
            ) =>
        {
            tb.parse_error("unexpected-tag-after-head");
            let head = tb.head_elem.clone();
            if let Some(head) = head {
                tb.open_elems.push(head);
                let r = in_head(tb, token);
                tb.open_elems.remove(&tb.sink, tb.head_elem.as_ref().unwrap());
                r
            } else {
                ProcessResult::Done
            }
        },
        Token::Tag(ref t) if is_end(t, "template") => in_head(tb, token),
        Token::Tag(ref t) if is_end_any(t, &["body", "html", "br"]) => after_head_anything_else(tb, token),
        Token::Tag(ref t) if is_start(t, "head") || t.kind == TagKind::EndTag => {
            tb.parse_error("unexpected-tag-after-head");
            ProcessResult::Done
        },
        _ => after_head_anything_else(tb, token),
    }
}

fn after_head_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    let tag = Tag {
        kind: TagKind::StartTag,
        name: LocalName::from("body"),
        self_closing: false,
        attrs: Vec::new(),
    };
    tb.insert_element(tag, ElementFlags::default());
    tb.mode = InsertionMode::InBody;
    ProcessResult::Reprocess(InsertionMode::InBody, token)
}

fn in_body<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::NullCharacter => {
            tb.parse_error("null-character");
            ProcessResult::Done
        },
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.reconstruct_active_formatting_elements();
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Characters(_, text) => {
            tb.reconstruct_active_formatting_elements();
            tb.append_text(text);
            tb.frameset_ok = false;
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-body");
            ProcessResult::Done
        },
        Token::Eof => {
            if !tb.template_modes.is_empty() {
                return in_template(tb, Token::Eof);
            }
            tb.stop_parsing()
        },
        Token::Tag(ref t) if is_start(t, "html") => {
            tb.parse_error("html-in-body");
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(
                t,
                &[
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ],
            ) || is_end(t, "template") =>
        {
            in_head(tb, token)
        },
        Token::Tag(ref t) if is_start(t, "body") => {
            tb.parse_error("unexpected-start-tag-body");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "frameset") => {
            tb.parse_error("unexpected-start-tag-frameset");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "body") => {
            if !tb.elem_in(Scope::Default, "body") {
                tb.parse_error("unmatched-end-tag-body");
                return ProcessResult::Done;
            }
            tb.mode = InsertionMode::AfterBody;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "html") => {
            if !tb.elem_in(Scope::Default, "body") {
                tb.parse_error("unmatched-end-tag-html");
                return ProcessResult::Done;
            }
            ProcessResult::Reprocess(InsertionMode::AfterBody, token)
        },
        Token::Tag(ref t)
            if is_start_any(
                t,
                &[
                    "address", "article", "aside", "blockquote", "center", "details", "dialog", "dir", "div", "dl",
                    "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "main", "menu", "nav", "ol",
                    "p", "section", "summary", "ul",
                ],
            ) =>
        {
            tb.close_p_element_in_button_scope();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["h1", "h2", "h3", "h4", "h5", "h6"]) => {
            tb.close_p_element_in_button_scope();
            if matches!(&*tb.current_node_name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                tb.parse_error("nested-heading");
                tb.open_elems.pop();
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["pre", "listing"]) => {
            tb.close_p_element_in_button_scope();
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.ignore_lf = true;
            tb.frameset_ok = false;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "form") => {
            if tb.form_elem.is_some() && !tb.elem_in(Scope::Default, "template") {
                tb.parse_error("unexpected-form-in-body");
                return ProcessResult::Done;
            }
            tb.close_p_element_in_button_scope();
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            if !tb.elem_in(Scope::Default, "template") {
                tb.form_elem = Some(elem);
            }
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "li") => {
            tb.frameset_ok = false;
            for h in tb.open_elems.iter_from_top().cloned().collect::<Vec<_>>() {
                let name = tb.sink.elem_name(&h).local.clone();
                if &*name == "li" {
                    tb.generate_implied_end_except(Some("li"));
                    tb.pop_until_named("li");
                    break;
                }
                if tb.is_special_element(&h) && !matches!(&*name, "address" | "div" | "p") {
                    break;
                }
            }
            tb.close_p_element_in_button_scope();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["dd", "dt"]) => {
            tb.frameset_ok = false;
            for h in tb.open_elems.iter_from_top().cloned().collect::<Vec<_>>() {
                let name = tb.sink.elem_name(&h).local.clone();
                if matches!(&*name, "dd" | "dt") {
                    tb.generate_implied_end_except(Some(&name));
                    tb.pop_until_named(&name);
                    break;
                }
                if tb.is_special_element(&h) && !matches!(&*name, "address" | "div" | "p") {
                    break;
                }
            }
            tb.close_p_element_in_button_scope();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "plaintext") => {
            tb.close_p_element_in_button_scope();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToPlaintext
        },
        Token::Tag(ref t) if is_start(t, "button") => {
            if tb.elem_in(Scope::Default, "button") {
                tb.parse_error("nested-button");
                tb.generate_implied_end_tags();
                tb.pop_until_named("button");
            }
            tb.reconstruct_active_formatting_elements();
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.frameset_ok = false;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_end_any(
                t,
                &[
                    "address", "article", "aside", "blockquote", "button", "center", "details", "dialog", "dir",
                    "div", "dl", "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "listing", "main",
                    "menu", "nav", "ol", "pre", "section", "summary", "ul",
                ],
            ) =>
        {
            if !tb.elem_in(Scope::Default, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named(&t.name) {
                tb.parse_error("unexpected-open-elements");
            }
            tb.pop_until_named(&t.name);
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "form") => {
            if tb.elem_in(Scope::Default, "template") {
                if !tb.elem_in(Scope::Default, "form") {
                    tb.parse_error("unmatched-end-tag-form");
                    return ProcessResult::Done;
                }
                tb.generate_implied_end_tags();
                if !tb.current_node_named("form") {
                    tb.parse_error("unexpected-open-elements-form");
                }
                tb.pop_until_named("form");
            } else {
                let node = tb.form_elem.take();
                match node {
                    Some(node) if tb.open_elems.contains(&tb.sink, &node) => {
                        if !tb.elem_in(Scope::Default, "form") {
                            tb.parse_error("unmatched-end-tag-form");
                            return ProcessResult::Done;
                        }
                        tb.generate_implied_end_tags();
                        if !tb.sink.same_node(&tb.current_node(), &node) {
                            tb.parse_error("unexpected-open-elements-form");
                        }
                        tb.open_elems.remove(&tb.sink, &node);
                    },
                    _ => {
                        tb.parse_error("unmatched-end-tag-form");
                    },
                }
            }
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "p") => {
            if !tb.elem_in(Scope::Button, "p") {
                tb.parse_error("unmatched-end-tag-p");
                let tag = Tag {
                    kind: TagKind::StartTag,
                    name: LocalName::from("p"),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                tb.insert_element(tag, ElementFlags::default());
            }
            tb.close_p_element();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "li") => {
            if !tb.elem_in(Scope::ListItem, "li") {
                tb.parse_error("unmatched-end-tag-li");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_except(Some("li"));
            if !tb.current_node_named("li") {
                tb.parse_error("unexpected-open-elements-li");
            }
            tb.pop_until_named("li");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["dd", "dt"]) => {
            if !tb.elem_in(Scope::Default, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_except(Some(&t.name));
            if !tb.current_node_named(&t.name) {
                tb.parse_error("unexpected-open-elements");
            }
            tb.pop_until_named(&t.name);
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["h1", "h2", "h3", "h4", "h5", "h6"]) => {
            if !tb.elem_in_any(Scope::Default, &["h1", "h2", "h3", "h4", "h5", "h6"]) {
                tb.parse_error("unmatched-end-tag-heading");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named(&t.name) {
                tb.parse_error("unexpected-open-elements-heading");
            }
            tb.open_elems.pop_until(&tb.sink, |n| {
                *n.ns == ns::html() && matches!(&*n.local, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
            });
            tb.open_elems.pop();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "a") => {
            if let Some((i, _)) = tb
                .active_formatting
                .iter_from_end()
                .find_map(|(i, e)| match e {
                    super::types::FormatEntry::Element(h, tt) if &*tt.name == "a" => Some((i, h.clone())),
                    super::types::FormatEntry::Marker => None,
                    _ => None,
                })
            {
                tb.parse_error("unexpected-start-tag-a-in-a");
                let subject = LocalName::from("a");
                tb.adoption_agency(subject);
                if tb.active_formatting.get(i).is_some() {
                    tb.active_formatting.remove(i);
                }
            }
            tb.reconstruct_active_formatting_elements();
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            tb.active_formatting.push(&tb.sink, elem, t.clone());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, FORMATTING) => {
            tb.reconstruct_active_formatting_elements();
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            tb.active_formatting.push(&tb.sink, elem, t.clone());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "nobr") => {
            tb.reconstruct_active_formatting_elements();
            if tb.elem_in(Scope::Default, "nobr") {
                tb.parse_error("nested-nobr");
                tb.adoption_agency(LocalName::from("nobr"));
                tb.reconstruct_active_formatting_elements();
            }
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            tb.active_formatting.push(&tb.sink, elem, t.clone());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, FORMATTING) || is_end(t, "nobr") => {
            tb.adoption_agency(t.name.clone());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["applet", "marquee", "object"]) => {
            tb.reconstruct_active_formatting_elements();
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.active_formatting.push_marker();
            tb.frameset_ok = false;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["applet", "marquee", "object"]) => {
            if !tb.elem_in(Scope::Default, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named(&t.name) {
                tb.parse_error("unexpected-open-elements");
            }
            tb.pop_until_named(&t.name);
            tb.active_formatting.clear_to_last_marker();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "table") => {
            if tb.quirks_mode != QuirksMode::Quirks {
                tb.close_p_element_in_button_scope();
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.frameset_ok = false;
            tb.mode = InsertionMode::InTable;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(t, &["area", "br", "embed", "img", "keygen", "wbr"]) =>
        {
            tb.reconstruct_active_formatting_elements();
            tb.insert_and_pop_element(t.clone());
            tb.frameset_ok = false;
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "input") => {
            tb.reconstruct_active_formatting_elements();
            tb.insert_and_pop_element(t.clone());
            let is_hidden = t
                .attrs
                .iter()
                .any(|a| &*a.name.local == "type" && a.value.to_ascii_lowercase().as_ref() == "hidden");
            if !is_hidden {
                tb.frameset_ok = false;
            }
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start_any(t, &["param", "source", "track"]) => {
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "hr") => {
            tb.close_p_element_in_button_scope();
            tb.insert_and_pop_element(t.clone());
            tb.frameset_ok = false;
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "image") => {
            tb.parse_error("image-tag");
            let mut t2 = t.clone();
            t2.name = LocalName::from("img");
            in_body(tb, Token::Tag(t2))
        },
        Token::Tag(ref t) if is_start(t, "textarea") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.ignore_lf = true;
            tb.frameset_ok = false;
            ProcessResult::ToRawText(RawKind::Rcdata)
        },
        Token::Tag(ref t) if is_start(t, "xmp") => {
            tb.close_p_element_in_button_scope();
            tb.reconstruct_active_formatting_elements();
            tb.frameset_ok = false;
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::Rawtext)
        },
        Token::Tag(ref t) if is_start(t, "iframe") => {
            tb.frameset_ok = false;
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::Rawtext)
        },
        Token::Tag(ref t) if is_start(t, "noembed") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::ToRawText(RawKind::Rawtext)
        },
        Token::Tag(ref t) if is_start(t, "select") => {
            tb.reconstruct_active_formatting_elements();
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.frameset_ok = false;
            tb.mode = match tb.mode {
                InsertionMode::InTable
                | InsertionMode::InCaption
                | InsertionMode::InTableBody
                | InsertionMode::InRow
                | InsertionMode::InCell => InsertionMode::InSelectInTable,
                _ => InsertionMode::InSelect,
            };
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["optgroup", "option"]) => {
            if tb.current_node_named("option") {
                tb.open_elems.pop();
            }
            tb.reconstruct_active_formatting_elements();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["rb", "rtc"]) => {
            if tb.elem_in(Scope::Default, "ruby") {
                tb.generate_implied_end_tags();
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["rp", "rt"]) => {
            if tb.elem_in(Scope::Default, "ruby") {
                tb.generate_implied_end_except(Some("rtc"));
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "math") => {
            tb.reconstruct_active_formatting_elements();
            tb.enter_foreign(t.clone(), ns::mathml())
        },
        Token::Tag(ref t) if is_start(t, "svg") => {
            tb.reconstruct_active_formatting_elements();
            tb.enter_foreign(t.clone(), ns::svg())
        },
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "col", "colgroup", "frame", "head", "tbody", "td", "tfoot", "th", "thead", "tr"]) =>
        {
            tb.parse_error("unexpected-start-tag-in-body");
            ProcessResult::Done
        },
        Token::Tag(ref t) if t.kind == TagKind::StartTag => {
            tb.reconstruct_active_formatting_elements();
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(t) if t.kind == TagKind::EndTag => {
            tb.any_other_end_tag(t.name.clone());
            ProcessResult::Done
        },
        _ => ProcessResult::Done,
    }
}

fn text_mode<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(_, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Eof => {
            tb.parse_error("eof-in-text");
            if tb.current_node_named("script") {
                tb.sink.mark_script_already_started(&tb.current_node());
            }
            tb.open_elems.pop();
            tb.mode = tb.orig_mode.take().unwrap_or(InsertionMode::InBody);
            ProcessResult::Reprocess(tb.mode, token)
        },
        Token::Tag(ref t) if is_end(t, "script") => {
            let script = tb.open_elems.pop();
            tb.mode = tb.orig_mode.take().unwrap_or(InsertionMode::InBody);
            if let Some(script) = script {
                return ProcessResult::Script(script);
            }
            ProcessResult::Done
        },
        Token::Tag(t) if t.kind == TagKind::EndTag => {
            tb.open_elems.pop();
            tb.mode = tb.orig_mode.take().unwrap_or(InsertionMode::InBody);
            ProcessResult::Done
        },
        _ => ProcessResult::Done,
    }
}

fn in_table<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(_, _) if matches!(&*tb.current_node_name(), "table" | "tbody" | "tfoot" | "thead" | "tr") => {
            tb.pending_table_text.clear();
            tb.orig_mode = Some(tb.mode);
            tb.mode = InsertionMode::InTableText;
            ProcessResult::Reprocess(InsertionMode::InTableText, token)
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-table");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "caption") => {
            tb.open_elems.pop_until(&tb.sink, |_| false);
            tb.active_formatting.push_marker();
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InCaption;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "colgroup") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InColumnGroup;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "col") => {
            let tag = Tag {
                kind: TagKind::StartTag,
                name: LocalName::from("colgroup"),
                self_closing: false,
                attrs: Vec::new(),
            };
            tb.insert_element(tag, ElementFlags::default());
            tb.mode = InsertionMode::InColumnGroup;
            ProcessResult::Reprocess(InsertionMode::InColumnGroup, token)
        },
        Token::Tag(ref t) if is_start_any(t, &["tbody", "tfoot", "thead"]) => {
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["td", "th", "tr"]) => {
            let tag = Tag {
                kind: TagKind::StartTag,
                name: LocalName::from("tbody"),
                self_closing: false,
                attrs: Vec::new(),
            };
            tb.insert_element(tag, ElementFlags::default());
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Reprocess(InsertionMode::InTableBody, token)
        },
        Token::Tag(ref t) if is_start(t, "table") => {
            tb.parse_error("nested-table");
            if !tb.elem_in(Scope::Table, "table") {
                return ProcessResult::Done;
            }
            tb.pop_until_named("table");
            tb.reset_insertion_mode();
            ProcessResult::Reprocess(tb.mode, token)
        },
        Token::Tag(ref t) if is_end(t, "table") => {
            if !tb.elem_in(Scope::Table, "table") {
                tb.parse_error("unmatched-end-tag-table");
                return ProcessResult::Done;
            }
            tb.pop_until_named("table");
            tb.reset_insertion_mode();
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_end_any(t, &["body", "caption", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr"]) =>
        {
            tb.parse_error("unexpected-end-tag-in-table");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["style", "script", "template"]) || is_end(t, "template") => in_head(tb, token),
        Token::Tag(ref t) if is_start(t, "input") => {
            let is_hidden = t
                .attrs
                .iter()
                .any(|a| &*a.name.local == "type" && a.value.to_ascii_lowercase().as_ref() == "hidden");
            if !is_hidden {
                return in_table_anything_else(tb, token);
            }
            tb.parse_error("unexpected-hidden-input-in-table");
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "form") => {
            tb.parse_error("unexpected-form-in-table");
            if tb.form_elem.is_some() || tb.elem_in(Scope::Default, "template") {
                return ProcessResult::Done;
            }
            let elem = tb.insert_element(t.clone(), ElementFlags::default());
            tb.form_elem = Some(elem);
            tb.open_elems.pop();
            ProcessResult::Done
        },
        Token::Eof => in_body(tb, token),
        _ => in_table_anything_else(tb, token),
    }
}

fn in_table_anything_else<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    tb.parse_error("foster-parenting");
    in_body(tb, token)
}

fn in_table_text<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::NullCharacter => {
            tb.parse_error("null-character-in-table-text");
            ProcessResult::Done
        },
        Token::Characters(split, text) => {
            tb.pending_table_text.push((split, text));
            ProcessResult::Done
        },
        _ => {
            let pending = std::mem::take(&mut tb.pending_table_text);
            let any_non_ws = pending
                .iter()
                .any(|(s, t)| *s == SplitStatus::NotWhitespace || *s == SplitStatus::NotSplit && !is_whitespace(t));
            if any_non_ws {
                for (_, t) in pending {
                    tb.parse_error("unexpected-non-whitespace-in-table");
                    in_table_anything_else(tb, Token::Characters(SplitStatus::NotWhitespace, t));
                }
            } else {
                for (_, t) in pending {
                    tb.append_text(t);
                }
            }
            tb.mode = tb.orig_mode.take().unwrap_or(InsertionMode::InTable);
            ProcessResult::Reprocess(tb.mode, token)
        },
    }
}

fn in_caption<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t) if is_end(t, "caption") => {
            if !tb.elem_in(Scope::Table, "caption") {
                tb.parse_error("unmatched-end-tag-caption");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named("caption") {
                tb.parse_error("unexpected-open-elements-caption");
            }
            tb.pop_until_named("caption");
            tb.active_formatting.clear_to_last_marker();
            tb.mode = InsertionMode::InTable;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"])
                || is_end(t, "table") =>
        {
            if !tb.elem_in(Scope::Table, "caption") {
                return ProcessResult::Done;
            }
            tb.pop_until_named("caption");
            tb.active_formatting.clear_to_last_marker();
            tb.mode = InsertionMode::InTable;
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        },
        Token::Tag(ref t) if is_end_any(t, &["body", "col", "colgroup", "html", "tbody", "td", "tfoot", "th", "thead", "tr"]) => {
            tb.parse_error("unexpected-end-tag-in-caption");
            ProcessResult::Done
        },
        _ => in_body(tb, token),
    }
}

fn in_column_group<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-colgroup");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "col") => {
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_end(t, "colgroup") => {
            if !tb.current_node_named("colgroup") {
                tb.parse_error("unmatched-end-tag-colgroup");
                return ProcessResult::Done;
            }
            tb.open_elems.pop();
            tb.mode = InsertionMode::InTable;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "col") => {
            tb.parse_error("unmatched-end-tag-col");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["template"]) || is_end(t, "template") => in_head(tb, token),
        Token::Eof => in_body(tb, token),
        _ => {
            if !tb.current_node_named("colgroup") {
                return ProcessResult::Done;
            }
            tb.open_elems.pop();
            tb.mode = InsertionMode::InTable;
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        },
    }
}

fn in_table_body<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t) if is_start(t, "tr") => {
            tb.open_elems.pop_until(&tb.sink, |n| {
                *n.ns == ns::html() && matches!(&*n.local, "tbody" | "tfoot" | "thead")
            });
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InRow;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["th", "td"]) => {
            tb.parse_error("unexpected-cell-in-table-body");
            let tag = Tag {
                kind: TagKind::StartTag,
                name: LocalName::from("tr"),
                self_closing: false,
                attrs: Vec::new(),
            };
            tb.insert_element(tag, ElementFlags::default());
            tb.mode = InsertionMode::InRow;
            ProcessResult::Reprocess(InsertionMode::InRow, token)
        },
        Token::Tag(ref t) if is_end_any(t, &["tbody", "tfoot", "thead"]) => {
            if !tb.elem_in(Scope::Table, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.pop_until_named(&t.name);
            tb.mode = InsertionMode::InTable;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "col", "colgroup", "tbody", "tfoot", "thead"]) || is_end(t, "table") =>
        {
            if !tb.elem_in_any(Scope::Table, &["tbody", "tfoot", "thead"]) {
                tb.parse_error("unexpected-tag-in-table-body");
                return ProcessResult::Done;
            }
            tb.open_elems.pop_until(&tb.sink, |n| {
                *n.ns == ns::html() && matches!(&*n.local, "tbody" | "tfoot" | "thead")
            });
            tb.open_elems.pop();
            tb.mode = InsertionMode::InTable;
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        },
        Token::Tag(ref t)
            if is_end_any(t, &["body", "caption", "col", "colgroup", "html", "td", "th", "tr"]) =>
        {
            tb.parse_error("unexpected-end-tag-in-table-body");
            ProcessResult::Done
        },
        _ => in_table(tb, token),
    }
}

fn in_row<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t) if is_start_any(t, &["th", "td"]) => {
            tb.open_elems.pop_until(&tb.sink, |n| *n.ns == ns::html() && &*n.local == "tr");
            tb.insert_element(t.clone(), ElementFlags::default());
            tb.mode = InsertionMode::InCell;
            tb.active_formatting.push_marker();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "tr") => {
            if !tb.elem_in(Scope::Table, "tr") {
                tb.parse_error("unmatched-end-tag-tr");
                return ProcessResult::Done;
            }
            tb.pop_until_named("tr");
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "col", "colgroup", "tbody", "tfoot", "thead", "tr"]) || is_end(t, "table") =>
        {
            if !tb.elem_in(Scope::Table, "tr") {
                tb.parse_error("unexpected-tag-in-row");
                return ProcessResult::Done;
            }
            tb.pop_until_named("tr");
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Reprocess(InsertionMode::InTableBody, token)
        },
        Token::Tag(ref t) if is_end_any(t, &["tbody", "tfoot", "thead"]) => {
            if !tb.elem_in(Scope::Table, &t.name) || !tb.elem_in(Scope::Table, "tr") {
                tb.parse_error("unexpected-end-tag-in-row");
                return ProcessResult::Done;
            }
            tb.pop_until_named("tr");
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Reprocess(InsertionMode::InTableBody, token)
        },
        Token::Tag(ref t) if is_end_any(t, &["body", "caption", "col", "colgroup", "html", "td", "th"]) => {
            tb.parse_error("unexpected-end-tag-in-row");
            ProcessResult::Done
        },
        _ => in_table(tb, token),
    }
}

fn in_cell<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t) if is_end_any(t, &["td", "th"]) => {
            if !tb.elem_in(Scope::Table, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.generate_implied_end_tags();
            if !tb.current_node_named(&t.name) {
                tb.parse_error("unexpected-open-elements");
            }
            tb.pop_until_named(&t.name);
            tb.active_formatting.clear_to_last_marker();
            tb.mode = InsertionMode::InRow;
            ProcessResult::Done
        },
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"]) =>
        {
            if !tb.elem_in_any(Scope::Table, &["td", "th"]) {
                tb.parse_error("unexpected-tag-in-cell");
                return ProcessResult::Done;
            }
            close_cell(tb);
            ProcessResult::Reprocess(InsertionMode::InRow, token)
        },
        Token::Tag(ref t) if is_end_any(t, &["body", "caption", "col", "colgroup", "html"]) => {
            tb.parse_error("unexpected-end-tag-in-cell");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end_any(t, &["table", "tbody", "tfoot", "thead", "tr"]) => {
            if !tb.elem_in(Scope::Table, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            close_cell(tb);
            ProcessResult::Reprocess(InsertionMode::InRow, token)
        },
        _ => in_body(tb, token),
    }
}

fn close_cell<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>) {
    tb.generate_implied_end_tags();
    tb.open_elems.pop_until(&tb.sink, |n| *n.ns == ns::html() && matches!(&*n.local, "td" | "th"));
    tb.open_elems.pop();
    tb.active_formatting.clear_to_last_marker();
    tb.mode = InsertionMode::InRow;
}

fn in_select<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::NullCharacter => {
            tb.parse_error("null-character-in-select");
            ProcessResult::Done
        },
        Token::Characters(_, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-select");
            ProcessResult::Done
        },
        Token::Eof => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "option") => {
            if tb.current_node_named("option") {
                tb.open_elems.pop();
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "optgroup") => {
            if tb.current_node_named("option") {
                tb.open_elems.pop();
            }
            if tb.current_node_named("optgroup") {
                tb.open_elems.pop();
            }
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "optgroup") => {
            let len = tb.open_elems.len();
            if len >= 2 && tb.current_node_named("option") && matches!(&*tb.sink.elem_name(tb.open_elems.nth_from_top(1).unwrap()).local, n if n == "optgroup") {
                tb.open_elems.pop();
            }
            if tb.current_node_named("optgroup") {
                tb.open_elems.pop();
            } else {
                tb.parse_error("unmatched-end-tag-optgroup");
            }
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "option") => {
            if tb.current_node_named("option") {
                tb.open_elems.pop();
            } else {
                tb.parse_error("unmatched-end-tag-option");
            }
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "select") => {
            if !tb.elem_in(Scope::Select, "select") {
                tb.parse_error("unmatched-end-tag-select");
                return ProcessResult::Done;
            }
            tb.pop_until_named("select");
            tb.reset_insertion_mode();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "select") => {
            tb.parse_error("nested-select");
            tb.pop_until_named("select");
            tb.reset_insertion_mode();
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start_any(t, &["input", "keygen", "textarea"]) => {
            tb.parse_error("unexpected-tag-in-select");
            if !tb.elem_in(Scope::Select, "select") {
                return ProcessResult::Done;
            }
            tb.pop_until_named("select");
            tb.reset_insertion_mode();
            ProcessResult::Reprocess(tb.mode, token)
        },
        Token::Tag(ref t) if is_start_any(t, &["script", "template"]) || is_end(t, "template") => in_head(tb, token),
        _ => {
            tb.parse_error("unexpected-tag-in-select");
            ProcessResult::Done
        },
    }
}

fn in_select_in_table<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Tag(ref t)
            if is_start_any(t, &["caption", "table", "tbody", "tfoot", "thead", "tr", "td", "th"]) =>
        {
            tb.parse_error("unexpected-tag-in-select-in-table");
            tb.pop_until_named("select");
            tb.reset_insertion_mode();
            ProcessResult::Reprocess(tb.mode, token)
        },
        Token::Tag(ref t)
            if is_end_any(t, &["caption", "table", "tbody", "tfoot", "thead", "tr", "td", "th"]) =>
        {
            if !tb.elem_in(Scope::Table, &t.name) {
                tb.parse_error("unmatched-end-tag");
                return ProcessResult::Done;
            }
            tb.pop_until_named("select");
            tb.reset_insertion_mode();
            ProcessResult::Reprocess(tb.mode, token)
        },
        _ => in_select(tb, token),
    }
}

fn in_template<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(..) | Token::Comment(_) | Token::Doctype(_) => in_body(tb, token),
        Token::Tag(ref t)
            if is_start_any(
                t,
                &[
                    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "template", "title",
                ],
            ) || is_end(t, "template") =>
        {
            in_head(tb, token)
        },
        Token::Tag(ref t) if is_start_any(t, &["caption", "colgroup", "tbody", "tfoot", "thead"]) => {
            tb.template_modes.pop();
            tb.template_modes.push(InsertionMode::InTable);
            tb.mode = InsertionMode::InTable;
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        },
        Token::Tag(ref t) if is_start(t, "col") => {
            tb.template_modes.pop();
            tb.template_modes.push(InsertionMode::InColumnGroup);
            tb.mode = InsertionMode::InColumnGroup;
            ProcessResult::Reprocess(InsertionMode::InColumnGroup, token)
        },
        Token::Tag(ref t) if is_start(t, "tr") => {
            tb.template_modes.pop();
            tb.template_modes.push(InsertionMode::InTableBody);
            tb.mode = InsertionMode::InTableBody;
            ProcessResult::Reprocess(InsertionMode::InTableBody, token)
        },
        Token::Tag(ref t) if is_start_any(t, &["td", "th"]) => {
            tb.template_modes.pop();
            tb.template_modes.push(InsertionMode::InRow);
            tb.mode = InsertionMode::InRow;
            ProcessResult::Reprocess(InsertionMode::InRow, token)
        },
        Token::Tag(ref t) if t.kind == TagKind::StartTag => {
            tb.template_modes.pop();
            tb.template_modes.push(InsertionMode::InBody);
            tb.mode = InsertionMode::InBody;
            ProcessResult::Reprocess(InsertionMode::InBody, token)
        },
        Token::Tag(t) if t.kind == TagKind::EndTag => {
            tb.parse_error("unexpected-end-tag-in-template");
            ProcessResult::Done
        },
        Token::Eof => {
            if !tb.elem_in(Scope::Default, "template") {
                return tb.stop_parsing();
            }
            tb.parse_error("eof-in-template");
            tb.pop_until_named("template");
            tb.active_formatting.clear_to_last_marker();
            tb.template_modes.pop();
            tb.reset_insertion_mode();
            ProcessResult::Reprocess(tb.mode, token)
        },
        _ => ProcessResult::Done,
    }
}

fn after_body<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, _) | Token::Comment(_) => {
            let html = tb.html_elem();
            match token {
                Token::Comment(text) => {
                    let comment = tb.sink.create_comment(text);
                    tb.sink.append(&html, AppendNode(comment));
                },
                Token::Characters(_, text) => tb.append_text(text),
                _ => unreachable!(),
            }
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-after-body");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_end(t, "html") => {
            if tb.opts.is_fragment {
                tb.parse_error("unmatched-end-tag-html");
                return ProcessResult::Done;
            }
            tb.mode = InsertionMode::AfterAfterBody;
            ProcessResult::Done
        },
        Token::Eof => tb.stop_parsing(),
        _ => {
            tb.parse_error("unexpected-token-after-body");
            tb.mode = InsertionMode::InBody;
            ProcessResult::Reprocess(InsertionMode::InBody, token)
        },
    }
}

fn in_frameset<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-in-frameset");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "frameset") => {
            tb.insert_element(t.clone(), ElementFlags::default());
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_end(t, "frameset") => {
            if tb.open_elems.len() == 1 {
                tb.parse_error("unmatched-end-tag-frameset");
                return ProcessResult::Done;
            }
            tb.open_elems.pop();
            if !tb.opts.is_fragment && !tb.current_node_named("frameset") {
                tb.mode = InsertionMode::AfterFrameset;
            }
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "frame") => {
            tb.insert_and_pop_element(t.clone());
            ProcessResult::DoneAckSelfClosing
        },
        Token::Tag(ref t) if is_start(t, "noframes") => in_head(tb, token),
        Token::Eof => tb.stop_parsing(),
        _ => {
            tb.parse_error("unexpected-token-in-frameset");
            ProcessResult::Done
        },
    }
}

fn after_frameset<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Characters(SplitStatus::Whitespace, text) => {
            tb.append_text(text);
            ProcessResult::Done
        },
        Token::Comment(text) => {
            tb.append_comment(text);
            ProcessResult::Done
        },
        Token::Doctype(_) => {
            tb.parse_error("doctype-after-frameset");
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_end(t, "html") => {
            tb.mode = InsertionMode::AfterAfterFrameset;
            ProcessResult::Done
        },
        Token::Tag(ref t) if is_start(t, "noframes") => in_head(tb, token),
        Token::Eof => tb.stop_parsing(),
        _ => {
            tb.parse_error("unexpected-token-after-frameset");
            ProcessResult::Done
        },
    }
}

fn after_after_body<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Comment(text) => {
            tb.append_comment_to_doc(text);
            ProcessResult::Done
        },
        Token::Doctype(_) | Token::Characters(SplitStatus::Whitespace, _) => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Eof => tb.stop_parsing(),
        _ => {
            tb.parse_error("unexpected-token-after-after-body");
            tb.mode = InsertionMode::InBody;
            ProcessResult::Reprocess(InsertionMode::InBody, token)
        },
    }
}

fn after_after_frameset<Sink: TreeSink>(tb: &mut TreeBuilder<Sink>, token: Token) -> PR<Sink> {
    match token {
        Token::Comment(text) => {
            tb.append_comment_to_doc(text);
            ProcessResult::Done
        },
        Token::Doctype(_) | Token::Characters(SplitStatus::Whitespace, _) => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "html") => in_body(tb, token),
        Token::Tag(ref t) if is_start(t, "noframes") => in_head(tb, token),
        Token::Eof => tb.stop_parsing(),
        _ => {
            tb.parse_error("unexpected-token-after-after-frameset");
            ProcessResult::Done
        },
    }
}
