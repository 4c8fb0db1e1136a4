// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tree constructor (§5): consumes tokens from the tokenizer and
//! drives a [`TreeSink`] through the insertion-mode state machine.

pub mod quirks;
pub mod rules;
pub mod stack;
pub mod types;

use std::borrow::Cow;

use log::debug;
use markup_core::tendril::StrTendril;
use markup_core::tree_sink::{AppendNode, AppendText, ElementFlags, NextParserState, NodeOrText, QuirksMode, TreeSink};
use markup_core::{ns, Attribute, ExpandedName, LocalName, Namespace, QualName};

use crate::tokenizer::interface::{Tag, TagKind, TokenSink, TokenSinkResult};

use self::stack::{ActiveFormattingList, ElementStack, Scope};
use self::types::{Bookmark, FormatEntry, InsertionMode, ProcessResult, SplitStatus, Token};

/// §13.2.5.1's "MathML text integration point" predicate.
fn mathml_text_integration_point(name: ExpandedName<'_>) -> bool {
    *name.ns == ns::mathml() && matches!(&*name.local, "mi" | "mo" | "mn" | "ms" | "mtext")
}

/// §13.2.5.1's "HTML integration point" predicate, the SVG half (the
/// MathML half is just `annotation-xml` with a matching `encoding`
/// attribute, checked by the sink via `is_mathml_annotation_xml_integration_point`).
fn svg_html_integration_point(name: ExpandedName<'_>) -> bool {
    *name.ns == ns::svg() && matches!(&*name.local, "foreignObject" | "desc" | "title")
}

/// Start tags that force a "pop back into HTML" even inside foreign
/// content (§13.2.6.5 "any other start tag").
const FOREIGN_BREAKOUT: &[&str] = &[
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em", "embed", "font", "h1",
    "h2", "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing", "menu", "meta", "nobr", "ol", "p", "pre",
    "ruby", "s", "small", "span", "strong", "strike", "sub", "sup", "table", "tt", "u", "ul", "var",
];

#[derive(Clone)]
pub struct TreeBuilderOpts {
    pub scripting_enabled: bool,
    pub iframe_srcdoc: bool,
    pub is_fragment: bool,
}

impl Default for TreeBuilderOpts {
    fn default() -> Self {
        TreeBuilderOpts {
            scripting_enabled: true,
            iframe_srcdoc: false,
            is_fragment: false,
        }
    }
}

pub struct TreeBuilder<Sink: TreeSink> {
    opts: TreeBuilderOpts,
    sink: Sink,
    doc_handle: Sink::Handle,

    mode: InsertionMode,
    orig_mode: Option<InsertionMode>,
    template_modes: Vec<InsertionMode>,

    open_elems: ElementStack<Sink::Handle>,
    active_formatting: ActiveFormattingList<Sink::Handle>,

    head_elem: Option<Sink::Handle>,
    form_elem: Option<Sink::Handle>,
    context_elem: Option<Sink::Handle>,

    frameset_ok: bool,
    ignore_lf: bool,
    quirks_mode: QuirksMode,

    pending_table_text: Vec<(SplitStatus, StrTendril)>,

    meta_encoding: Option<&'static encoding_rs::Encoding>,
}

impl<Sink: TreeSink> TreeBuilder<Sink> {
    pub fn new(mut sink: Sink, opts: TreeBuilderOpts) -> TreeBuilder<Sink> {
        let doc_handle = sink.get_document();
        TreeBuilder {
            opts,
            sink,
            doc_handle,
            mode: InsertionMode::Initial,
            orig_mode: None,
            template_modes: Vec::new(),
            open_elems: ElementStack::new(),
            active_formatting: ActiveFormattingList::new(),
            head_elem: None,
            form_elem: None,
            context_elem: None,
            frameset_ok: true,
            ignore_lf: false,
            quirks_mode: QuirksMode::NoQuirks,
            pending_table_text: Vec::new(),
            meta_encoding: None,
        }
    }

    /// Records a charset a `<meta>` start tag just declared in `in head`
    /// (§4.1, "changing the encoding while parsing"). The façade polls
    /// [`Self::take_meta_encoding`] after each run of the tokenizer and
    /// decides whether to reparse.
    pub fn note_meta_encoding(&mut self, encoding: &'static encoding_rs::Encoding) {
        self.meta_encoding = Some(encoding);
    }

    pub fn take_meta_encoding(&mut self) -> Option<&'static encoding_rs::Encoding> {
        self.meta_encoding.take()
    }

    /// Initializes fragment-parsing mode (§7 "parsing HTML fragments"): a
    /// synthetic `html` root is pushed so the constructor always has an
    /// open element to insert into, `context` becomes the
    /// adjusted-current-node override used by [`Self::reset_insertion_mode`],
    /// and the insertion mode is reset as though `context` were the only
    /// entry below the stack.
    pub fn init_fragment_context(&mut self, context_name: &LocalName, context_elem: Sink::Handle) {
        let html = self.create_element(LocalName::from("html"), Vec::new(), ElementFlags::default());
        self.open_elems.push(html);
        self.context_elem = Some(context_elem.clone());
        if *context_name == LocalName::from("form") {
            self.form_elem = Some(context_elem);
        }
        self.reset_insertion_mode();
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn unwrap(self) -> Sink {
        self.sink
    }

    fn parse_error(&mut self, msg: &'static str) {
        debug!("tree builder: {}", msg);
        self.sink.parse_error(Cow::Borrowed(msg));
    }

    fn current_node(&self) -> Sink::Handle {
        self.open_elems.top().expect("open elements stack is empty").clone()
    }

    fn current_node_name(&self) -> markup_core::LocalName {
        self.sink.elem_name(&self.current_node()).local.clone()
    }

    fn adjusted_current_node(&self) -> Sink::Handle {
        if self.open_elems.len() == 1 {
            if let Some(ctx) = &self.context_elem {
                return ctx.clone();
            }
        }
        self.current_node()
    }

    fn html_elem(&self) -> Sink::Handle {
        self.open_elems
            .nth_from_top(self.open_elems.len() - 1)
            .expect("no root element")
            .clone()
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
        self.sink.set_quirks_mode(mode);
    }

    fn create_element(&mut self, name: LocalName, attrs: Vec<Attribute>, flags: ElementFlags) -> Sink::Handle {
        self.sink.create_element(QualName::html(name), attrs, flags)
    }

    fn create_element_ns(&mut self, name: LocalName, ns: Namespace, attrs: Vec<Attribute>, flags: ElementFlags) -> Sink::Handle {
        self.sink.create_element(QualName::new(None, ns, name), attrs, flags)
    }

    fn insert_element(&mut self, tag: Tag, flags: ElementFlags) -> Sink::Handle {
        let elem = self.create_element(tag.name.clone(), tag.attrs.clone(), flags);
        self.insert_appropriately(AppendNode(elem.clone()));
        self.open_elems.push(elem.clone());
        elem
    }

    fn insert_foreign_element(&mut self, tag: Tag, namespace: Namespace, push: bool) -> Sink::Handle {
        let elem = self.create_element_ns(tag.name, namespace, tag.attrs, ElementFlags::default());
        self.insert_appropriately(AppendNode(elem.clone()));
        if push {
            self.open_elems.push(elem.clone());
        }
        elem
    }

    fn insert_and_pop_element(&mut self, tag: Tag) {
        let elem = self.create_element(tag.name, tag.attrs, ElementFlags::default());
        self.insert_appropriately(AppendNode(elem));
    }

    /// §4.4's "appropriate place for inserting a node", including foster
    /// parenting.
    fn appropriate_insertion_target(&self) -> (Sink::Handle, Option<Sink::Handle>) {
        let target = self.current_node();
        let name = self.sink.elem_name(&target).local.clone();
        let foster = matches!(&*name, "table" | "tbody" | "tfoot" | "thead" | "tr");
        if !foster {
            return (target, None);
        }
        for h in self.open_elems.iter_from_top() {
            let n = self.sink.elem_name(h).local.clone();
            match &*n {
                "template" => return (h.clone(), None),
                "table" => {
                    if self.sink.has_parent_node(h) {
                        return (h.clone(), Some(target));
                    }
                    return (target, None);
                },
                _ => continue,
            }
        }
        (self.html_elem(), None)
    }

    fn insert_appropriately(&mut self, child: NodeOrText<Sink::Handle>) {
        let (target, prev) = self.appropriate_insertion_target();
        match prev {
            Some(prev_element) => self.sink.append_based_on_parent_node(&target, &prev_element, child),
            None => self.sink.append(&target, child),
        }
    }

    fn append_text(&mut self, text: StrTendril) {
        self.insert_appropriately(AppendText(text));
    }

    fn append_comment(&mut self, text: StrTendril) {
        let comment = self.sink.create_comment(text);
        self.insert_appropriately(AppendNode(comment));
    }

    fn append_comment_to_doc(&mut self, text: StrTendril) {
        let comment = self.sink.create_comment(text);
        let doc = self.doc_handle.clone();
        self.sink.append(&doc, AppendNode(comment));
    }

    fn append_comment_to_html(&mut self, text: StrTendril) {
        let comment = self.sink.create_comment(text);
        let html = self.html_elem();
        self.sink.append(&html, AppendNode(comment));
    }

    fn stop_parsing(&mut self) -> ProcessResult<Sink::Handle> {
        ProcessResult::Done
    }

    // ---- open-elements/scope helpers ---------------------------------

    fn elem_in(&self, scope: Scope, name: &str) -> bool {
        let name = LocalName::from(name);
        self.open_elems.in_scope(&self.sink, scope, |n| *n.ns == ns::html() && *n.local == name)
    }

    fn elem_in_any(&self, scope: Scope, names: &[&str]) -> bool {
        self.open_elems.in_scope(&self.sink, scope, |n| {
            *n.ns == ns::html() && names.iter().any(|w| &*n.local == *w)
        })
    }

    fn current_node_named(&self, name: &str) -> bool {
        let cur = self.sink.elem_name(&self.current_node());
        *cur.ns == ns::html() && &*cur.local == name
    }

    fn pop_until_named(&mut self, name: &str) {
        self.open_elems.pop_until_named(&self.sink, ns::html(), LocalName::from(name));
    }

    fn generate_implied_end_tags(&mut self) {
        self.generate_implied_end_except(None);
    }

    /// The rb/rtc fix noted in REDESIGN FLAGS: the real spec's implied-end
    /// set is `dd dt li optgroup option p rb rp rt rtc`; html5lib's
    /// historical omission of `rb`/`rtc` let a dangling `<rb>` survive a
    /// later `</ruby>` close. We use the full WHATWG set.
    fn generate_implied_end_except(&mut self, except: Option<&str>) {
        const IMPLIED: &[&str] = &["dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc"];
        loop {
            let name = self.current_node_name();
            if Some(&*name) == except {
                break;
            }
            if !IMPLIED.contains(&&*name) {
                break;
            }
            self.open_elems.pop();
        }
    }

    fn close_p_element(&mut self) {
        self.generate_implied_end_except(Some("p"));
        if !self.current_node_named("p") {
            self.parse_error("unexpected-end-of-body-for-p");
        }
        self.pop_until_named("p");
    }

    fn close_p_element_in_button_scope(&mut self) {
        if self.elem_in(Scope::Button, "p") {
            self.close_p_element();
        }
    }

    fn reset_insertion_mode(&mut self) {
        let stack_len = self.open_elems.len();
        for i in 0..stack_len {
            let idx = stack_len - 1 - i;
            let node = self.open_elems.nth_from_top(i).unwrap().clone();
            let last = idx == 0;
            let node = if last {
                self.context_elem.clone().unwrap_or(node)
            } else {
                node
            };
            let name = self.sink.elem_name(&node).local.clone();
            if *self.sink.elem_name(&node).ns != ns::html() {
                continue;
            }
            match &*name {
                "select" => {
                    if !last {
                        for j in (0..=idx).rev() {
                            let anc = self.open_elems.nth_from_top(stack_len - 1 - j).unwrap();
                            let anc_name = self.sink.elem_name(anc).local.clone();
                            if j == 0 {
                                break;
                            }
                            if &*anc_name == "template" {
                                break;
                            }
                            if &*anc_name == "table" {
                                self.mode = InsertionMode::InSelectInTable;
                                return;
                            }
                        }
                    }
                    self.mode = InsertionMode::InSelect;
                    return;
                },
                "td" | "th" if !last => {
                    self.mode = InsertionMode::InCell;
                    return;
                },
                "tr" => {
                    self.mode = InsertionMode::InRow;
                    return;
                },
                "tbody" | "thead" | "tfoot" => {
                    self.mode = InsertionMode::InTableBody;
                    return;
                },
                "caption" => {
                    self.mode = InsertionMode::InCaption;
                    return;
                },
                "colgroup" => {
                    self.mode = InsertionMode::InColumnGroup;
                    return;
                },
                "table" => {
                    self.mode = InsertionMode::InTable;
                    return;
                },
                "template" => {
                    self.mode = *self.template_modes.last().unwrap_or(&InsertionMode::InTemplate);
                    return;
                },
                "head" if !last => {
                    self.mode = InsertionMode::InHead;
                    return;
                },
                "body" => {
                    self.mode = InsertionMode::InBody;
                    return;
                },
                "frameset" => {
                    self.mode = InsertionMode::InFrameset;
                    return;
                },
                "html" => {
                    self.mode = if self.head_elem.is_none() {
                        InsertionMode::BeforeHead
                    } else {
                        InsertionMode::AfterHead
                    };
                    return;
                },
                _ if last => {
                    self.mode = InsertionMode::InBody;
                    return;
                },
                _ => continue,
            }
        }
        self.mode = InsertionMode::InBody;
    }

    // ---- active formatting elements / adoption agency -----------------

    fn reconstruct_active_formatting_elements(&mut self) {
        if self.active_formatting.is_empty() {
            return;
        }
        if let Some(FormatEntry::Marker) = self.active_formatting.get(self.active_formatting.len() - 1) {
            return;
        }
        let last = self.active_formatting.len() - 1;
        if let Some(FormatEntry::Element(h, _)) = self.active_formatting.get(last) {
            if self.open_elems.contains(&self.sink, h) {
                return;
            }
        }

        let mut idx = last;
        loop {
            if idx == 0 {
                break;
            }
            idx -= 1;
            let in_stack = match self.active_formatting.get(idx) {
                Some(FormatEntry::Marker) => {
                    idx += 1;
                    break;
                },
                Some(FormatEntry::Element(h, _)) => self.open_elems.contains(&self.sink, h),
                None => break,
            };
            if in_stack {
                idx += 1;
                break;
            }
        }

        for i in idx..self.active_formatting.len() {
            let (name, attrs) = match self.active_formatting.get(i) {
                Some(FormatEntry::Element(_, tag)) => (tag.name.clone(), tag.attrs.clone()),
                _ => continue,
            };
            let clone = self.create_element(name.clone(), attrs.clone(), ElementFlags::default());
            self.insert_appropriately(AppendNode(clone.clone()));
            self.open_elems.push(clone.clone());
            let tag = Tag {
                kind: TagKind::StartTag,
                name,
                self_closing: false,
                attrs,
            };
            self.active_formatting.replace(i, FormatEntry::Element(clone, tag));
        }
    }

    /// §5.3's adoption agency algorithm.
    fn adoption_agency(&mut self, subject: LocalName) {
        for _ in 0..8 {
            let mut found = None;
            for (i, e) in self.active_formatting.iter_from_end() {
                match e {
                    FormatEntry::Element(h, t) if t.name == subject => {
                        found = Some((i, h.clone()));
                        break;
                    },
                    FormatEntry::Marker => break,
                    _ => continue,
                }
            }
            let afe_index = match found {
                Some(x) => x,
                None => return self.any_other_end_tag(subject),
            };
            let (fmt_index, fmt_elem) = afe_index;

            if !self.open_elems.contains(&self.sink, &fmt_elem) {
                self.parse_error("adoption-agency-1.2");
                self.active_formatting.remove(fmt_index);
                return;
            }
            let in_scope = self
                .open_elems
                .in_scope(&self.sink, Scope::Default, |n| *n.ns == ns::html() && *n.local == subject);
            if !in_scope {
                self.parse_error("adoption-agency-1.3");
                return;
            }
            if !self.sink.same_node(&self.current_node(), &fmt_elem) {
                self.parse_error("adoption-agency-1.4");
            }

            let fmt_stack_index = match self.open_elems.position(&self.sink, &fmt_elem) {
                Some(i) => i,
                None => return,
            };
            let furthest_block = self
                .open_elems
                .iter_from_top()
                .take(self.open_elems.len() - fmt_stack_index)
                .find(|h| self.is_special_element(h))
                .cloned();

            let Some(furthest_block) = furthest_block else {
                self.open_elems.pop_until(&self.sink, |_| false);
                while self.open_elems.position(&self.sink, &fmt_elem).is_some()
                    && !self.sink.same_node(&self.current_node(), &fmt_elem)
                {
                    self.open_elems.pop();
                }
                self.open_elems.pop();
                self.active_formatting.remove(fmt_index);
                return;
            };

            let furthest_block_index = self.open_elems.position(&self.sink, &furthest_block).unwrap();
            let common_ancestor = self
                .open_elems
                .nth_from_top(self.open_elems.len() - fmt_stack_index)
                .cloned()
                .unwrap();

            let mut bookmark = Bookmark::Replace(fmt_elem.clone());
            let mut node;
            let mut node_index = furthest_block_index;
            let mut last_node = furthest_block.clone();

            let mut inner_loop_counter = 0u32;
            loop {
                inner_loop_counter += 1;

                if node_index == 0 {
                    break;
                }
                node_index -= 1;
                node = self.open_elems.nth_from_top(self.open_elems.len() - 1 - node_index).unwrap().clone();

                if self.sink.same_node(&node, &fmt_elem) {
                    break;
                }

                let node_afe_index = self.active_formatting.position_of(&self.sink, &node);
                if inner_loop_counter > 3 {
                    if let Some(i) = node_afe_index {
                        self.active_formatting.remove(i);
                    }
                    self.open_elems.remove(&self.sink, &node);
                    continue;
                }

                let node_afe_index = match node_afe_index {
                    Some(i) => i,
                    None => {
                        self.open_elems.remove(&self.sink, &node);
                        continue;
                    },
                };
                let tag = match self.active_formatting.get(node_afe_index) {
                    Some(FormatEntry::Element(_, t)) => t.clone(),
                    _ => continue,
                };
                let clone = self.create_element(tag.name.clone(), tag.attrs.clone(), ElementFlags::default());
                self.active_formatting.replace(node_afe_index, FormatEntry::Element(clone.clone(), tag));
                if let Some(idx) = self.open_elems.position(&self.sink, &node) {
                    self.open_elems.remove(&self.sink, &node);
                    self.open_elems.insert_at(idx, clone.clone());
                }
                if self.sink.same_node(&last_node, &furthest_block) {
                    bookmark = Bookmark::InsertAfter(clone.clone());
                }
                self.sink.remove_from_parent(&last_node);
                self.sink.append(&clone, AppendNode(last_node.clone()));
                last_node = clone;
            }

            self.sink.remove_from_parent(&last_node);
            if self.sink.elem_name(&common_ancestor).local.as_ref() == "table"
                || matches!(&*self.sink.elem_name(&common_ancestor).local, "tbody" | "tfoot" | "thead" | "tr")
            {
                let (target, prev) = self.appropriate_insertion_target_for(&common_ancestor);
                match prev {
                    Some(p) => self.sink.append_based_on_parent_node(&target, &p, AppendNode(last_node.clone())),
                    None => self.sink.append(&target, AppendNode(last_node.clone())),
                }
            } else {
                self.sink.append(&common_ancestor, AppendNode(last_node.clone()));
            }

            let (name, attrs) = match self.active_formatting.get(fmt_index) {
                Some(FormatEntry::Element(_, t)) => (t.name.clone(), t.attrs.clone()),
                _ => return,
            };
            let new_fmt = self.create_element(name.clone(), attrs.clone(), ElementFlags::default());
            self.sink.reparent_children(&furthest_block, &new_fmt);
            self.sink.append(&furthest_block, AppendNode(new_fmt.clone()));

            self.active_formatting.remove(fmt_index);
            let tag = Tag {
                kind: TagKind::StartTag,
                name,
                self_closing: false,
                attrs,
            };
            match bookmark {
                Bookmark::Replace(_) => self.active_formatting.push(&self.sink, new_fmt.clone(), tag),
                Bookmark::InsertAfter(after) => {
                    let pos = self.active_formatting.position_of(&self.sink, &after).map(|i| i + 1).unwrap_or(self.active_formatting.len());
                    self.active_formatting.insert(pos, FormatEntry::Element(new_fmt.clone(), tag));
                },
            }

            self.open_elems.remove(&self.sink, &fmt_elem);
            if let Some(idx) = self.open_elems.position(&self.sink, &furthest_block) {
                self.open_elems.insert_at(idx + 1, new_fmt);
            }
        }
    }

    fn appropriate_insertion_target_for(&self, table_like: &Sink::Handle) -> (Sink::Handle, Option<Sink::Handle>) {
        if self.sink.has_parent_node(table_like) {
            return (table_like.clone(), Some(table_like.clone()));
        }
        let idx = self.open_elems.position(&self.sink, table_like).unwrap_or(0);
        let prev = if idx == 0 {
            self.html_elem()
        } else {
            self.open_elems.nth_from_top(self.open_elems.len() - idx).unwrap().clone()
        };
        (prev, None)
    }

    fn is_special_element(&self, h: &Sink::Handle) -> bool {
        let name = self.sink.elem_name(h);
        if *name.ns != ns::html() {
            return false;
        }
        matches!(
            &*name.local,
            "address" | "applet" | "area" | "article" | "aside" | "base" | "basefont" | "bgsound"
                | "blockquote" | "body" | "br" | "button" | "caption" | "center" | "col" | "colgroup"
                | "dd" | "details" | "dir" | "div" | "dl" | "dt" | "embed" | "fieldset" | "figcaption"
                | "figure" | "footer" | "form" | "frame" | "frameset" | "h1" | "h2" | "h3" | "h4" | "h5"
                | "h6" | "head" | "header" | "hgroup" | "hr" | "html" | "iframe" | "img" | "input"
                | "keygen" | "li" | "link" | "listing" | "main" | "marquee" | "menu" | "meta" | "nav"
                | "noembed" | "noframes" | "noscript" | "object" | "ol" | "p" | "param" | "plaintext"
                | "pre" | "script" | "section" | "select" | "source" | "style" | "summary" | "table"
                | "tbody" | "td" | "template" | "textarea" | "tfoot" | "th" | "thead" | "title" | "tr"
                | "track" | "ul" | "wbr" | "xmp"
        )
    }

    fn any_other_end_tag(&mut self, name: LocalName) {
        for h in self.open_elems.iter_from_top().cloned().collect::<Vec<_>>() {
            let n = self.sink.elem_name(&h);
            if *n.ns == ns::html() && *n.local == name {
                self.generate_implied_end_except(Some(&name));
                if !self.sink.same_node(&self.current_node(), &h) {
                    self.parse_error("unexpected-end-tag");
                }
                self.open_elems.pop_until(&self.sink, |m| *m.ns == ns::html() && *m.local == name);
                self.open_elems.pop();
                return;
            }
            if self.is_special_element(&h) {
                self.parse_error("unexpected-end-tag");
                return;
            }
        }
    }

    // ---- foreign content (§13.2.5 MathML/SVG) -------------------------

    /// Whether the current insertion-mode dispatch should be bypassed in
    /// favor of the foreign-content rules for `token`.
    fn is_foreign(&self, token: &Token) -> bool {
        if matches!(token, Token::Eof) || self.open_elems.is_empty() {
            return false;
        }
        let current = self.adjusted_current_node();
        let name = self.sink.elem_name(&current);
        if *name.ns == ns::html() {
            return false;
        }
        if mathml_text_integration_point(name) {
            match token {
                Token::Characters(..) | Token::NullCharacter => return false,
                Token::Tag(t) if t.kind == TagKind::StartTag && !matches!(&*t.name, "mglyph" | "malignmark") => {
                    return false;
                },
                _ => {},
            }
        }
        let name = self.sink.elem_name(&current);
        if svg_html_integration_point(name) {
            match token {
                Token::Characters(..) | Token::NullCharacter => return false,
                Token::Tag(t) if t.kind == TagKind::StartTag => return false,
                _ => {},
            }
        }
        let name = self.sink.elem_name(&current);
        if *name.ns == ns::mathml() && &*name.local == "annotation-xml" {
            match token {
                Token::Tag(t) if t.kind == TagKind::StartTag && &*t.name == "svg" => return false,
                Token::Characters(..) | Token::NullCharacter => {
                    return !self.sink.is_mathml_annotation_xml_integration_point(&current);
                },
                Token::Tag(t) if t.kind == TagKind::StartTag => {
                    return !self.sink.is_mathml_annotation_xml_integration_point(&current);
                },
                _ => {},
            }
        }
        true
    }

    fn adjust_attributes(&self, tag: &mut Tag, mut map: impl FnMut(&str) -> Option<(Namespace, LocalName)>) {
        for attr in tag.attrs.iter_mut() {
            if let Some((ns, local)) = map(&attr.name.local) {
                attr.name = QualName::new(None, ns, local);
            }
        }
    }

    fn adjust_mathml_attributes(&self, tag: &mut Tag) {
        self.adjust_attributes(tag, |k| {
            if k == "definitionurl" {
                Some((ns::empty(), LocalName::from("definitionURL")))
            } else {
                None
            }
        });
    }

    fn adjust_svg_attributes(&self, tag: &mut Tag) {
        const FIXUPS: &[(&str, &str)] = &[
            ("attributename", "attributeName"),
            ("attributetype", "attributeType"),
            ("basefrequency", "baseFrequency"),
            ("baseprofile", "baseProfile"),
            ("calcmode", "calcMode"),
            ("clippathunits", "clipPathUnits"),
            ("diffuseconstant", "diffuseConstant"),
            ("edgemode", "edgeMode"),
            ("filterunits", "filterUnits"),
            ("glyphref", "glyphRef"),
            ("gradienttransform", "gradientTransform"),
            ("gradientunits", "gradientUnits"),
            ("kernelmatrix", "kernelMatrix"),
            ("kernelunitlength", "kernelUnitLength"),
            ("keypoints", "keyPoints"),
            ("keysplines", "keySplines"),
            ("keytimes", "keyTimes"),
            ("lengthadjust", "lengthAdjust"),
            ("limitingconeangle", "limitingConeAngle"),
            ("markerheight", "markerHeight"),
            ("markerunits", "markerUnits"),
            ("markerwidth", "markerWidth"),
            ("maskcontentunits", "maskContentUnits"),
            ("maskunits", "maskUnits"),
            ("numoctaves", "numOctaves"),
            ("pathlength", "pathLength"),
            ("patterncontentunits", "patternContentUnits"),
            ("patterntransform", "patternTransform"),
            ("patternunits", "patternUnits"),
            ("pointsatx", "pointsAtX"),
            ("pointsaty", "pointsAtY"),
            ("pointsatz", "pointsAtZ"),
            ("preservealpha", "preserveAlpha"),
            ("preserveaspectratio", "preserveAspectRatio"),
            ("primitiveunits", "primitiveUnits"),
            ("refx", "refX"),
            ("refy", "refY"),
            ("repeatcount", "repeatCount"),
            ("repeatdur", "repeatDur"),
            ("requiredextensions", "requiredExtensions"),
            ("requiredfeatures", "requiredFeatures"),
            ("specularconstant", "specularConstant"),
            ("specularexponent", "specularExponent"),
            ("spreadmethod", "spreadMethod"),
            ("startoffset", "startOffset"),
            ("stddeviation", "stdDeviation"),
            ("stitchtiles", "stitchTiles"),
            ("surfacescale", "surfaceScale"),
            ("systemlanguage", "systemLanguage"),
            ("tablevalues", "tableValues"),
            ("targetx", "targetX"),
            ("targety", "targetY"),
            ("textlength", "textLength"),
            ("viewbox", "viewBox"),
            ("viewtarget", "viewTarget"),
            ("xchannelselector", "xChannelSelector"),
            ("ychannelselector", "yChannelSelector"),
            ("zoomandpan", "zoomAndPan"),
        ];
        self.adjust_attributes(tag, |k| {
            FIXUPS.iter().find(|(from, _)| *from == k).map(|(_, to)| (ns::empty(), LocalName::from(*to)))
        });
    }

    fn adjust_foreign_attributes(&self, tag: &mut Tag) {
        self.adjust_attributes(tag, |k| match k {
            "xlink:actuate" | "xlink:arcrole" | "xlink:href" | "xlink:role" | "xlink:show" | "xlink:title"
            | "xlink:type" => Some((ns::xlink(), LocalName::from(k.trim_start_matches("xlink:")))),
            "xml:lang" | "xml:space" => Some((ns::xml(), LocalName::from(k.trim_start_matches("xml:")))),
            "xmlns" | "xmlns:xlink" => Some((ns::xmlns(), LocalName::from(k))),
            _ => None,
        });
    }

    fn adjust_svg_tag_name(&self, tag: &mut Tag) {
        const FIXUPS: &[(&str, &str)] = &[
            ("altglyph", "altGlyph"),
            ("altglyphdef", "altGlyphDef"),
            ("altglyphitem", "altGlyphItem"),
            ("animatecolor", "animateColor"),
            ("animatemotion", "animateMotion"),
            ("animatetransform", "animateTransform"),
            ("clippath", "clipPath"),
            ("feblend", "feBlend"),
            ("fecolormatrix", "feColorMatrix"),
            ("fecomponenttransfer", "feComponentTransfer"),
            ("fecomposite", "feComposite"),
            ("feconvolvematrix", "feConvolveMatrix"),
            ("fediffuselighting", "feDiffuseLighting"),
            ("fedisplacementmap", "feDisplacementMap"),
            ("fedistantlight", "feDistantLight"),
            ("fedropshadow", "feDropShadow"),
            ("feflood", "feFlood"),
            ("fefunca", "feFuncA"),
            ("fefuncb", "feFuncB"),
            ("fefuncg", "feFuncG"),
            ("fefuncr", "feFuncR"),
            ("fegaussianblur", "feGaussianBlur"),
            ("feimage", "feImage"),
            ("femerge", "feMerge"),
            ("femergenode", "feMergeNode"),
            ("femorphology", "feMorphology"),
            ("feoffset", "feOffset"),
            ("fepointlight", "fePointLight"),
            ("fespecularlighting", "feSpecularLighting"),
            ("fespotlight", "feSpotLight"),
            ("fetile", "feTile"),
            ("feturbulence", "feTurbulence"),
            ("foreignobject", "foreignObject"),
            ("glyphref", "glyphRef"),
            ("lineargradient", "linearGradient"),
            ("radialgradient", "radialGradient"),
            ("textpath", "textPath"),
        ];
        if let Some((_, to)) = FIXUPS.iter().find(|(from, _)| *from == &*tag.name) {
            tag.name = LocalName::from(*to);
        }
    }

    fn enter_foreign(&mut self, mut tag: Tag, namespace: Namespace) -> ProcessResult<Sink::Handle> {
        if namespace == ns::mathml() {
            self.adjust_mathml_attributes(&mut tag);
        } else if namespace == ns::svg() {
            self.adjust_svg_attributes(&mut tag);
        }
        self.adjust_foreign_attributes(&mut tag);
        let self_closing = tag.self_closing;
        self.insert_foreign_element(tag, namespace, !self_closing);
        if self_closing {
            ProcessResult::DoneAckSelfClosing
        } else {
            ProcessResult::Done
        }
    }

    fn foreign_start_tag(&mut self, mut tag: Tag) -> ProcessResult<Sink::Handle> {
        let current_ns = self.sink.elem_name(&self.adjusted_current_node()).ns.clone();
        if current_ns == ns::mathml() {
            self.adjust_mathml_attributes(&mut tag);
        } else if current_ns == ns::svg() {
            self.adjust_svg_tag_name(&mut tag);
            self.adjust_svg_attributes(&mut tag);
        }
        self.adjust_foreign_attributes(&mut tag);
        let self_closing = tag.self_closing;
        self.insert_foreign_element(tag, current_ns, !self_closing);
        if self_closing {
            ProcessResult::DoneAckSelfClosing
        } else {
            ProcessResult::Done
        }
    }

    fn unexpected_start_tag_in_foreign_content(&mut self, tag: Tag) -> ProcessResult<Sink::Handle> {
        self.parse_error("unexpected-start-tag-in-foreign-content");
        loop {
            let name = self.sink.elem_name(&self.current_node());
            if *name.ns == ns::html() || mathml_text_integration_point(name.clone()) || svg_html_integration_point(name) {
                break;
            }
            self.open_elems.pop();
        }
        self.step(self.mode, Token::Tag(tag))
    }

    fn step_foreign(&mut self, token: Token) -> TokenSinkResult<Sink::Handle> {
        let result = match token {
            Token::NullCharacter => {
                self.parse_error("null-character");
                self.append_text(StrTendril::from_char('\u{FFFD}'));
                ProcessResult::Done
            },
            Token::Characters(split, text) => {
                if split != SplitStatus::Whitespace {
                    self.frameset_ok = false;
                }
                self.append_text(text);
                ProcessResult::Done
            },
            Token::Comment(text) => {
                self.append_comment(text);
                ProcessResult::Done
            },
            Token::Doctype(_) => {
                self.parse_error("doctype-in-foreign-content");
                ProcessResult::Done
            },
            Token::Tag(t) if t.kind == TagKind::StartTag && FOREIGN_BREAKOUT.contains(&&*t.name) => {
                self.unexpected_start_tag_in_foreign_content(t)
            },
            Token::Tag(t) if t.kind == TagKind::StartTag => self.foreign_start_tag(t),
            Token::Tag(t) => {
                let mut idx = self.open_elems.len();
                let mut found = None;
                for h in self.open_elems.iter_from_top().cloned().collect::<Vec<_>>() {
                    idx -= 1;
                    let name = self.sink.elem_name(&h).local.clone();
                    if idx == 0 || *self.sink.elem_name(&h).ns == ns::html() {
                        break;
                    }
                    if name.to_ascii_lowercase() == t.name.to_ascii_lowercase() {
                        found = Some(idx);
                        break;
                    }
                }
                if let Some(target_idx) = found {
                    while self.open_elems.len() > target_idx {
                        self.open_elems.pop();
                    }
                    ProcessResult::Done
                } else {
                    self.step(self.mode, Token::Tag(t))
                }
            },
            Token::Eof => ProcessResult::Done,
        };
        match result {
            ProcessResult::Done => TokenSinkResult::Continue,
            ProcessResult::DoneAckSelfClosing => TokenSinkResult::Continue,
            other => self.finish_step_result(other),
        }
    }

    fn finish_step_result(&mut self, result: ProcessResult<Sink::Handle>) -> TokenSinkResult<Sink::Handle> {
        match result {
            ProcessResult::Done | ProcessResult::DoneAckSelfClosing => TokenSinkResult::Continue,
            ProcessResult::SplitWhitespace(rest) => self.step(self.mode, Token::Characters(SplitStatus::NotWhitespace, rest)),
            ProcessResult::Reprocess(mode, token) => self.step(mode, token),
            ProcessResult::ReprocessForeign(token) => self.step(self.mode, token),
            ProcessResult::Script(h) => match self.sink.complete_script(&h) {
                NextParserState::Continue => TokenSinkResult::Continue,
                NextParserState::Suspend => TokenSinkResult::Script(h),
            },
            ProcessResult::ToPlaintext => TokenSinkResult::Plaintext,
            ProcessResult::ToRawText(kind) => TokenSinkResult::RawData(kind),
        }
    }

    // ---- driving the state machine -----------------------------------

    pub fn process_token(&mut self, token: crate::tokenizer::interface::Token) -> TokenSinkResult<Sink::Handle> {
        use crate::tokenizer::interface::Token as TokTok;
        let tok = match token {
            TokTok::Doctype(d) => Token::Doctype(d),
            TokTok::Tag(t) => Token::Tag(t),
            TokTok::Comment(s) => Token::Comment(s),
            TokTok::Characters(s) => Token::Characters(SplitStatus::NotSplit, s),
            TokTok::SpaceCharacters(s) => Token::Characters(SplitStatus::Whitespace, s),
            TokTok::NullCharacter => Token::NullCharacter,
            TokTok::ParseError(m) => {
                self.parse_error(m);
                return TokenSinkResult::Continue;
            },
            TokTok::Eof => Token::Eof,
        };
        if self.is_foreign(&tok) {
            self.step_foreign(tok)
        } else {
            self.step(self.mode, tok)
        }
    }

    fn step(&mut self, mode: InsertionMode, token: Token) -> TokenSinkResult<Sink::Handle> {
        let result = rules::step(self, mode, token);
        self.finish_step_result(result)
    }

    pub fn end(&mut self) {
        self.sink.parse_error(Cow::Borrowed("end"));
    }
}

impl<Sink: TreeSink> TokenSink for TreeBuilder<Sink> {
    type Handle = Sink::Handle;

    fn process_token(&mut self, token: crate::tokenizer::interface::Token, _line_number: u64) -> TokenSinkResult<Sink::Handle> {
        TreeBuilder::process_token(self, token)
    }

    fn end(&mut self) {
        while self.open_elems.pop().is_some() {}
    }

    fn adjusted_current_node_present_but_in_html_namespace(&self) -> bool {
        if self.open_elems.is_empty() {
            return true;
        }
        *self.sink.elem_name(&self.adjusted_current_node()).ns == ns::html()
    }
}
