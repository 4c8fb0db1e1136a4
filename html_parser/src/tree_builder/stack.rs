// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The stack of open elements and the list of active formatting elements
//! (§5.3), plus the tag-set predicates the various scope algorithms are
//! built from.

use markup_core::tree_sink::TreeSink;
use markup_core::{ns, ExpandedName};

use crate::tokenizer::interface::Tag;

use super::types::FormatEntry;

fn is_default_scope_boundary(name: ExpandedName<'_>) -> bool {
    if *name.ns != ns::html() {
        return matches!(
            (&**name.ns, &*name.local),
            ("http://www.w3.org/1998/Math/MathML", "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml")
                | ("http://www.w3.org/2000/svg", "foreignObject" | "desc" | "title")
        );
    }
    matches!(
        &*name.local,
        "applet"
            | "caption"
            | "html"
            | "table"
            | "td"
            | "th"
            | "marquee"
            | "object"
            | "template"
    )
}

fn is_list_item_scope_boundary(name: ExpandedName<'_>) -> bool {
    is_default_scope_boundary(name) || (*name.ns == ns::html() && matches!(&*name.local, "ol" | "ul"))
}

fn is_button_scope_boundary(name: ExpandedName<'_>) -> bool {
    is_default_scope_boundary(name) || (*name.ns == ns::html() && &*name.local == "button")
}

fn is_table_scope_boundary(name: ExpandedName<'_>) -> bool {
    *name.ns == ns::html() && matches!(&*name.local, "html" | "table" | "template")
}

fn is_select_scope_boundary(name: ExpandedName<'_>) -> bool {
    !(*name.ns == ns::html() && matches!(&*name.local, "optgroup" | "option"))
}

#[derive(PartialEq, Eq, Copy, Clone)]
pub enum Scope {
    Default,
    ListItem,
    Button,
    Table,
    Select,
}

/// The stack of open elements (§3): a LIFO list of the ancestors the
/// tokenizer is currently "inside".
pub struct ElementStack<Handle> {
    items: Vec<Handle>,
}

impl<Handle: Clone> ElementStack<Handle> {
    pub fn new() -> Self {
        ElementStack { items: Vec::new() }
    }

    pub fn push(&mut self, h: Handle) {
        self.items.push(h);
    }

    pub fn pop(&mut self) -> Option<Handle> {
        self.items.pop()
    }

    pub fn top(&self) -> Option<&Handle> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter_from_top(&self) -> impl Iterator<Item = &Handle> {
        self.items.iter().rev()
    }

    pub fn contains<Sink: TreeSink<Handle = Handle>>(&self, sink: &Sink, needle: &Handle) -> bool {
        self.items.iter().any(|h| sink.same_node(h, needle))
    }

    pub fn remove<Sink: TreeSink<Handle = Handle>>(&mut self, sink: &Sink, target: &Handle) {
        self.items.retain(|h| !sink.same_node(h, target));
    }

    pub fn position<Sink: TreeSink<Handle = Handle>>(&self, sink: &Sink, target: &Handle) -> Option<usize> {
        self.items.iter().position(|h| sink.same_node(h, target))
    }

    pub fn insert_at(&mut self, index: usize, h: Handle) {
        self.items.insert(index, h);
    }

    pub fn nth_from_top(&self, n: usize) -> Option<&Handle> {
        let len = self.items.len();
        if n >= len {
            None
        } else {
            Some(&self.items[len - 1 - n])
        }
    }

    /// §5.3's named-element scope check, parameterized by which boundary
    /// set applies.
    pub fn in_scope<Sink: TreeSink<Handle = Handle>>(
        &self,
        sink: &Sink,
        scope: Scope,
        is_target: impl Fn(ExpandedName<'_>) -> bool,
    ) -> bool {
        let boundary: fn(ExpandedName<'_>) -> bool = match scope {
            Scope::Default => is_default_scope_boundary,
            Scope::ListItem => is_list_item_scope_boundary,
            Scope::Button => is_button_scope_boundary,
            Scope::Table => is_table_scope_boundary,
            Scope::Select => is_select_scope_boundary,
        };
        for h in self.items.iter().rev() {
            let name = sink.elem_name(h);
            if is_target(name.clone()) {
                return true;
            }
            if scope == Scope::Select {
                if !boundary(name) {
                    return false;
                }
            } else if boundary(name) {
                return false;
            }
        }
        false
    }

    pub fn in_scope_named<Sink: TreeSink<Handle = Handle>>(
        &self,
        sink: &Sink,
        scope: Scope,
        ns: markup_core::Namespace,
        name: markup_core::LocalName,
    ) -> bool {
        self.in_scope(sink, scope, |n| n.ns == &ns && n.local == &name)
    }

    pub fn pop_until<Sink: TreeSink<Handle = Handle>>(
        &mut self,
        sink: &Sink,
        pred: impl Fn(ExpandedName<'_>) -> bool,
    ) {
        while let Some(top) = self.top() {
            if pred(sink.elem_name(top)) {
                break;
            }
            self.pop();
        }
    }

    pub fn pop_until_named<Sink: TreeSink<Handle = Handle>>(
        &mut self,
        sink: &Sink,
        ns: markup_core::Namespace,
        name: markup_core::LocalName,
    ) {
        self.pop_until(sink, |n| n.ns == &ns && n.local == &name);
        self.pop();
    }
}

impl<Handle: Clone> Default for ElementStack<Handle> {
    fn default() -> Self {
        Self::new()
    }
}

/// The list of active formatting elements (§5.3). `push` enforces the
/// Noah's Ark clause: at most three matching entries (same name,
/// namespace, and attribute set order-insensitively) survive in a row.
pub struct ActiveFormattingList<Handle> {
    entries: Vec<FormatEntry<Handle>>,
}

impl<Handle: Clone> ActiveFormattingList<Handle> {
    pub fn new() -> Self {
        ActiveFormattingList { entries: Vec::new() }
    }

    pub fn push_marker(&mut self) {
        self.entries.push(FormatEntry::Marker);
    }

    pub fn push<Sink: TreeSink<Handle = Handle>>(&mut self, sink: &Sink, element: Handle, tag: Tag) {
        let mut matches_seen = 0;
        let mut remove_at = None;
        for (i, entry) in self.entries.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(h, t) => {
                    if tags_equivalent(sink, h, t, &element, &tag) {
                        matches_seen += 1;
                        if matches_seen == 3 {
                            remove_at = Some(i);
                            break;
                        }
                    }
                },
            }
        }
        if let Some(i) = remove_at {
            self.entries.remove(i);
        }
        self.entries.push(FormatEntry::Element(element, tag));
    }

    pub fn clear_to_last_marker(&mut self) {
        while let Some(entry) = self.entries.pop() {
            if matches!(entry, FormatEntry::Marker) {
                break;
            }
        }
    }

    pub fn iter_from_end(&self) -> impl Iterator<Item = (usize, &FormatEntry<Handle>)> {
        self.entries.iter().enumerate().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&FormatEntry<Handle>> {
        self.entries.get(i)
    }

    pub fn remove(&mut self, i: usize) {
        self.entries.remove(i);
    }

    pub fn insert(&mut self, i: usize, e: FormatEntry<Handle>) {
        self.entries.insert(i, e);
    }

    pub fn replace(&mut self, i: usize, e: FormatEntry<Handle>) {
        self.entries[i] = e;
    }

    pub fn position_of<Sink: TreeSink<Handle = Handle>>(&self, sink: &Sink, needle: &Handle) -> Option<usize> {
        self.entries.iter().position(|e| match e {
            FormatEntry::Element(h, _) => sink.same_node(h, needle),
            FormatEntry::Marker => false,
        })
    }
}

impl<Handle: Clone> Default for ActiveFormattingList<Handle> {
    fn default() -> Self {
        Self::new()
    }
}

fn tags_equivalent<Sink: TreeSink<Handle = Handle>, Handle>(
    _sink: &Sink,
    _h1: &Handle,
    t1: &Tag,
    _h2: &Handle,
    t2: &Tag,
) -> bool {
    if t1.name != t2.name || t1.attrs.len() != t2.attrs.len() {
        return false;
    }
    // Order-insensitive attribute equality, per the Noah's Ark clause
    // (see REDESIGN FLAGS).
    t1.attrs.iter().all(|a| t2.attrs.iter().any(|b| a.name == b.name && a.value == b.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_sets_cover_expected_names() {
        assert!(is_default_scope_boundary(ExpandedName {
            ns: &ns::html(),
            local: &markup_core::LocalName::from("table"),
        }));
        assert!(!is_default_scope_boundary(ExpandedName {
            ns: &ns::html(),
            local: &markup_core::LocalName::from("div"),
        }));
        assert!(is_table_scope_boundary(ExpandedName {
            ns: &ns::html(),
            local: &markup_core::LocalName::from("html"),
        }));
    }
}
