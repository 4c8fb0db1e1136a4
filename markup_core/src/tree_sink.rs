// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The abstract tree-builder interface (§6 of the specification).
//!
//! This is the *only* way the tree constructor touches a concrete DOM
//! representation. A [`TreeSink`] owns a `Handle` type (an opaque reference
//! to a node, usually `Rc<...>` or an arena index) and provides the node
//! operations §3 describes; the tree constructor never reaches into a
//! handle's storage directly.

use std::borrow::Cow;

use tendril::StrTendril;

use crate::interface::{Attribute, ExpandedName, QualName};

/// Either a node to adopt as-is, or text to merge with a sibling text node
/// if one is already there.
pub enum NodeOrText<Handle> {
    AppendNode(Handle),
    AppendText(StrTendril),
}
pub use NodeOrText::{AppendNode, AppendText};

/// <https://dom.spec.whatwg.org/#concept-document-quirks>
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    NoQuirks,
}

/// Flags accompanying a `create_element` call, covering the few cases where
/// the tree builder must tell the sink something it can't infer from the
/// name and attributes alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct ElementFlags {
    /// This element is a `<template>`; the sink should give it a
    /// `get_template_contents` companion document fragment.
    pub template: bool,
    /// This element was created while parsing markup known in advance to
    /// be a fragment (e.g. via `parse_fragment`), rather than a full
    /// document.
    pub mathml_annotation_xml_integration_point: bool,
}

/// What the sink wants the parser to do after handing it a `<script>`
/// element to execute.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NextParserState {
    Continue,
    Suspend,
}

/// The abstract sink a [`crate::TreeSink`] user implements to receive a
/// parsed tree. `Handle` is cheap to clone (typically a reference-counted
/// pointer or arena index) and is never dereferenced by the tree
/// constructor itself.
pub trait TreeSink {
    type Handle: Clone;
    type Output;

    /// Consume the sink, returning the finished document/fragment.
    fn finish(self) -> Self::Output;

    /// Record a parse error. `msg` is a short symbolic description; a
    /// conforming caller of the tree constructor wraps this with the
    /// current `(line, col)` before storing it (see §6, "Parse-error
    /// codes").
    fn parse_error(&mut self, msg: Cow<'static, str>);

    fn get_document(&mut self) -> Self::Handle;

    /// Return the content document fragment of a `<template>` element
    /// previously created with `ElementFlags { template: true, .. }`.
    fn get_template_contents(&mut self, target: &Self::Handle) -> Self::Handle;

    fn set_quirks_mode(&mut self, mode: QuirksMode);

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool;

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a>;

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle;

    fn create_comment(&mut self, text: StrTendril) -> Self::Handle;

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Self::Handle;

    /// Append a node or text as the last child of `parent`. If the last
    /// child is already a text node and `child` is text, the sink should
    /// merge instead of creating a new node.
    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// Foster-parenting append: insert `child` as a child of `element`'s
    /// parent if it has one (immediately before `element`), otherwise as a
    /// child of `prev_element`. See §4.4, "Foster parenting".
    fn append_based_on_parent_node(
        &mut self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    );

    fn append_before_sibling(&mut self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>);

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    );

    /// Add each attribute in `attrs` to `target` unless an attribute with
    /// the same name is already present (used when a duplicate `<html>` or
    /// `<body>` start tag appears after the real one).
    fn add_attrs_if_missing(&mut self, target: &Self::Handle, attrs: Vec<Attribute>);

    fn remove_from_parent(&mut self, target: &Self::Handle);

    fn reparent_children(&mut self, node: &Self::Handle, new_parent: &Self::Handle);

    fn mark_script_already_started(&mut self, node: &Self::Handle);

    /// Tell the sink a script element is ready to run. The default does
    /// nothing and asks the parser to continue immediately — script
    /// execution itself is out of scope (§1).
    fn complete_script(&mut self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn is_mathml_annotation_xml_integration_point(&self, _target: &Self::Handle) -> bool {
        false
    }

    /// Does `node` have a parent? Used by fragment parsing and the
    /// adoption agency to decide foster-parenting targets.
    fn has_parent_node(&self, _node: &Self::Handle) -> bool {
        true
    }
}
