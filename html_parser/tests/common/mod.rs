//! A minimal reference-counted DOM used only by this crate's integration
//! tests. Grounded on the teacher's `rcdom` crate, trimmed to what the
//! tests need to assert against (no serializer, no `Debug`-pretty tree
//! dump) — this is test scaffolding, not a published DOM.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use html_parser::tendril::StrTendril;
use html_parser::tree_sink::{AppendNode, AppendText, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html_parser::{Attribute, ExpandedName, QualName};

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        template_contents: RefCell<Option<Handle>>,
    },
    ProcessingInstruction {
        target: StrTendril,
        contents: StrTendril,
    },
}

pub struct Node {
    pub parent: Cell<Option<Weak<Node>>>,
    pub children: RefCell<Vec<Handle>>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Rc<Self> {
        Rc::new(Node {
            data,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
        })
    }
}

pub type Handle = Rc<Node>;

fn append(parent: &Handle, child: Handle) {
    let previous = child.parent.replace(Some(Rc::downgrade(parent)));
    assert!(previous.is_none(), "child already had a parent");
    parent.children.borrow_mut().push(child);
}

fn get_parent_and_index(target: &Handle) -> Option<(Handle, usize)> {
    let weak = target.parent.take()?;
    let parent = weak.upgrade().expect("dangling weak pointer");
    target.parent.set(Some(weak));
    let i = parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, target))
        .expect("node has a parent but isn't among its children");
    Some((parent, i))
}

fn append_to_existing_text(prev: &Handle, text: &str) -> bool {
    match &prev.data {
        NodeData::Text { contents } => {
            contents.borrow_mut().push_slice(text);
            true
        },
        _ => false,
    }
}

fn remove_from_parent(target: &Handle) {
    if let Some((parent, i)) = get_parent_and_index(target) {
        parent.children.borrow_mut().remove(i);
        target.parent.set(None);
    }
}

/// The parsed document (or, for `parse_fragment`, the fragment's
/// synthetic `html` root).
pub struct Dom {
    pub document: Handle,
    pub errors: RefCell<Vec<String>>,
    pub quirks_mode: Cell<QuirksMode>,
}

impl Default for Dom {
    fn default() -> Self {
        Dom {
            document: Node::new(NodeData::Document),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }
}

impl TreeSink for Dom {
    type Handle = Handle;
    type Output = Self;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&mut self, msg: std::borrow::Cow<'static, str>) {
        self.errors.borrow_mut().push(msg.into_owned());
    }

    fn get_document(&mut self) -> Handle {
        self.document.clone()
    }

    fn get_template_contents(&mut self, target: &Handle) -> Handle {
        match &target.data {
            NodeData::Element { template_contents, .. } => {
                template_contents.borrow().clone().expect("not a template element")
            },
            _ => panic!("not an element"),
        }
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn elem_name<'a>(&'a self, target: &'a Handle) -> ExpandedName<'a> {
        match &target.data {
            NodeData::Element { name, .. } => name.expanded(),
            _ => panic!("not an element"),
        }
    }

    fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>, flags: ElementFlags) -> Handle {
        Node::new(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents: RefCell::new(if flags.template {
                Some(Node::new(NodeData::Document))
            } else {
                None
            }),
        })
    }

    fn create_comment(&mut self, text: StrTendril) -> Handle {
        Node::new(NodeData::Comment { contents: text })
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Handle {
        Node::new(NodeData::ProcessingInstruction { target, contents: data })
    }

    fn append(&mut self, parent: &Handle, child: NodeOrText<Handle>) {
        if let AppendText(ref text) = child {
            if let Some(last) = parent.children.borrow().last() {
                if append_to_existing_text(last, text) {
                    return;
                }
            }
        }
        let node = match child {
            AppendText(text) => Node::new(NodeData::Text {
                contents: RefCell::new(text),
            }),
            AppendNode(node) => node,
        };
        append(parent, node);
    }

    fn append_based_on_parent_node(&mut self, element: &Handle, prev_element: &Handle, child: NodeOrText<Handle>) {
        let has_parent = get_parent_and_index(element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_before_sibling(&mut self, sibling: &Handle, child: NodeOrText<Handle>) {
        let (parent, i) = get_parent_and_index(sibling).expect("sibling has no parent");
        let node = match (child, i) {
            (AppendText(text), 0) => Node::new(NodeData::Text {
                contents: RefCell::new(text),
            }),
            (AppendText(text), i) => {
                let children = parent.children.borrow();
                if append_to_existing_text(&children[i - 1], &text) {
                    return;
                }
                drop(children);
                Node::new(NodeData::Text {
                    contents: RefCell::new(text),
                })
            },
            (AppendNode(node), _) => node,
        };
        remove_from_parent(&node);
        node.parent.set(Some(Rc::downgrade(&parent)));
        parent.children.borrow_mut().insert(i, node);
    }

    fn append_doctype_to_document(&mut self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        append(
            &self.document,
            Node::new(NodeData::Doctype {
                name,
                public_id,
                system_id,
            }),
        );
    }

    fn add_attrs_if_missing(&mut self, target: &Handle, attrs: Vec<Attribute>) {
        let NodeData::Element { attrs: existing, .. } = &target.data else {
            panic!("not an element");
        };
        let mut existing = existing.borrow_mut();
        let present: HashSet<_> = existing.iter().map(|a| a.name.clone()).collect();
        existing.extend(attrs.into_iter().filter(|a| !present.contains(&a.name)));
    }

    fn remove_from_parent(&mut self, target: &Handle) {
        remove_from_parent(target);
    }

    fn reparent_children(&mut self, node: &Handle, new_parent: &Handle) {
        let mut children = node.children.borrow_mut();
        for child in children.iter() {
            child.parent.set(Some(Rc::downgrade(new_parent)));
        }
        new_parent.children.borrow_mut().extend(children.drain(..));
    }

    fn mark_script_already_started(&mut self, _node: &Handle) {}
}

/// Depth-first, in-order text content, analogous to DOM `textContent`.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        },
    }
}

/// Finds the first descendant element named `local_name`, depth-first.
pub fn find_element(node: &Handle, local_name: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data {
        if &*name.local == local_name {
            return Some(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_element(child, local_name) {
            return Some(found);
        }
    }
    None
}

pub fn element_names(node: &Handle) -> Vec<String> {
    let mut out = Vec::new();
    collect_names(node, &mut out);
    out
}

fn collect_names(node: &Handle, out: &mut Vec<String>) {
    if let NodeData::Element { name, .. } = &node.data {
        out.push(name.local.to_string());
    }
    for child in node.children.borrow().iter() {
        collect_names(child, out);
    }
}
