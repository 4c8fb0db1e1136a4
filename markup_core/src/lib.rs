// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared plumbing for a WHATWG HTML5 parser: encoding resolution and the
//! decoded input stream (§4.1), the named character reference table
//! (§4.2), the name/attribute vocabulary (§3), and the abstract
//! [`TreeSink`](tree_sink::TreeSink) the tree constructor builds against
//! (§6).
//!
//! This crate mirrors `markup5ever`'s role relative to `html5ever` in the
//! teacher repository: it has no notion of tokens, insertion modes, or
//! parsing algorithms. Those live in `html_parser`, which depends on this
//! crate.

pub extern crate tendril;

pub mod buffer_queue;
pub mod encoding;
pub mod entities;
pub mod input_stream;
pub mod interface;
pub mod smallcharset;
pub mod tree_sink;

pub use interface::{ns, Attribute, ExpandedName, LocalName, Namespace, Prefix, QualName};
pub use smallcharset::SmallCharSet;
pub use tree_sink::{AppendNode, AppendText, ElementFlags, NextParserState, NodeOrText, QuirksMode, TreeSink};
