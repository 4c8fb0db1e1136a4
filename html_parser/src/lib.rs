// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A WHATWG-conformant HTML5 tokenizer and tree constructor.
//!
//! Mirrors the teacher's `html5ever` crate's role relative to
//! `markup5ever`: this crate has the tokenizer (§4.3), the tree
//! constructor (§5), the meta-charset pre-scan (§4.1), and the façade
//! (§7) that drives them; the name/attribute vocabulary and the abstract
//! [`TreeSink`](markup_core::TreeSink) they build against live in
//! [`markup_core`], which this crate re-exports for convenience.

pub mod driver;
pub mod meta_scan;
pub mod tokenizer;
pub mod tree_builder;

pub use driver::{parse, parse_fragment, ParseOpts, ParseOutput, ParserError};
pub use markup_core::{
    ns, tree_sink, AppendNode, AppendText, Attribute, ElementFlags, ExpandedName, LocalName,
    Namespace, NextParserState, NodeOrText, Prefix, QualName, QuirksMode, TreeSink,
};

/// Re-export of the tendril crate, so callers don't need a separate
/// `Cargo.toml` dependency to construct `StrTendril` input.
pub mod tendril {
    pub use markup_core::tendril::*;
}

/// Re-export of `encoding_rs`, for callers that want to name an
/// `&'static Encoding` in `EncodingOpts` without their own dependency.
pub use encoding_rs as encoding;
