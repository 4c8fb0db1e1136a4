// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The name/attribute vocabulary shared between the tokenizer and the tree
//! constructor: [`QualName`], [`Attribute`], and the small set of namespace
//! constants a conforming HTML parser needs (html, mathml, svg, xlink, xml,
//! xmlns).
//!
//! Real `html5ever` builds a closed, `build.rs`-generated atom table (via
//! `string_cache_codegen`) so that `local_name!("div")` is a compile-time
//! constant. The core doesn't need the full element/attribute vocabulary of
//! a browser engine, so we use `string_cache`'s ordinary runtime-interned
//! `DefaultAtom` instead — same crate, same O(1) comparisons once
//! interned, no build-time codegen step.

use std::fmt;

use string_cache::DefaultAtom;
use tendril::StrTendril;

pub type LocalName = DefaultAtom;
pub type Namespace = DefaultAtom;
pub type Prefix = DefaultAtom;

/// Namespace URIs a conforming HTML parser needs to compare against.
pub mod ns {
    use super::Namespace;

    pub fn html() -> Namespace {
        Namespace::from("http://www.w3.org/1999/xhtml")
    }
    pub fn mathml() -> Namespace {
        Namespace::from("http://www.w3.org/1998/Math/MathML")
    }
    pub fn svg() -> Namespace {
        Namespace::from("http://www.w3.org/2000/svg")
    }
    pub fn xlink() -> Namespace {
        Namespace::from("http://www.w3.org/1999/xlink")
    }
    pub fn xml() -> Namespace {
        Namespace::from("http://www.w3.org/XML/1998/namespace")
    }
    pub fn xmlns() -> Namespace {
        Namespace::from("http://www.w3.org/2000/xmlns/")
    }
    pub fn empty() -> Namespace {
        Namespace::from("")
    }
}

/// <https://www.w3.org/TR/REC-xml-names/#dt-expname> — a borrowed
/// namespace/local-name pair, cheap to construct for scope-set membership
/// tests.
#[derive(Copy, Clone, Eq, Hash)]
pub struct ExpandedName<'a> {
    pub ns: &'a Namespace,
    pub local: &'a LocalName,
}

impl<'a, 'b> PartialEq<ExpandedName<'a>> for ExpandedName<'b> {
    fn eq(&self, other: &ExpandedName<'a>) -> bool {
        self.ns == other.ns && self.local == other.local
    }
}

impl<'a> fmt::Debug for ExpandedName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.ns, self.local)
        }
    }
}

/// Fully qualified name: a namespace, a local name, and the source prefix
/// (if any) the token spelled it with.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct QualName {
    pub prefix: Option<Prefix>,
    pub ns: Namespace,
    pub local: LocalName,
}

impl QualName {
    #[inline]
    pub fn new(prefix: Option<Prefix>, ns: Namespace, local: LocalName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// Construct a name in the HTML namespace with no prefix — the common
    /// case for every tag the tokenizer produces.
    pub fn html(local: LocalName) -> QualName {
        QualName::new(None, ns::html(), local)
    }

    #[inline]
    pub fn expanded(&self) -> ExpandedName<'_> {
        ExpandedName {
            ns: &self.ns,
            local: &self.local,
        }
    }
}

/// A tag attribute.
///
/// The namespace on the attribute name is almost always the empty
/// namespace; the tree builder adjusts certain attribute names (and their
/// namespaces) when adjusting foreign content (MathML, SVG).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    pub name: QualName,
    pub value: StrTendril,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_constants_are_distinct() {
        assert_ne!(ns::html(), ns::svg());
        assert_ne!(ns::svg(), ns::mathml());
        assert_eq!(ns::html(), Namespace::from("http://www.w3.org/1999/xhtml"));
    }

    #[test]
    fn expanded_name_compares_ns_and_local() {
        let a = QualName::html(LocalName::from("div"));
        let b = QualName::html(LocalName::from("div"));
        let c = QualName::html(LocalName::from("span"));
        assert_eq!(a.expanded(), b.expanded());
        assert_ne!(a.expanded(), c.expanded());
    }
}
