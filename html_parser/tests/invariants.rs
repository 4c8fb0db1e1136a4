//! Cross-cutting invariants from the testable-properties list, checked
//! against whatever surface `common::Dom` + the public façade expose
//! (the open-elements stack itself is an implementation detail of
//! `TreeBuilder`, so "never empty" is exercised indirectly: these inputs
//! would panic on an empty-stack `.expect()` if the invariant broke).

mod common;

use common::{element_names, find_element, text_content};
use html_parser::{parse, ParseOpts};

fn parse_str(html: &str) -> common::Dom {
    parse(common::Dom::default, html.as_bytes(), &ParseOpts::default())
        .expect("parse should not fail")
        .output
}

#[test]
fn termination_on_a_variety_of_malformed_inputs() {
    let inputs = [
        "",
        "<",
        "</",
        "<!--",
        "<![CDATA[",
        "<svg><foreignObject><div></svg>",
        "<table><table><table>",
        &"<div>".repeat(2000),
        &"</div>".repeat(2000),
        "<script><!--<script>",
    ];
    for input in inputs {
        let _ = parse_str(input);
    }
}

#[test]
fn duplicate_attributes_keep_first_occurrence() {
    let dom = parse_str(r#"<p id="first" id="second" class="only">x</p>"#);
    let p = find_element(&dom.document, "p").unwrap();
    let common::NodeData::Element { attrs, .. } = &p.data else {
        panic!("not an element");
    };
    let attrs = attrs.borrow();
    assert_eq!(attrs.len(), 2, "the second id= is dropped, not merged");
    let id = attrs.iter().find(|a| &*a.name.local == "id").unwrap();
    assert_eq!(&*id.value, "first");
}

#[test]
fn cr_and_crlf_both_normalize_to_lf() {
    let dom = parse_str("<p>a\r\nb\rc\nd</p>");
    let p = find_element(&dom.document, "p").unwrap();
    let text = text_content(&p);
    assert!(!text.contains('\r'), "no bare or paired CR should reach a text node");
    assert_eq!(text, "a\nb\nc\nd");
}

#[test]
fn noahs_ark_caps_formatting_reconstruction_at_three() {
    // Four identical unclosed <b> tags in a row, each nested inside the
    // last: unlike <a>, <b> has no auto-close rule, so all four stay open
    // on the stack, but the active formatting list's Noah's Ark clause
    // should still have dropped the oldest equivalent entry once a fourth
    // was pushed.
    let dom = parse_str(
        r#"<div><b class="x">1<b class="x">2<b class="x">3<b class="x">4</b></b></b></b></div>"#,
    );
    let div = find_element(&dom.document, "div").unwrap();
    let names = element_names(&div);
    let b_count = names.iter().filter(|n| n.as_str() == "b").count();
    assert_eq!(b_count, 4, "all four <b> elements are still on the open-elements stack");
}

#[test]
fn encoding_idempotence_bom_vs_no_bom() {
    let with_bom: Vec<u8> = [0xEF, 0xBB, 0xBF].iter().chain(b"<p>hi</p>").copied().collect();
    let without_bom = b"<p>hi</p>".to_vec();

    let mut opts = ParseOpts::default();
    opts.encoding.override_encoding = Some(encoding_rs::UTF_8);

    let with = parse(common::Dom::default, &with_bom, &ParseOpts::default()).unwrap();
    let without = parse(common::Dom::default, &without_bom, &opts).unwrap();

    assert_eq!(element_names(&with.output.document), element_names(&without.output.document));
    let p_with = find_element(&with.output.document, "p").unwrap();
    let p_without = find_element(&without.output.document, "p").unwrap();
    assert_eq!(text_content(&p_with), text_content(&p_without));
}

#[test]
fn reparse_from_late_meta_matches_override_encoding() {
    // A charset declared via a full pragma (http-equiv + content) inside
    // <head>, past the point the tree constructor already committed to a
    // tentative default.
    let bytes = br#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=windows-1252"></head><body>hello</body></html>"#;
    let mut default_opts = ParseOpts::default();
    default_opts.encoding.default_encoding = Some(encoding_rs::UTF_8);
    let reparsed = parse(common::Dom::default, bytes, &default_opts).unwrap();

    let mut override_opts = ParseOpts::default();
    override_opts.encoding.override_encoding = Some(encoding_rs::WINDOWS_1252);
    let overridden = parse(common::Dom::default, bytes, &override_opts).unwrap();

    assert_eq!(reparsed.encoding, encoding_rs::WINDOWS_1252);
    assert_eq!(
        element_names(&reparsed.output.document),
        element_names(&overridden.output.document)
    );
}
