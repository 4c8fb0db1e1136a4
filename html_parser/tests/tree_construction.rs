//! End-to-end tree-construction scenarios (S1-S6), checked against the
//! minimal `common::Dom` rather than a literal serialized dump — these
//! assert the same shape the scenarios describe, just via structural
//! queries instead of string comparison.

mod common;

use common::{element_names, find_element, text_content, NodeData};
use html_parser::{parse, ParseOpts};

fn parse_str(html: &str) -> common::Dom {
    parse(common::Dom::default, html.as_bytes(), &ParseOpts::default())
        .expect("parse should not fail on malformed-but-recoverable HTML")
        .output
}

fn parse_bytes_with(bytes: &[u8], opts: &ParseOpts) -> html_parser::ParseOutput<common::Dom> {
    parse(common::Dom::default, bytes, opts).expect("parse should not fail")
}

#[test]
fn s1_unclosed_p_gets_html_head_body() {
    let dom = parse_str("<p>Hello");
    assert_eq!(
        element_names(&dom.document),
        vec!["html", "head", "body", "p"],
        "html5 error recovery always synthesizes head and body"
    );
    let p = find_element(&dom.document, "p").unwrap();
    assert_eq!(text_content(&p), "Hello");
}

#[test]
fn s2_adoption_agency_reparents_formatting_element() {
    let dom = parse_str("<b>1<p>2</b>3");
    // The adoption agency clones `b` so "2" is wrapped by a cloned `<b>`
    // inside `<p>`, and "3" continues after `</b>` closes that clone.
    let body = find_element(&dom.document, "body").unwrap();
    let names = element_names(&body);
    assert_eq!(names, vec!["body", "b", "p", "b"]);
    let p = find_element(&dom.document, "p").unwrap();
    assert_eq!(text_content(&p), "2");
    assert_eq!(text_content(&body), "123");
}

#[test]
fn s3_foster_parents_text_before_table() {
    let dom = parse_str("<table>a<tr>");
    let body = find_element(&dom.document, "body").unwrap();
    // "a" is foster-parented to just before the table, not inside it.
    let first_child_is_text = matches!(body.children.borrow()[0].data, NodeData::Text { .. });
    assert!(first_child_is_text, "text before the first structural tag is foster-parented out of the table");
    assert_eq!(text_content(&body), "a");
    assert_eq!(element_names(&body), vec!["body", "table", "tbody", "tr"]);
}

#[test]
fn s4_doctype_and_comment_survive() {
    let dom = parse_str("<!DOCTYPE html><html><body><!--c--></body>");
    let has_doctype = dom
        .document
        .children
        .borrow()
        .iter()
        .any(|c| matches!(&c.data, NodeData::Doctype { name, .. } if &**name == "html"));
    assert!(has_doctype);
    let body = find_element(&dom.document, "body").unwrap();
    let has_comment = body
        .children
        .borrow()
        .iter()
        .any(|c| matches!(&c.data, NodeData::Comment { contents } if &**contents == "c"));
    assert!(has_comment);
}

#[test]
fn s5_bom_resolves_to_certain_utf8() {
    let bytes = [0xEFu8, 0xBB, 0xBF, b'<', b'p', b'>', b'x'];
    let result = parse_bytes_with(&bytes, &ParseOpts::default());
    assert_eq!(result.encoding, encoding_rs::UTF_8);
    let p = find_element(&result.output.document, "p").unwrap();
    assert_eq!(text_content(&p), "x");
}

#[test]
fn s6_meta_prescan_avoids_reparse() {
    let bytes = b"<meta charset=utf-8>";
    let mut opts = ParseOpts::default();
    opts.encoding.default_encoding = Some(encoding_rs::WINDOWS_1252);
    let result = parse_bytes_with(bytes, &opts);
    assert_eq!(result.encoding, encoding_rs::UTF_8);
}
