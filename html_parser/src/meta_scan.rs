// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The miniature meta-charset pre-scan (§4.1 "prescan a byte stream to
//! determine its encoding"), consulted by
//! [`markup_core::encoding::resolve_initial_encoding`] when nothing of
//! higher precedence (BOM, transport layer, caller override) has already
//! settled the question.
//!
//! This is a deliberately narrow byte-level scanner, not a tokenizer: it
//! walks raw bytes looking for `<meta`, skips comments and other tags, and
//! extracts a `charset` attribute or a `content="...charset=..."` pragma.
//! Mirrors html5lib's `EncodingParser`/`EncodingBytes`/
//! `ContentAttributeParser` (`inputstream.py`), adapted to a cursor over a
//! borrowed `&[u8]` instead of a stateful iterator class.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

fn is_space(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn current(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.current();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    /// Skip a run of bytes matching `pred`; returns the first non-matching
    /// byte (or `None` at end of input), leaving the cursor there.
    fn skip(&mut self, pred: impl Fn(u8) -> bool) -> Option<u8> {
        loop {
            match self.current() {
                Some(b) if pred(b) => self.pos += 1,
                other => return other,
            }
        }
    }

    fn skip_until(&mut self, pred: impl Fn(u8) -> bool) -> Option<u8> {
        self.skip(|b| !pred(b))
    }

    /// If `needle` (already lowercase) matches case-insensitively at the
    /// current position, advance past it and return `true`.
    fn match_bytes_ci(&mut self, needle: &[u8]) -> bool {
        let end = self.pos + needle.len();
        if end > self.data.len() {
            return false;
        }
        let candidate = &self.data[self.pos..end];
        if candidate.iter().zip(needle).all(|(&a, &b)| a.to_ascii_lowercase() == b) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    /// Advance to the last byte of the next occurrence of `needle`. Returns
    /// `false` if it never occurs.
    fn jump_to(&mut self, needle: &[u8]) -> bool {
        let haystack = &self.data[self.pos.min(self.data.len())..];
        match find_subslice(haystack, needle) {
            Some(offset) => {
                self.pos += offset + needle.len() - 1;
                true
            },
            None => {
                self.pos = self.data.len();
                false
            },
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w.eq_ignore_ascii_case(needle))
}

fn is_ascii_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

/// Scan `data` (the first chunk of a byte stream, conventionally up to
/// 1024 bytes) for a `<meta charset>` or `<meta http-equiv=content-type
/// content=...charset=...>` declaration. Returns the encoding it implies,
/// with UTF-16 declarations mapped to UTF-8 per the spec's note that a
/// meta-declared UTF-16 is almost always a mistake.
pub fn prescan_meta_charset(data: &[u8]) -> Option<&'static Encoding> {
    if find_subslice(data, b"<meta").is_none() {
        return None;
    }
    let mut cursor = Cursor::new(data);
    loop {
        if !cursor.jump_to(b"<") {
            return None;
        }
        if cursor.match_bytes_ci(b"<!--") {
            if !cursor.jump_to(b"-->") {
                return None;
            }
        } else if cursor.match_bytes_ci(b"<meta") {
            match handle_meta(&mut cursor) {
                Some(enc) => return Some(normalize_meta_encoding(enc)),
                None => continue,
            }
        } else if cursor.match_bytes_ci(b"</") {
            cursor.advance();
            if !handle_possible_tag(&mut cursor, true) {
                return None;
            }
        } else if cursor.match_bytes_ci(b"<!") || cursor.match_bytes_ci(b"<?") {
            if !cursor.jump_to(b">") {
                return None;
            }
        } else if cursor.match_bytes_ci(b"<") {
            if !handle_possible_tag(&mut cursor, false) {
                return None;
            }
        } else {
            cursor.advance();
        }
    }
}

fn normalize_meta_encoding(enc: &'static Encoding) -> &'static Encoding {
    if enc == UTF_16BE || enc == UTF_16LE {
        UTF_8
    } else {
        enc
    }
}

/// Re-derives a meta-declared charset from an already-parsed `<meta>`
/// tag's attributes, independent of the raw-byte pre-scan above. The tree
/// constructor calls this once it has built the attribute list for a
/// `<meta>` start tag in `in head`, so a declaration the pre-scan missed
/// (because it appeared after the first 1024 bytes, or because the
/// pre-scan conservatively gave up) still has a chance to trigger
/// "changing the encoding while parsing" (§4.1 note after the algorithm).
pub fn charset_from_attrs(attrs: &[markup_core::Attribute]) -> Option<&'static Encoding> {
    let mut has_pragma = false;
    let mut pending = None;
    for attr in attrs {
        let name: &str = &attr.name.local;
        if name.eq_ignore_ascii_case("charset") {
            if let Some(enc) = Encoding::for_label(attr.value.as_bytes()) {
                return Some(normalize_meta_encoding(enc));
            }
        } else if name.eq_ignore_ascii_case("http-equiv") {
            has_pragma = attr.value.eq_ignore_ascii_case("content-type");
        } else if name.eq_ignore_ascii_case("content") {
            if let Some(charset_bytes) = parse_content_attribute(attr.value.as_bytes()) {
                if let Some(enc) = Encoding::for_label(&charset_bytes) {
                    pending = Some(enc);
                }
            }
        }
    }
    if has_pragma {
        pending.map(normalize_meta_encoding)
    } else {
        None
    }
}

/// Returns `Some(encoding)` once a pragma-confirmed charset is found;
/// `None` means "keep scanning for more `<meta>` tags" (the caller's loop
/// continues rather than stopping).
fn handle_meta(cursor: &mut Cursor<'_>) -> Option<&'static Encoding> {
    match cursor.current() {
        Some(b) if is_space(b) => {},
        _ => return None,
    }
    let mut has_pragma = false;
    let mut pending: Option<&'static Encoding> = None;
    loop {
        let (name, value) = match get_attribute(cursor) {
            Some(pair) => pair,
            None => return None,
        };
        if name == b"http-equiv" {
            has_pragma = value == b"content-type";
            if has_pragma {
                if let Some(enc) = pending {
                    return Some(enc);
                }
            }
        } else if name == b"charset" {
            if let Some(enc) = Encoding::for_label(&value) {
                return Some(enc);
            }
        } else if name == b"content" {
            if let Some(charset_bytes) = parse_content_attribute(&value) {
                if let Some(enc) = Encoding::for_label(&charset_bytes) {
                    if has_pragma {
                        return Some(enc);
                    }
                    pending = Some(enc);
                }
            }
        }
    }
}

fn handle_possible_tag(cursor: &mut Cursor<'_>, end_tag: bool) -> bool {
    match cursor.current() {
        Some(b) if is_ascii_alpha(b) => {},
        _ => {
            if end_tag {
                cursor.pos = cursor.pos.saturating_sub(1);
                return cursor.jump_to(b">");
            }
            return true;
        },
    }
    match cursor.skip_until(|b| is_space(b) || b == b'<' || b == b'>') {
        Some(b'<') => {
            cursor.pos = cursor.pos.saturating_sub(1);
        },
        _ => {
            while get_attribute(cursor).is_some() {}
        },
    }
    true
}

/// Reads one attribute name/value pair starting at the cursor, leaving it
/// positioned just past the attribute. Returns `None` at `>` or end of
/// input. Both name and value are folded to ASCII-lowercase, per the
/// attribute syntax this pre-scan cares about (charset labels are
/// case-insensitive anyway).
fn get_attribute(cursor: &mut Cursor<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut c = cursor.skip(|b| is_space(b) || b == b'/');
    if matches!(c, Some(b'>') | None) {
        return None;
    }
    let mut name = Vec::new();
    loop {
        match c {
            Some(b'=') if !name.is_empty() => {
                c = cursor.advance();
                break;
            },
            Some(b) if is_space(b) => {
                c = cursor.skip(is_space);
                break;
            },
            Some(b'/') | Some(b'>') => return Some((name, Vec::new())),
            Some(b) => {
                name.push(b.to_ascii_lowercase());
                c = cursor.advance();
            },
            None => return None,
        }
    }
    if c != Some(b'=') {
        return Some((name, Vec::new()));
    }
    c = cursor.advance();
    c = cursor.skip(is_space);
    let mut value = Vec::new();
    match c {
        Some(q @ b'"') | Some(q @ b'\'') => {
            cursor.advance();
            loop {
                match cursor.advance() {
                    Some(b) if b == q => return Some((name, value)),
                    Some(b) => value.push(b.to_ascii_lowercase()),
                    None => return None,
                }
            }
        },
        Some(b'>') => return Some((name, Vec::new())),
        Some(b) => {
            value.push(b.to_ascii_lowercase());
            cursor.advance();
        },
        None => return None,
    }
    loop {
        match cursor.current() {
            Some(b) if is_space(b) || b == b'<' || b == b'>' => return Some((name, value)),
            Some(b) => {
                value.push(b.to_ascii_lowercase());
                cursor.advance();
            },
            None => return Some((name, value)),
        }
    }
}

/// Extracts the `charset=` value out of a `content` attribute's value,
/// per the "algorithm for extracting a character encoding from a
/// `meta` element" (§4.1).
fn parse_content_attribute(data: &[u8]) -> Option<Vec<u8>> {
    let mut cursor = Cursor::new(data);
    if !cursor.jump_to(b"charset") {
        return None;
    }
    cursor.pos += 1;
    cursor.skip(is_space);
    if cursor.current() != Some(b'=') {
        return None;
    }
    cursor.pos += 1;
    cursor.skip(is_space);
    match cursor.current() {
        Some(q @ b'"') | Some(q @ b'\'') => {
            cursor.pos += 1;
            let start = cursor.pos;
            if cursor.jump_to(&[q]) {
                Some(cursor.data[start..cursor.pos - 1].to_vec())
            } else {
                None
            }
        },
        Some(_) => {
            let start = cursor.pos;
            cursor.skip_until(is_space);
            Some(cursor.data[start..cursor.pos].to_vec())
        },
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_charset_attribute() {
        let html = br#"<html><head><meta charset="utf-16"></head></html>"#;
        let enc = prescan_meta_charset(html).unwrap();
        assert_eq!(enc, UTF_8, "meta-declared utf-16 is mapped to utf-8");
    }

    #[test]
    fn finds_pragma_content_type_charset() {
        let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-1">"#;
        let enc = prescan_meta_charset(html).unwrap();
        assert_eq!(enc.name(), "windows-1252");
    }

    #[test]
    fn content_before_http_equiv_is_still_found() {
        let html = br#"<meta content="text/html; charset=shift_jis" http-equiv="Content-Type">"#;
        let enc = prescan_meta_charset(html).unwrap();
        assert_eq!(enc.name(), "Shift_JIS");
    }

    #[test]
    fn ignores_comments_and_unrelated_tags() {
        let html = br#"<!-- <meta charset="utf-16"> --><title>x</title><meta charset="utf-8">"#;
        let enc = prescan_meta_charset(html).unwrap();
        assert_eq!(enc, UTF_8);
    }

    #[test]
    fn returns_none_without_a_meta_tag() {
        assert!(prescan_meta_charset(b"<html><body>hi</body></html>").is_none());
    }
}
