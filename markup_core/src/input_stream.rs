// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The input stream (§4.1): byte/text ingestion, CR/LF and surrogate
//! normalization across chunk boundaries, (line, col) tracking, and the
//! `unget`/`consume_until` primitives the tokenizer is built on.

use std::cell::Cell;

use encoding_rs::Encoding;
use tendril::StrTendril;

use crate::buffer_queue::BufferQueue;
use crate::encoding::{Confidence, Decoder};
use crate::smallcharset::{FromSet, NotFromSet, SmallCharSet};

/// A `(line, col)` position, 1-indexed, as required by §3's `ParseError`
/// token and §6's parse-error records.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Position {
    pub line: u64,
    pub col: u64,
}

/// Noncharacter and surrogate code points the spec requires an
/// `invalid-codepoint` parse error for, without dropping the character
/// (§4.1).
pub fn is_invalid_codepoint(c: char) -> bool {
    let n = c as u32;
    matches!(n, 0xFDD0..=0xFDEF)
        || (n & 0xFFFE) == 0xFFFE // each plane's last two code points
        || matches!(n, 0x0001..=0x0008 | 0x000E..=0x001F | 0x007F..=0x009F)
}

/// Signal raised when a late `<meta charset>` contradicts a tentative
/// encoding. The façade catches this, rewinds the byte source, and
/// restarts the pipeline with `encoding` at `Confidence::Certain` — it is
/// never observed outside the façade (§7).
pub struct Reparse {
    pub encoding: &'static Encoding,
}

/// The decoded character stream a [`Tokenizer`](../html_parser/tokenizer)
/// pulls from.
pub struct InputStream {
    buffer: BufferQueue,
    decoder: Decoder,
    pending_lf_skip: bool,
    line: Cell<u64>,
    col: Cell<u64>,
    /// Position tracker for text as it's normalized into the buffer, run
    /// ahead of `line`/`col` (which track what the tokenizer has actually
    /// consumed) since a whole chunk can be decoded before any of it is
    /// pulled out. This is what `push_normalized`'s `invalid-codepoint`
    /// errors are stamped with.
    decode_line: Cell<u64>,
    decode_col: Cell<u64>,
    pub errors: Vec<(&'static str, Position)>,
}

impl InputStream {
    pub fn new(encoding: &'static Encoding, confidence: Confidence) -> Self {
        InputStream {
            buffer: BufferQueue::new(),
            decoder: Decoder::new(encoding, confidence),
            pending_lf_skip: false,
            line: Cell::new(1),
            col: Cell::new(1),
            decode_line: Cell::new(1),
            decode_col: Cell::new(1),
            errors: Vec::new(),
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    pub fn confidence(&self) -> Confidence {
        self.decoder.confidence()
    }

    /// Feed already-decoded text directly, bypassing the byte decoder
    /// (§6: "already-decoded text buffer or text stream").
    pub fn append_text(&mut self, text: StrTendril) {
        self.push_normalized(&text);
    }

    /// Feed raw bytes through the current decoder.
    pub fn append_bytes(&mut self, bytes: &[u8], last: bool) {
        let mut decoded = BufferQueue::new();
        self.decoder.decode(bytes, last, &mut decoded);
        while let Some(chunk) = decoded.pop_front() {
            self.push_normalized(&chunk);
        }
    }

    /// Attempt to switch to `encoding`. Returns `Some(Reparse)` if the
    /// caller must rewind and restart; otherwise the encoding was either
    /// already certain or matched, and normal parsing continues.
    pub fn maybe_switch_encoding(&mut self, encoding: &'static Encoding) -> Option<Reparse> {
        if self.decoder.confidence() != Confidence::Tentative {
            return None;
        }
        self.decoder
            .change_the_encoding_to(encoding)
            .map(|encoding| Reparse { encoding })
    }

    fn push_normalized(&mut self, raw: &str) {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        if self.pending_lf_skip {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            self.pending_lf_skip = false;
        }

        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    out.push('\n');
                    self.advance_decode_position('\n');
                    match chars.peek() {
                        Some('\n') => {
                            chars.next();
                        },
                        None => self.pending_lf_skip = true,
                        _ => {},
                    }
                },
                c => {
                    if is_invalid_codepoint(c) {
                        let pos = Position {
                            line: self.decode_line.get(),
                            col: self.decode_col.get(),
                        };
                        self.errors.push(("invalid-codepoint", pos));
                    }
                    out.push(c);
                    self.advance_decode_position(c);
                },
            }
        }

        if !out.is_empty() {
            self.buffer.push_back(out.into());
        }
    }

    /// Consume one code point and advance the position tracker, or `None`
    /// at end of stream.
    pub fn consume(&mut self) -> Option<char> {
        let c = self.buffer.next();
        if let Some(c) = c {
            self.advance_position(c);
        }
        c
    }

    /// Look at, without consuming, the next code point.
    pub fn peek(&self) -> Option<char> {
        self.buffer.peek()
    }

    /// Push a single code point back onto the front of the stream. At most
    /// one character may be buffered this way at a time.
    pub fn unget(&mut self, c: char) {
        self.retreat_position(c);
        self.buffer.push_front(StrTendril::from_char(c));
    }

    /// Push a whole run of just-consumed text back onto the front of the
    /// stream, for a lookahead match (e.g. `match_keyword_ci`) that failed
    /// partway through.
    pub fn unconsume(&mut self, s: &str) {
        for c in s.chars().rev() {
            self.retreat_position(c);
        }
        if !s.is_empty() {
            self.buffer.push_front(StrTendril::from_slice(s));
        }
    }

    /// Consume the maximal run of characters that are (or, if `negate`,
    /// are not) in `set`, crossing chunk boundaries transparently.
    pub fn chars_until(&mut self, set: SmallCharSet, negate: bool) -> Option<StrTendril> {
        loop {
            match self.buffer.pop_except_from(set) {
                None => return None,
                Some(NotFromSet(text)) => {
                    if negate {
                        for c in text.chars() {
                            self.advance_position(c);
                        }
                        return Some(text);
                    } else {
                        // `text` contains no characters from `set`; since
                        // we want characters *in* the set, push it back
                        // and report nothing consumed this round.
                        self.buffer.push_front(text);
                        return Some(StrTendril::new());
                    }
                },
                Some(FromSet(c)) => {
                    if negate {
                        self.buffer.push_front(StrTendril::from_char(c));
                        return Some(StrTendril::new());
                    } else {
                        self.advance_position(c);
                        let mut s = StrTendril::from_char(c);
                        while let Some(FromSet(c2)) = self.buffer.pop_except_from(set) {
                            self.advance_position(c2);
                            s.push_char(c2);
                        }
                        return Some(s);
                    }
                },
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line.get(),
            col: self.col.get(),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_lf_skip = false;
        self.line.set(1);
        self.col.set(1);
    }

    fn advance_position(&self, c: char) {
        if c == '\n' {
            self.line.set(self.line.get() + 1);
            self.col.set(1);
        } else {
            self.col.set(self.col.get() + 1);
        }
    }

    fn advance_decode_position(&self, c: char) {
        if c == '\n' {
            self.decode_line.set(self.decode_line.get() + 1);
            self.decode_col.set(1);
        } else {
            self.decode_col.set(self.decode_col.get() + 1);
        }
    }

    fn retreat_position(&self, c: char) {
        if c == '\n' {
            self.line.set(self.line.get().saturating_sub(1).max(1));
        } else {
            self.col.set(self.col.get().saturating_sub(1).max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn crlf_and_bare_cr_become_lf() {
        let mut is = InputStream::new(UTF_8, Confidence::Certain);
        is.append_text("a\r\nb\rc".into());
        let mut out = String::new();
        while let Some(c) = is.consume() {
            out.push(c);
        }
        assert_eq!(out, "a\nb\nc");
    }

    #[test]
    fn cr_split_across_chunks_still_collapses() {
        let mut is = InputStream::new(UTF_8, Confidence::Certain);
        is.append_text("a\r".into());
        is.append_text("\nb".into());
        let mut out = String::new();
        while let Some(c) = is.consume() {
            out.push(c);
        }
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn unget_restores_one_char() {
        let mut is = InputStream::new(UTF_8, Confidence::Certain);
        is.append_text("ab".into());
        assert_eq!(is.consume(), Some('a'));
        is.unget('a');
        assert_eq!(is.consume(), Some('a'));
        assert_eq!(is.consume(), Some('b'));
        assert_eq!(is.consume(), None);
    }

    #[test]
    fn position_tracks_lines_and_columns() {
        let mut is = InputStream::new(UTF_8, Confidence::Certain);
        is.append_text("ab\ncd".into());
        assert_eq!(is.position(), Position { line: 1, col: 1 });
        is.consume();
        is.consume();
        assert_eq!(is.position(), Position { line: 1, col: 3 });
        is.consume(); // the newline
        assert_eq!(is.position(), Position { line: 2, col: 1 });
    }

    #[test]
    fn invalid_codepoint_error_records_its_own_position() {
        let mut is = InputStream::new(UTF_8, Confidence::Certain);
        is.append_text("a\nb\u{FDD0}c".into());
        assert_eq!(is.errors, vec![("invalid-codepoint", Position { line: 2, col: 2 })]);
    }
}
