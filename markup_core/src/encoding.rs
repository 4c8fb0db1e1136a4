// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Encoding resolution and the byte-to-Unicode [`Decoder`] (§4.1).
//!
//! Mirrors the teacher's `markup5ever::encoding` module (an `encoding_rs`
//! decoder plus a confidence flag), and adds the precedence chain and BOM
//! sniffing the bytes-input façade needs before it can even construct a
//! `Decoder`.

use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};
use tendril::{fmt::Bytes, Tendril};

use crate::buffer_queue::BufferQueue;

/// <https://html.spec.whatwg.org/#concept-encoding-confidence>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confidence {
    Tentative,
    Certain,
    Irrelevant,
}

/// The encoding-related options a caller may supply for byte input (§6).
/// Each is "certain" or "tentative" per the precedence table; the first
/// `Some` field below (in field order) wins over anything tentative that
/// comes after it.
#[derive(Clone, Copy, Default)]
pub struct EncodingOpts {
    pub override_encoding: Option<&'static Encoding>,
    pub transport_encoding: Option<&'static Encoding>,
    pub same_origin_parent_encoding: Option<&'static Encoding>,
    pub likely_encoding: Option<&'static Encoding>,
    pub default_encoding: Option<&'static Encoding>,
}

/// Sniff a BOM at the start of `bytes`. Returns the encoding it implies and
/// the number of bytes the BOM itself occupies.
pub fn sniff_bom(bytes: &[u8]) -> Option<(&'static Encoding, usize)> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some((UTF_8, 3))
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        Some((UTF_16LE, 2))
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        Some((UTF_16BE, 2))
    } else {
        None
    }
}

/// Resolve the tentative-or-certain starting encoding for a byte stream,
/// per §4.1's precedence list. `meta_prescan` is invoked with up to the
/// first 1024 bytes and should implement the miniature meta-charset
/// pre-scan (see `html_parser::meta_scan`); it is only consulted if no
/// higher-precedence source won.
pub fn resolve_initial_encoding(
    prefix: &[u8],
    opts: &EncodingOpts,
    meta_prescan: impl FnOnce(&[u8]) -> Option<&'static Encoding>,
) -> (&'static Encoding, Confidence, usize) {
    if let Some((enc, bom_len)) = sniff_bom(prefix) {
        return (enc, Confidence::Certain, bom_len);
    }
    if let Some(enc) = opts.override_encoding {
        return (enc, Confidence::Certain, 0);
    }
    if let Some(enc) = opts.transport_encoding {
        return (enc, Confidence::Certain, 0);
    }
    let scan_window = &prefix[..prefix.len().min(1024)];
    if let Some(enc) = meta_prescan(scan_window) {
        return (enc, Confidence::Tentative, 0);
    }
    if let Some(enc) = opts.same_origin_parent_encoding {
        if enc != UTF_16BE && enc != UTF_16LE {
            return (enc, Confidence::Tentative, 0);
        }
    }
    if let Some(enc) = opts.likely_encoding {
        return (enc, Confidence::Tentative, 0);
    }
    (
        opts.default_encoding.unwrap_or(WINDOWS_1252),
        Confidence::Tentative,
        0,
    )
}

pub struct Decoder {
    inner: encoding_rs::Decoder,
    confidence: Confidence,
}

impl Decoder {
    pub fn new(encoding: &'static Encoding, confidence: Confidence) -> Self {
        Self {
            inner: encoding.new_decoder(),
            confidence,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.inner.encoding()
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Returns `None` if the encoding should not be changed, `Some(encoding)`
    /// if the stream must restart decoding with `encoding` (a `Reparse`
    /// signal at the input-stream level). Implements
    /// <https://html.spec.whatwg.org/#changing-the-encoding-while-parsing>.
    pub fn change_the_encoding_to(
        &mut self,
        mut new_encoding: &'static Encoding,
    ) -> Option<&'static Encoding> {
        let current_encoding = self.inner.encoding();

        if current_encoding == UTF_16BE || current_encoding == UTF_16LE {
            self.confidence = Confidence::Certain;
            return None;
        }

        if new_encoding == UTF_16BE || new_encoding == UTF_16LE {
            new_encoding = UTF_8;
        }

        if new_encoding == X_USER_DEFINED {
            new_encoding = WINDOWS_1252;
        }

        if current_encoding == new_encoding {
            self.confidence = Confidence::Certain;
            return None;
        }

        Some(new_encoding)
    }

    /// Decode `chunk`, appending the result to `output`. `last` indicates
    /// this is the final chunk of the byte stream (end of file).
    pub fn decode(&mut self, chunk: &[u8], last: bool, output: &mut BufferQueue) {
        let mut remaining = chunk;
        loop {
            let mut out: Tendril<Bytes> = Tendril::new();
            let max_len = self
                .inner
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(8192)
                .min(1 << 20);

            // SAFETY: `decode_to_utf8_without_replacement` only ever writes
            // into the prefix it reports back in `bytes_written`; we only
            // read that prefix below.
            unsafe {
                out.push_uninitialized(max_len as u32);
            }

            let (result, bytes_read, bytes_written) =
                self.inner
                    .decode_to_utf8_without_replacement(remaining, &mut out, last);

            if bytes_written > 0 {
                let bytes_chunk = out.subtendril(0, bytes_written as u32);
                // SAFETY: the decoder guarantees this prefix is valid UTF-8.
                let utf8_chunk = unsafe { bytes_chunk.reinterpret_without_validating() };
                output.push_back(utf8_chunk);
            }

            if matches!(result, DecoderResult::Malformed(_, _)) {
                output.push_back("\u{FFFD}".into());
            }

            remaining = &remaining[bytes_read..];
            if remaining.is_empty() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_wins_over_everything() {
        let bytes = [0xEFu8, 0xBB, 0xBF, b'<', b'p', b'>'];
        let opts = EncodingOpts {
            default_encoding: Some(WINDOWS_1252),
            ..Default::default()
        };
        let (enc, conf, bom_len) = resolve_initial_encoding(&bytes, &opts, |_| None);
        assert_eq!(enc, UTF_8);
        assert_eq!(conf, Confidence::Certain);
        assert_eq!(bom_len, 3);
    }

    #[test]
    fn meta_prescan_is_tentative_and_skips_default() {
        let bytes = b"<meta charset=utf-8>";
        let opts = EncodingOpts {
            default_encoding: Some(WINDOWS_1252),
            ..Default::default()
        };
        let (enc, conf, _) = resolve_initial_encoding(bytes, &opts, |_| Some(UTF_8));
        assert_eq!(enc, UTF_8);
        assert_eq!(conf, Confidence::Tentative);
    }

    #[test]
    fn falls_back_to_default_encoding() {
        let opts = EncodingOpts::default();
        let (enc, conf, _) = resolve_initial_encoding(b"abc", &opts, |_| None);
        assert_eq!(enc, WINDOWS_1252);
        assert_eq!(conf, Confidence::Tentative);
    }
}
