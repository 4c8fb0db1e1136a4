// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character reference resolution (§4.3): named references via longest-
//! prefix match against the entity table, numeric references with the
//! Windows-1252 legacy remap and noncharacter/surrogate substitution.

use log::debug;
use markup_core::entities;
use markup_core::input_stream::InputStream;
use markup_core::tendril::StrTendril;

pub struct CharRef {
    pub chars: [char; 2],
    pub num_chars: u8,
}

impl CharRef {
    fn one(c: char) -> CharRef {
        CharRef {
            chars: [c, '\0'],
            num_chars: 1,
        }
    }
}

pub enum Status {
    Stuck,
    Progress,
    Done(CharRef),
}

#[derive(Debug)]
enum State {
    Begin,
    Octothorpe,
    Numeric(u32),
    NumericSemicolon,
    Named,
}

pub struct CharRefTokenizer {
    state: State,
    is_consumed_in_attribute: bool,
    num: u32,
    num_too_big: bool,
    seen_digit: bool,
    name_buf: StrTendril,
    pub errors: Vec<&'static str>,
}

impl CharRefTokenizer {
    pub fn new(is_consumed_in_attribute: bool) -> CharRefTokenizer {
        CharRefTokenizer {
            state: State::Begin,
            is_consumed_in_attribute,
            num: 0,
            num_too_big: false,
            seen_digit: false,
            name_buf: StrTendril::new(),
            errors: Vec::new(),
        }
    }

    pub fn step(&mut self, input: &mut InputStream) -> Status {
        debug!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            State::Begin => self.do_begin(input),
            State::Octothorpe => self.do_octothorpe(input),
            State::Numeric(base) => self.do_numeric(input, base),
            State::NumericSemicolon => self.do_numeric_semicolon(input),
            State::Named => self.do_named(input),
        }
    }

    fn do_begin(&mut self, input: &mut InputStream) -> Status {
        match input.peek() {
            None => Status::Stuck,
            Some('#') => {
                input.consume();
                self.state = State::Octothorpe;
                Status::Progress
            },
            Some(c) if c.is_ascii_alphanumeric() => {
                self.state = State::Named;
                Status::Progress
            },
            Some(_) => Status::Done(CharRef {
                chars: ['\0', '\0'],
                num_chars: 0,
            }),
        }
    }

    fn do_octothorpe(&mut self, input: &mut InputStream) -> Status {
        match input.peek() {
            Some('x') | Some('X') => {
                input.consume();
                self.state = State::Numeric(16);
                Status::Progress
            },
            _ => {
                self.state = State::Numeric(10);
                Status::Progress
            },
        }
    }

    fn do_numeric(&mut self, input: &mut InputStream, base: u32) -> Status {
        match input.peek() {
            Some(c) if c.is_digit(base) => {
                input.consume();
                self.seen_digit = true;
                if !self.num_too_big {
                    self.num = self.num.wrapping_mul(base).wrapping_add(c.to_digit(base).unwrap());
                    if self.num > 0x10FFFF {
                        self.num_too_big = true;
                    }
                }
                Status::Progress
            },
            _ if !self.seen_digit => {
                self.errors.push("absence-of-digits-in-numeric-character-reference");
                Status::Done(CharRef::one('\u{FFFD}'))
            },
            _ => {
                self.state = State::NumericSemicolon;
                Status::Progress
            },
        }
    }

    fn do_numeric_semicolon(&mut self, input: &mut InputStream) -> Status {
        match input.peek() {
            Some(';') => {
                input.consume();
            },
            _ => {
                self.errors.push("missing-semicolon-after-character-reference");
            },
        }
        Status::Done(self.finish_numeric())
    }

    fn finish_numeric(&mut self) -> CharRef {
        let n = self.num;
        if self.num_too_big {
            self.errors.push("character-reference-outside-unicode-range");
            return CharRef::one('\u{FFFD}');
        }
        if n == 0 {
            self.errors.push("null-character-reference");
            return CharRef::one('\u{FFFD}');
        }
        if (0x80..=0x9F).contains(&n) {
            if let Some(c) = entities::c1_windows_1252_remap(n) {
                self.errors.push("control-character-reference");
                return CharRef::one(c);
            }
        }
        if (0xD800..=0xDFFF).contains(&n) {
            self.errors.push("surrogate-character-reference");
            return CharRef::one('\u{FFFD}');
        }
        if n > 0x10FFFF {
            self.errors.push("character-reference-outside-unicode-range");
            return CharRef::one('\u{FFFD}');
        }
        match char::from_u32(n) {
            Some(c) => {
                if markup_core::input_stream::is_invalid_codepoint(c) {
                    self.errors.push("control-character-reference");
                }
                CharRef::one(c)
            },
            None => {
                self.errors.push("surrogate-character-reference");
                CharRef::one('\u{FFFD}')
            },
        }
    }

    fn do_named(&mut self, input: &mut InputStream) -> Status {
        loop {
            match input.peek() {
                Some(c) => {
                    let mut probe = self.name_buf.to_string();
                    probe.push(c);
                    if entities::has_any_key_with_prefix(&probe) {
                        input.consume();
                        self.name_buf.push_char(c);
                    } else {
                        break;
                    }
                },
                None => break,
            }
        }

        let buf = self.name_buf.to_string();
        let matched = entities::longest_key_with_prefix(&buf);

        let Some((matched_key, replacement)) = matched else {
            // Not a known reference at all: unconsume everything we ate
            // and report the bare `&` (handled by the caller).
            for c in buf.chars().rev() {
                input.unget(c);
            }
            if !buf.is_empty() {
                self.errors.push("unknown-named-character-reference");
            }
            return Status::Done(CharRef {
                chars: ['\0', '\0'],
                num_chars: 0,
            });
        };

        // Unconsume whatever we read past the matched key.
        for c in buf[matched_key.len()..].chars().rev() {
            input.unget(c);
        }

        if !matched_key.ends_with(';') {
            self.errors.push("missing-semicolon-after-character-reference");
            if self.is_consumed_in_attribute {
                if let Some(next) = input.peek() {
                    if next == '=' || next.is_ascii_alphanumeric() {
                        // Historical compatibility: in an attribute value,
                        // an unterminated match followed by `=` or an
                        // alphanumeric is not actually a reference.
                        for c in matched_key.chars().rev() {
                            input.unget(c);
                        }
                        return Status::Done(CharRef {
                            chars: ['\0', '\0'],
                            num_chars: 0,
                        });
                    }
                }
            }
        }

        let mut chars = ['\0', '\0'];
        let mut num_chars = 0u8;
        for c in replacement.chars().take(2) {
            chars[num_chars as usize] = c;
            num_chars += 1;
        }
        Status::Done(CharRef { chars, num_chars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup_core::encoding::Confidence;
    use encoding_rs::UTF_8;

    fn drive(src: &str, in_attr: bool) -> (Option<CharRef>, String) {
        let mut input = InputStream::new(UTF_8, Confidence::Certain);
        input.append_text(src.into());
        let mut t = CharRefTokenizer::new(in_attr);
        loop {
            match t.step(&mut input) {
                Status::Done(cr) => {
                    let mut rest = String::new();
                    while let Some(c) = input.consume() {
                        rest.push(c);
                    }
                    return (Some(cr), rest);
                },
                Status::Progress => continue,
                Status::Stuck => return (None, String::new()),
            }
        }
    }

    #[test]
    fn named_with_semicolon() {
        let (cr, rest) = drive("amp;rest", false);
        let cr = cr.unwrap();
        assert_eq!(cr.chars[0], '&');
        assert_eq!(cr.num_chars, 1);
        assert_eq!(rest, "rest");
    }

    #[test]
    fn named_without_semicolon_legacy() {
        let (cr, rest) = drive("amp rest", false);
        let cr = cr.unwrap();
        assert_eq!(cr.chars[0], '&');
        assert_eq!(rest, " rest");
    }

    #[test]
    fn unterminated_match_in_attribute_before_equals_is_not_consumed() {
        let (cr, rest) = drive("notin=5", true);
        let cr = cr.unwrap();
        assert_eq!(cr.num_chars, 0);
        assert_eq!(rest, "notin=5");
    }

    #[test]
    fn numeric_decimal() {
        let (cr, rest) = drive("#9731;abc", false);
        let cr = cr.unwrap();
        assert_eq!(cr.chars[0], '\u{2603}');
        assert_eq!(rest, "abc");
    }

    #[test]
    fn numeric_windows_1252_remap() {
        let (cr, _) = drive("#128;", false);
        assert_eq!(cr.unwrap().chars[0], '\u{20AC}');
    }

    #[test]
    fn numeric_null_becomes_replacement_char() {
        let (cr, _) = drive("#0;", false);
        assert_eq!(cr.unwrap().chars[0], '\u{FFFD}');
    }
}
