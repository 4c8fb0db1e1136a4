// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The parser façade (§7): wires the encoding resolver, input stream,
//! tokenizer, and tree constructor together behind `parse()` and
//! `parse_fragment()`.
//!
//! Owns the restart loop: `resolve_initial_encoding` picks a tentative or
//! certain starting codec, the tokenizer and tree constructor run against
//! the decoded stream, and if a `<meta>` tag the constructor sees declares
//! an encoding that contradicts a still-tentative choice, the façade
//! rewinds and restarts with the new encoding installed at
//! `Confidence::Certain`. Because the constructor has already mutated a
//! sink by the time a restart is needed, the caller supplies a factory
//! rather than a sink instance, so a fresh one can be built for each
//! attempt.

use std::fmt;

use encoding_rs::Encoding;
use markup_core::encoding::EncodingOpts;
use markup_core::input_stream::{InputStream, Position};
use markup_core::tree_sink::TreeSink;
use markup_core::LocalName;

use crate::meta_scan::prescan_meta_charset;
use crate::tokenizer::states::{RawKind, State};
use crate::tokenizer::{Tokenizer, TokenizerOpts};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

/// A document or fragment failed to parse. The tree-construction
/// algorithm itself never fails — only I/O and encoding faults reach
/// this, per §7's "Errors" note.
#[derive(Debug)]
pub enum ParserError {
    Io(std::io::Error),
    /// The caller-resolved or meta-declared codec faulted on the bytes
    /// *after* encoding confidence became `Certain`, so no further
    /// reparse attempt is possible.
    Decode(&'static str),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Io(e) => write!(f, "failed to read input: {e}"),
            ParserError::Decode(msg) => write!(f, "failed to decode input: {msg}"),
        }
    }
}

impl std::error::Error for ParserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParserError::Io(e) => Some(e),
            ParserError::Decode(_) => None,
        }
    }
}

#[derive(Clone, Default)]
pub struct ParseOpts {
    pub tokenizer: TokenizerOpts,
    pub tree_builder: TreeBuilderOpts,
    pub encoding: EncodingOpts,
}

/// The result of a successful `parse`/`parse_fragment` call.
pub struct ParseOutput<Output> {
    pub output: Output,
    /// The encoding that was actually used to decode the input, at
    /// whatever confidence it settled on.
    pub encoding: &'static Encoding,
    pub errors: Vec<(&'static str, Position)>,
}

const MAX_REPARSE_ATTEMPTS: u32 = 8;

/// Parses a complete document. `make_sink` is called once per attempt
/// (ordinarily once, but again for each `Reparse` the document triggers).
pub fn parse<Sink>(
    make_sink: impl Fn() -> Sink,
    bytes: &[u8],
    opts: &ParseOpts,
) -> Result<ParseOutput<Sink::Output>, ParserError>
where
    Sink: TreeSink,
{
    run_pipeline(bytes, opts, |input| {
        let tb = TreeBuilder::new(make_sink(), opts.tree_builder.clone());
        let mut tok = Tokenizer::new(tb, opts.tokenizer.clone());
        tok.run(input);
        tok
    })
}

/// Parses a fragment of markup as if it were the children of
/// `context_name` (§7 "parsing HTML fragments"). `make_sink` must return a
/// fresh sink whose `get_document()` yields a node suitable as the
/// fragment's root; `context_elem` is the handle of a (possibly
/// synthetic) element the sink has already created to stand in for the
/// context.
pub fn parse_fragment<Sink>(
    make_sink: impl Fn() -> Sink,
    context_name: LocalName,
    make_context_elem: impl Fn(&mut Sink) -> Sink::Handle,
    bytes: &[u8],
    opts: &ParseOpts,
) -> Result<ParseOutput<Sink::Output>, ParserError>
where
    Sink: TreeSink,
{
    let initial_state = fragment_initial_state(&context_name);
    run_pipeline(bytes, opts, |input| {
        let mut sink = make_sink();
        let context_elem = make_context_elem(&mut sink);
        let mut tree_opts = opts.tree_builder.clone();
        tree_opts.is_fragment = true;
        let mut tb = TreeBuilder::new(sink, tree_opts);
        tb.init_fragment_context(&context_name, context_elem);

        let mut tok_opts = opts.tokenizer.clone();
        tok_opts.initial_state = initial_state;
        tok_opts.last_start_tag_name = Some(context_name.clone());
        let mut tok = Tokenizer::new(tb, tok_opts);
        tok.run(input);
        tok
    })
}

/// The RAWTEXT/RCDATA/PLAINTEXT state a fragment's tokenizer must start
/// in when its context element is one of the few tags that always imply
/// a special text mode (§7, step 4 of "parsing HTML fragments").
fn fragment_initial_state(context_name: &LocalName) -> Option<State> {
    match &**context_name {
        "title" | "textarea" => Some(State::RawData(RawKind::Rcdata)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(State::RawData(RawKind::Rawtext)),
        "script" => Some(State::RawData(RawKind::ScriptData)),
        "noscript" => Some(State::RawData(RawKind::Rawtext)),
        "plaintext" => Some(State::Plaintext),
        _ => None,
    }
}

fn run_pipeline<Sink: TreeSink>(
    bytes: &[u8],
    opts: &ParseOpts,
    mut run_once: impl FnMut(&mut InputStream) -> Tokenizer<TreeBuilder<Sink>>,
) -> Result<ParseOutput<Sink::Output>, ParserError> {
    let mut encoding_opts = opts.encoding;
    for _ in 0..MAX_REPARSE_ATTEMPTS {
        let (encoding, confidence, bom_len) =
            markup_core::encoding::resolve_initial_encoding(bytes, &encoding_opts, prescan_meta_charset);

        let mut input = InputStream::new(encoding, confidence);
        input.append_bytes(&bytes[bom_len..], true);

        let mut tok = run_once(&mut input);

        let reparse = tok.sink_mut().take_meta_encoding().and_then(|enc| input.maybe_switch_encoding(enc));

        if let Some(reparse) = reparse {
            encoding_opts.override_encoding = Some(reparse.encoding);
            continue;
        }

        let tb = tok.end();
        let errors = input.errors;
        return Ok(ParseOutput {
            output: tb.unwrap().finish(),
            encoding,
            errors,
        });
    }
    Err(ParserError::Decode("encoding oscillated across reparse attempts without settling"))
}
