// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! DOCTYPE quirks-mode determination (§9), grounded on the WHATWG
//! "quirky" and "limited quirky" public/system identifier tables.

use markup_core::tree_sink::QuirksMode;

use crate::tokenizer::interface::Doctype;

// Lowercase, for ASCII-case-insensitive matching against the doctype's
// (already-lowercased) identifiers.
static QUIRKY_PUBLIC_PREFIXES: &[&str] = &[
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

static QUIRKY_PUBLIC_MATCHES: &[&str] = &["-//w3o//dtd w3 html strict 3.0//en//", "-/w3c/dtd html 4.0 transitional/en", "html"];

static QUIRKY_SYSTEM_MATCHES: &[&str] = &["http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd"];

static LIMITED_QUIRKY_PUBLIC_PREFIXES: &[&str] = &["-//w3c//dtd xhtml 1.0 frameset//", "-//w3c//dtd xhtml 1.0 transitional//"];

static HTML4_PUBLIC_PREFIXES: &[&str] = &["-//w3c//dtd html 4.01 frameset//", "-//w3c//dtd html 4.01 transitional//"];

fn eq_ci(s: &str, target: &str) -> bool {
    s.eq_ignore_ascii_case(target)
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn any_eq(haystack: &[&str], needle: &str) -> bool {
    haystack.iter().any(|&s| eq_ci(needle, s))
}

fn any_prefix(haystack: &[&str], needle: &str) -> bool {
    haystack.iter().any(|&prefix| starts_with_ci(needle, prefix))
}

/// §9's quirks-mode determination for a DOCTYPE token, including the
/// `about:legacy-compat` special case for an otherwise-bare `<!DOCTYPE html>`.
/// `iframe_srcdoc` forces `NoQuirks` regardless of the identifiers, per the
/// `srcdoc` document special case.
pub fn doctype_quirks_mode(d: &Doctype, iframe_srcdoc: bool) -> QuirksMode {
    if iframe_srcdoc {
        return QuirksMode::NoQuirks;
    }

    let is_html_name = d.name.as_deref().map(|n| eq_ci(n, "html")).unwrap_or(false);
    if !d.correct || !is_html_name {
        return QuirksMode::Quirks;
    }

    let public = d.public_id.as_deref();
    let system = d.system_id.as_deref();

    if let Some(p) = public {
        if any_eq(QUIRKY_PUBLIC_MATCHES, p) {
            return QuirksMode::Quirks;
        }
    }
    if let Some(s) = system {
        if any_eq(QUIRKY_SYSTEM_MATCHES, s) {
            return QuirksMode::Quirks;
        }
    }
    if let Some(p) = public {
        if any_prefix(QUIRKY_PUBLIC_PREFIXES, p) {
            return QuirksMode::Quirks;
        }
        if any_prefix(LIMITED_QUIRKY_PUBLIC_PREFIXES, p) {
            return QuirksMode::LimitedQuirks;
        }
        if any_prefix(HTML4_PUBLIC_PREFIXES, p) {
            return match system {
                None => QuirksMode::Quirks,
                Some(_) => QuirksMode::LimitedQuirks,
            };
        }
    }

    QuirksMode::NoQuirks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctype(name: Option<&str>, public: Option<&str>, system: Option<&str>, correct: bool) -> Doctype {
        Doctype {
            name: name.map(Into::into),
            public_id: public.map(Into::into),
            system_id: system.map(Into::into),
            correct,
        }
    }

    #[test]
    fn bare_html_doctype_is_no_quirks() {
        let d = doctype(Some("html"), None, None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::NoQuirks);
    }

    #[test]
    fn html4_strict_public_id_is_no_quirks() {
        // -//W3C//DTD HTML 4.01//EN with no system id isn't in any of the
        // quirky/limited-quirky tables.
        let d = doctype(Some("html"), Some("-//W3C//DTD HTML 4.01//EN"), None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::NoQuirks);
    }

    #[test]
    fn html4_transitional_with_system_id_is_limited_quirks() {
        let d = doctype(
            Some("html"),
            Some("-//W3C//DTD HTML 4.01 Transitional//EN"),
            Some("http://www.w3.org/TR/html4/loose.dtd"),
            true,
        );
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::LimitedQuirks);
    }

    #[test]
    fn html4_transitional_without_system_id_is_quirks() {
        let d = doctype(Some("html"), Some("-//W3C//DTD HTML 4.01 Transitional//EN"), None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::Quirks);
    }

    #[test]
    fn ancient_html2_public_id_is_quirks() {
        let d = doctype(Some("html"), Some("-//IETF//DTD HTML 2.0//"), None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::Quirks);
    }

    #[test]
    fn xhtml_1_0_transitional_is_limited_quirks() {
        let d = doctype(Some("html"), Some("-//W3C//DTD XHTML 1.0 Transitional//EN"), None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::LimitedQuirks);
    }

    #[test]
    fn force_quirks_flag_wins_regardless_of_identifiers() {
        let d = doctype(Some("html"), None, None, false);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::Quirks);
    }

    #[test]
    fn non_html_name_is_quirks() {
        let d = doctype(Some("math"), None, None, true);
        assert_eq!(doctype_quirks_mode(&d, false), QuirksMode::Quirks);
    }

    #[test]
    fn iframe_srcdoc_overrides_a_quirky_doctype() {
        let d = doctype(Some("html"), Some("-//IETF//DTD HTML 2.0//"), None, true);
        assert_eq!(doctype_quirks_mode(&d, true), QuirksMode::NoQuirks);
    }
}
