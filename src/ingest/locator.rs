// src/ingest/locator.rs
//! Payload locator.
//!
//! Two stages: find the `window.calendarComponentStates[N] = {...}` assignment
//! by pattern and cut out the balanced literal that follows it, then decode
//! that literal with `serde_json`. The rendered table is not used because it
//! drops collapsed rows past the first days of the visible window.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::ingest::types::RawCalendarState;

/// State index the calendar widget writes its days into.
pub const DEFAULT_STATE_INDEX: usize = 1;

static RE_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"window\.calendarComponentStates\s*\[\s*(\d+)\s*\]\s*=\s*")
        .expect("state assignment regex")
});

/// Return the first literal assigned to `calendarComponentStates[index]`, or
/// `None` when the page has no such assignment (or every one is truncated or
/// not a literal).
pub fn locate_state(html: &str, index: usize) -> Option<&str> {
    for caps in RE_ASSIGN.captures_iter(html) {
        let idx: usize = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if idx != index {
            continue;
        }
        let start = caps.get(0)?.end();
        if let Some(lit) = balanced_literal(&html[start..]) {
            return Some(lit);
        }
    }
    None
}

/// Slice the leading `{...}` / `[...]` literal, honouring string quoting so
/// braces inside event titles don't close it early.
fn balanced_literal(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let open = *bytes.first()?;
    if open != b'{' && open != b'[' {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict JSON first; on failure retry once on a relaxed rewrite of the
/// JavaScript literal. The strict error is the one reported.
pub fn decode_state(segment: &str) -> Result<RawCalendarState, serde_json::Error> {
    match serde_json::from_str::<RawCalendarState>(segment) {
        Ok(v) => Ok(v),
        Err(strict) => {
            let relaxed = relax_js_literal(segment);
            if relaxed == segment {
                return Err(strict);
            }
            let state = serde_json::from_str::<RawCalendarState>(&relaxed).map_err(|_| strict)?;
            debug!(target: "ingest", "payload is not strict JSON; decoded as a JavaScript literal");
            Ok(state)
        }
    }
}

/// Rewrite the JavaScript object-literal habits that JSON rejects:
/// bare identifier keys, single-quoted strings and trailing commas.
/// String contents are copied through untouched.
pub fn relax_js_literal(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len() + 64);
    let mut i = 0usize;
    // last significant char emitted outside strings
    let mut last_sig: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = copy_string(&chars, i, &mut out, '"');
                i = end;
                last_sig = Some('"');
                continue;
            }
            '\'' => {
                let end = copy_string(&chars, i, &mut out, '\'');
                i = end;
                last_sig = Some('"');
                continue;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i += 1;
                    continue;
                }
                out.push(c);
                last_sig = Some(c);
            }
            c if (c.is_ascii_alphabetic() || c == '_' || c == '$')
                && matches!(last_sig, Some('{') | Some(',')) =>
            {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ':' {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                last_sig = Some('"');
                continue;
            }
            c => {
                out.push(c);
                if !c.is_whitespace() {
                    last_sig = Some(c);
                }
            }
        }
        i += 1;
    }
    out
}

/// Copy a quoted string starting at `start` as a JSON double-quoted string.
/// Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String, quote: char) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if quote == '\'' && next == '\'' {
                out.push('\'');
            } else {
                out.push('\\');
                out.push(next);
            }
            i += 2;
            continue;
        }
        if c == quote {
            out.push('"');
            return i + 1;
        }
        if c == '"' {
            // only reachable inside single-quoted strings
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
        i += 1;
    }
    i
}
