//! Locating `{{NAME(argument)}}` commands in template text
//!
//! Arguments may contain further commands. The outer boundary is found by
//! extending the search for `}}` while another `{{` opens before the current
//! candidate close marker. Inner commands are resolved later by expanding the
//! extracted argument on its own.

use tracing::warn;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const OPEN_BROKEN: &str = "{\u{200B}{";
const CLOSE_BROKEN: &str = "}\u{200B}}";

/// One command found in a line of template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    /// Byte offset of the opening `{{`
    pub start: usize,
    /// Byte offset just past the closing `}}`
    pub end: usize,
    pub name: String,
    /// Raw argument text, possibly containing nested commands
    pub arg: String,
}

fn find_from(line: &str, pattern: &str, from: usize) -> Option<usize> {
    line.get(from..)?.find(pattern).map(|ix| ix + from)
}

/// Find the first complete command at or after byte offset `pos`
pub fn next_command(line: &str, pos: usize) -> Option<MacroCall> {
    let start = find_from(line, OPEN, pos)?;
    let mut close = find_from(line, CLOSE, pos)?;
    let mut next_open = find_from(line, OPEN, start + OPEN.len());

    while let Some(open) = next_open {
        if open >= close {
            break;
        }
        close = find_from(line, CLOSE, close + CLOSE.len())?;
        next_open = find_from(line, OPEN, open + OPEN.len());
    }

    if start > close {
        return None;
    }

    let (name, arg) = split_payload(&line[start + OPEN.len()..close]);
    Some(MacroCall {
        start,
        end: close + CLOSE.len(),
        name,
        arg,
    })
}

/// Split `NAME(argument)` into its name and argument
///
/// A missing closing parenthesis is tolerated: the remaining text becomes the
/// argument. A payload without `(` is a bare name.
pub fn split_payload(payload: &str) -> (String, String) {
    if !payload.ends_with(')') {
        warn!("Closing bracket missing in command: {{{{{}}}}}", payload);
    }
    match payload.split_once('(') {
        Some((name, rest)) => {
            let arg = rest.strip_suffix(')').unwrap_or(rest);
            (name.to_string(), arg.to_string())
        }
        None => (payload.to_string(), String::new()),
    }
}

/// Replace `call` in `line` with `replacement`
pub fn splice(line: &str, call: &MacroCall, replacement: &str) -> String {
    let mut out = String::with_capacity(line.len() + replacement.len());
    out.push_str(&line[..call.start]);
    out.push_str(replacement);
    out.push_str(&line[call.end..]);
    out
}

/// Break up command markers in text that came from a document
///
/// A zero-width space goes between the braces of every `{{` and `}}`, so
/// spliced-in values are never scanned as commands by a later pass.
pub fn defuse(value: &str) -> String {
    if value.contains(OPEN) || value.contains(CLOSE) {
        value.replace(OPEN, OPEN_BROKEN).replace(CLOSE, CLOSE_BROKEN)
    } else {
        value.to_string()
    }
}
