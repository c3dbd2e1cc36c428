//! Argument splitting and source-document lookups
//!
//! Command arguments are `:`-separated. Each part may carry escapes for the
//! characters templates cannot write literally: `&col;` (`:`), `&ocb;` (`{`),
//! `&ccb;` (`}`) and the usual XML entities.

mod conversion;

pub use conversion::ConversionTable;

use xmltree::Element;

/// Split off the first `:`-separated part of `param`, unescaped
///
/// Returns the part and the untouched remainder.
pub fn split_param(param: &str) -> (String, &str) {
    let (head, rest) = param.split_once(':').unwrap_or((param, ""));
    (unescape(head), rest)
}

/// Decode template escapes; `&amp;` is decoded last so `&amp;col;` stays `&col;`
pub fn unescape(text: &str) -> String {
    text.replace("&col;", ":")
        .replace("&ocb;", "{")
        .replace("&ccb;", "}")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Child elements of `parent`
pub fn child_elements(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(|node| node.as_element())
}

/// Child elements of `parent` matching one path step
///
/// A step is a tag, `*` for any tag, or `tag[n]` for the n-th (1-based) match.
pub fn find_all<'a>(parent: &'a Element, step: &str) -> Vec<&'a Element> {
    let (tag, index) = match step.strip_suffix(']').and_then(|s| s.split_once('[')) {
        Some((tag, index)) => (tag, index.parse::<usize>().ok()),
        None => (step, None),
    };

    let matching = child_elements(parent).filter(|el| tag == "*" || el.name == tag);
    match index {
        Some(n) if n >= 1 => matching.skip(n - 1).take(1).collect(),
        Some(_) => Vec::new(),
        None => matching.collect(),
    }
}

/// First child element of `parent` matching one path step
pub fn find_child<'a>(parent: &'a Element, step: &str) -> Option<&'a Element> {
    find_all(parent, step).into_iter().next()
}
