//! The two expansion passes
//!
//! The tree pass runs structural commands found in text and tail slots.
//! Whenever a handler reports that the parent's children changed, scanning
//! restarts at the parent's first child; command markup is removed before its
//! handler runs, so nothing is executed twice.
//!
//! The value pass then replaces every value command in text, tails and
//! attributes with its result. Results are never re-scanned, and command
//! markers inside them are defused, so a second pass is a no-op.

use tracing::{debug, warn};

use crate::context::{Expansion, Source, MAIN_SOURCE};
use crate::error::{ConvertError, Result};
use crate::macros::{defuse, next_command, splice};
use crate::registry::Handler;
use crate::template::{Node, Slot};

fn unknown_marker(name: &str) -> String {
    format!("((UNKNOWN:{}))", name)
}

fn error_marker(name: &str) -> String {
    format!("((ERROR:{}))", name)
}

/// Run both passes over `template` against the main document
pub fn expand(cx: &mut Expansion<'_>, template: &mut Node) -> Result<()> {
    let src = cx
        .main_source()
        .ok_or_else(|| ConvertError::UnknownSource(MAIN_SOURCE.to_string()))?;
    expand_tree(cx, template, &src)?;
    expand_all_attrib(cx, template, &src)
}

/// Structural pass over the children of `elem`
pub fn expand_tree(cx: &mut Expansion<'_>, elem: &mut Node, src: &Source) -> Result<()> {
    'restart: loop {
        let mut ix = 0;
        while ix < elem.children.len() {
            if expand_node(cx, elem, ix, src, Slot::Text)? {
                continue 'restart;
            }
            expand_tree(cx, &mut elem.children[ix], src)?;
            if expand_node(cx, elem, ix, src, Slot::Tail)? {
                continue 'restart;
            }
            ix += 1;
        }
        return Ok(());
    }
}

/// Run the structural commands in one slot of `parent.children[ix]`
///
/// Returns `true` as soon as a handler changed the parent's children.
fn expand_node(cx: &mut Expansion<'_>, parent: &mut Node, ix: usize, src: &Source, slot: Slot) -> Result<bool> {
    let mut pos = 0;
    loop {
        let Some(line) = parent.children.get(ix).and_then(|child| slot.get(child)).map(str::to_string) else {
            return Ok(false);
        };
        let Some(call) = next_command(&line, pos) else {
            return Ok(false);
        };

        match cx.services.registry.get(&call.name) {
            Some(Handler::Structural(handler)) => {
                slot.set(&mut parent.children[ix], splice(&line, &call, ""));
                debug!("Running {}({})", call.name, call.arg);

                let result = expand_line(cx, src, &call.arg).and_then(|arg| handler(cx, parent, ix, src, &arg));
                match result {
                    Ok(true) => return Ok(true),
                    Ok(false) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!("Error in command {}({}): {}", call.name, call.arg, e),
                }
            }
            Some(Handler::Value(_)) => pos = call.end,
            None => {
                warn!("Unknown command {} in '{}'", call.name, line);
                slot.set(&mut parent.children[ix], splice(&line, &call, &unknown_marker(&call.name)));
            }
        }
    }
}

/// Value pass over `elem` and everything below it
pub fn expand_all_attrib(cx: &mut Expansion<'_>, elem: &mut Node, src: &Source) -> Result<()> {
    if let Some(text) = elem.text.take() {
        elem.text = Some(expand_text(cx, src, text)?);
    }
    if let Some(tail) = elem.tail.take() {
        elem.tail = Some(expand_text(cx, src, tail)?);
    }
    for (_, value) in elem.attributes.iter_mut() {
        let current = std::mem::take(value);
        *value = expand_text(cx, src, current)?;
    }
    for child in elem.children.iter_mut() {
        expand_all_attrib(cx, child, src)?;
    }
    Ok(())
}

fn expand_text(cx: &mut Expansion<'_>, src: &Source, text: String) -> Result<String> {
    if text.contains("{{") {
        expand_line(cx, src, text.trim())
    } else {
        Ok(text)
    }
}

/// Replace the value commands in `line`
///
/// Arguments are expanded before their command runs. Handler failures become
/// `((ERROR:NAME))` unless they are fatal.
pub fn expand_line(cx: &mut Expansion<'_>, src: &Source, line: &str) -> Result<String> {
    let mut line = line.to_string();
    let mut pos = 0;

    while let Some(call) = next_command(&line, pos) {
        match cx.services.registry.get(&call.name) {
            Some(Handler::Value(handler)) => {
                let result = expand_line(cx, src, &call.arg).and_then(|arg| handler(cx, src, &arg));
                match result {
                    Ok(value) => {
                        let value = defuse(&value);
                        line = splice(&line, &call, &value);
                        pos = call.start + value.len();
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Error in command {}({}): {}", call.name, call.arg, e);
                        line = splice(&line, &call, &error_marker(&call.name));
                    }
                }
            }
            Some(Handler::Structural(_)) => pos = call.end,
            None => {
                warn!("Unknown command {} in '{}'", call.name, line);
                line = splice(&line, &call, &unknown_marker(&call.name));
            }
        }
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::Fixture;

    fn run(fx: &Fixture, doc: &str, template: &str) -> Node {
        let mut cx = fx.expansion(doc, "/library/sections/1/all");
        let mut node = Node::parse(template).unwrap();
        expand(&mut cx, &mut node).unwrap();
        node
    }

    const DOC: &str = r#"<MediaContainer title1="Movies" size="2">
        <Video title="A" key="/library/metadata/1"/>
        <Video title="B" key="/library/metadata/2"/>
    </MediaContainer>"#;

    #[test]
    fn test_unknown_command_marker() {
        let fx = Fixture::new();
        let node = run(&fx, DOC, r#"<root><t a="A{{FOO(bar)}}B">A{{FOO(bar)}}B</t></root>"#);
        assert_eq!(node.children[0].text.as_deref(), Some("A((UNKNOWN:FOO))B"));
        assert_eq!(node.children[0].attr("a"), Some("A((UNKNOWN:FOO))B"));
    }

    #[test]
    fn test_failing_value_command_marker() {
        let fx = Fixture::new();
        let node = run(&fx, DOC, r#"<root><t>[{{EVAL(1/0)}}] {{VAL(title1)}}</t></root>"#);
        assert_eq!(node.children[0].text.as_deref(), Some("[((ERROR:EVAL))] Movies"));
    }

    #[test]
    fn test_nested_argument_is_expanded_first() {
        let fx = Fixture::new();
        let node = run(&fx, DOC, r#"<root><t>{{EVAL({{VAL(size)}}*10)}}</t></root>"#);
        assert_eq!(node.children[0].text.as_deref(), Some("20"));
    }

    #[test]
    fn test_copy_then_value_in_same_line() {
        let fx = Fixture::new();
        let node = run(
            &fx,
            DOC,
            r#"<root><list><item>{{VAL(/title1)}}{{COPY(Video)}}<title>{{VAL(title)}}</title></item></list></root>"#,
        );
        let items = &node.children[0].children;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text.as_deref(), Some("Movies"));
        assert_eq!(items[1].children[0].text.as_deref(), Some("B"));
    }

    #[test]
    fn test_failing_structural_command_is_dropped() {
        let fx = Fixture::new();
        let node = run(&fx, DOC, r#"<root><t>{{CUT(@nowhere/title)}}kept</t></root>"#);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].text.as_deref(), Some("kept"));
    }

    #[test]
    fn test_structural_command_left_for_tree_pass_in_value_line() {
        let fx = Fixture::new();
        let mut cx = fx.expansion(DOC, "");
        let src = cx.main_source().unwrap();
        let line = expand_line(&mut cx, &src, "{{CUT(title1)}}{{VAL(title1)}}").unwrap();
        assert_eq!(line, "{{CUT(title1)}}Movies");
    }

    #[test]
    fn test_value_output_is_not_rescanned() {
        let fx = Fixture::new();
        let node = run(&fx, r#"<C raw="{{FOO(x)}}"/>"#, r#"<root><t>{{VAL(raw)}}</t></root>"#);
        assert_eq!(node.children[0].text.as_deref(), Some("{\u{200B}{FOO(x)}\u{200B}}"));
    }

    #[test]
    fn test_second_value_pass_keeps_document_markers() {
        let fx = Fixture::new();
        let mut cx = fx.expansion(r#"<C title="Best of {{VAR(x:y)}} and {{FOO(z)}}"/>"#, "");
        let src = cx.main_source().unwrap();
        let mut node = Node::parse(r#"<root><t>{{VAL(title)}}</t></root>"#).unwrap();

        expand_all_attrib(&mut cx, &mut node, &src).unwrap();
        let once = node.to_xml().unwrap();
        expand_all_attrib(&mut cx, &mut node, &src).unwrap();
        assert_eq!(node.to_xml().unwrap(), once);
        assert!(!once.contains("UNKNOWN"));
    }

    #[test]
    fn test_structural_marker_from_document_is_not_run() {
        let fx = Fixture::new();
        let mut cx = fx.expansion(r#"<C title="{{CUT(missing)}}"/>"#, "");
        let src = cx.main_source().unwrap();
        let mut node = Node::parse(r#"<root><t>{{VAL(title)}}</t></root>"#).unwrap();

        expand_all_attrib(&mut cx, &mut node, &src).unwrap();
        expand_tree(&mut cx, &mut node, &src).unwrap();
        assert_eq!(node.children.len(), 1);
    }
}
