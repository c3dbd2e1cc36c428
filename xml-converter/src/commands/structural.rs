//! Commands that reshape the template or the pass state

use std::rc::Rc;

use pms_client::{PmsError, ServerClass};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};
use xmltree::Element;

use crate::context::{Expansion, Source};
use crate::error::{ConvertError, Result};
use crate::expand::{expand_all_attrib, expand_tree};
use crate::federation;
use crate::resolve::{find_all, find_child, split_param};
use crate::template::{Node, UNWRAP_TAG};

/// Variable holding the index of the fragment being duplicated
const COPY_INDEX: &str = "copy_ix";

/// Elements selected by `container/.../tag` below `base`
///
/// Returns the final tag and its matches; a missing container yields none.
fn collect_matches(base: &Element, path: &str) -> (String, Vec<Element>) {
    let (container, tag) = match path.rsplit_once('/') {
        Some((container, tag)) => (Some(container), tag),
        None => (None, path),
    };

    let mut parent = Some(base);
    if let Some(container) = container {
        for segment in container.split('/') {
            parent = parent.and_then(|el| find_child(el, segment));
        }
    }

    let matches = parent
        .map(|el| find_all(el, tag).into_iter().cloned().collect())
        .unwrap_or_default();
    (tag.to_string(), matches)
}

/// Replace `parent.children[ix]` by one expanded copy per source
fn duplicate(cx: &mut Expansion<'_>, parent: &mut Node, ix: usize, tag: &str, sources: &[Source]) -> Result<bool> {
    let Some(prototype) = parent.children.get(ix).cloned() else {
        return Ok(false);
    };

    let mut produced = Vec::new();
    for (n, source) in sources.iter().enumerate() {
        let base_path = cx.base_path(&source.alias)?.to_string();
        cx.register_source(format!("copy_{}", tag), source.node.clone(), base_path);
        cx.set_variable(COPY_INDEX, n.to_string());

        let mut wrapper = Node::default().with_child(prototype.clone());
        expand_tree(cx, &mut wrapper, source)?;
        expand_all_attrib(cx, &mut wrapper, source)?;

        for node in wrapper.children {
            if node.tag == UNWRAP_TAG {
                produced.extend(node.children);
            } else {
                produced.push(node);
            }
        }
    }

    debug!("Duplicated <{}> {} times for {}", prototype.tag, sources.len(), tag);
    parent.children.splice(ix..=ix, produced);
    Ok(true)
}

/// `COPY(path[:enable-key])`
pub(crate) fn copy(cx: &mut Expansion<'_>, parent: &mut Node, ix: usize, src: &Source, arg: &str) -> Result<bool> {
    let (path, enable) = split_param(arg);
    let (base, path) = cx.base(src, &path)?;
    let (tag, matches) = collect_matches(&base.node, path);

    let mut sources = Vec::new();
    for element in matches {
        let source = Source::new(Rc::new(element), base.alias.clone());
        if enable.is_empty() || !cx.value_of(&source, enable)?.is_empty() {
            sources.push(source);
        }
    }

    duplicate(cx, parent, ix, &tag, &sources)
}

/// Order in which a playlist is built from the source entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Only the entries matching the key
    Single,
    /// The first match and everything after it
    Continuous,
    /// As `Continuous`, shuffled behind the first match
    Shuffle,
}

impl PlayMode {
    pub fn from_key(value: &str) -> Self {
        match value {
            "Continuous" => PlayMode::Continuous,
            "Shuffle" => PlayMode::Shuffle,
            _ => PlayMode::Single,
        }
    }
}

/// Pick playlist entries from `(item, item-key)` pairs
///
/// An empty `key` selects everything. `Shuffle` keeps the matched entry in
/// front when a key was given.
pub fn select_playlist<T, R: Rng + ?Sized>(items: Vec<(T, String)>, mode: PlayMode, key: &str, rng: &mut R) -> Vec<T> {
    let mut started = false;
    let mut selected: Vec<T> = items
        .into_iter()
        .filter(|(_, item_key)| {
            let take = if key.is_empty() {
                true
            } else {
                match mode {
                    PlayMode::Single => item_key == key,
                    PlayMode::Continuous | PlayMode::Shuffle => started || item_key == key,
                }
            };
            started = started || take;
            take
        })
        .map(|(item, _)| item)
        .collect();

    if mode == PlayMode::Shuffle {
        if key.is_empty() {
            selected.shuffle(rng);
        } else if selected.len() > 1 {
            selected[1..].shuffle(rng);
        }
    }
    selected
}

/// `COPY_PLAYLIST(path:mode-key[:default]:match-key[:default]:item-key)`
pub(crate) fn copy_playlist(
    cx: &mut Expansion<'_>,
    parent: &mut Node,
    ix: usize,
    src: &Source,
    arg: &str,
) -> Result<bool> {
    let (path, rest) = split_param(arg);
    let mode = cx.get_key(src, rest)?;
    let key = cx.get_key(src, mode.leftover)?;
    let item_key = key.leftover;
    let mode = PlayMode::from_key(&mode.value);

    let (base, path) = cx.base(src, &path)?;
    let (tag, matches) = collect_matches(&base.node, path);

    let mut items = Vec::with_capacity(matches.len());
    for element in matches {
        let source = Source::new(Rc::new(element), base.alias.clone());
        let value = cx.get_key(&source, item_key)?.value;
        items.push((source, value));
    }

    let sources = select_playlist(items, mode, &key.value, &mut cx.rng);
    duplicate(cx, parent, ix, &tag, &sources)
}

/// `CUT(key[:default][:conversion])`: drop the node when the value is non-empty
pub(crate) fn cut(cx: &mut Expansion<'_>, parent: &mut Node, ix: usize, src: &Source, arg: &str) -> Result<bool> {
    if cx.value_of(src, arg)?.is_empty() || ix >= parent.children.len() {
        return Ok(false);
    }
    parent.children.remove(ix);
    Ok(true)
}

/// `ADDXML(alias:path-key[:default])`
///
/// The path is absolute (`/…`), on another server (`//address/…`), empty for
/// the current base path, or relative to it.
pub(crate) fn add_xml(cx: &mut Expansion<'_>, _parent: &mut Node, _ix: usize, src: &Source, arg: &str) -> Result<bool> {
    let (alias, rest) = split_param(arg);
    let key = cx.get_key(src, rest)?.value;

    let mut address = cx.server_address.clone();
    let path = if let Some(remote) = key.strip_prefix("//") {
        match remote.find('/') {
            Some(slash) => {
                address = remote[..slash].to_string();
                remote[slash..].to_string()
            }
            None => {
                address = remote.to_string();
                "/".to_string()
            }
        }
    } else if key.starts_with('/') {
        key
    } else if key.is_empty() {
        cx.base_path(&src.alias)?.to_string()
    } else {
        format!("{}/{}", cx.base_path(&src.alias)?, key)
    };

    let gateway = cx.services.gateway;
    let document = match address.parse::<ServerClass>() {
        Ok(class) => federation::aggregate(gateway, &cx.device_id, class, &path),
        Err(_) => {
            let server = gateway
                .resolve_server(&cx.device_id, &address)
                .ok_or_else(|| ConvertError::Fetch(PmsError::UnknownServer(address.clone())))?;
            gateway.fetch_document(&cx.device_id, &server, &path)?
        }
    };

    info!("Attached {} from {} as '{}'", path, address, alias);
    cx.register_source(alias, Rc::new(document), path);
    Ok(false)
}

/// `VAR(name:key[:default][:conversion])`
pub(crate) fn var(cx: &mut Expansion<'_>, _parent: &mut Node, _ix: usize, src: &Source, arg: &str) -> Result<bool> {
    let (name, rest) = split_param(arg);
    let value = cx.value_of(src, rest)?;
    debug!("VAR {} = '{}'", name, value);
    cx.set_variable(name, value);
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::Fixture;
    use crate::expand::expand;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    const DOC: &str = r#"<MediaContainer title1="Shows" key="/library/sections/2">
        <Directory title="Alpha" ratingKey="1" viewed="1"/>
        <Directory title="Beta" ratingKey="2" viewed="0"/>
        <Directory title="Gamma" ratingKey="3"/>
    </MediaContainer>"#;

    fn run(fx: &Fixture, template: &str) -> Node {
        let mut cx = fx.expansion(DOC, "/library/sections/2/all");
        let mut node = Node::parse(template).unwrap();
        expand(&mut cx, &mut node).unwrap();
        node
    }

    fn texts(nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| n.text.clone().unwrap_or_default()).collect()
    }

    #[test]
    fn test_copy_inserts_in_source_order() {
        let fx = Fixture::new();
        let node = run(
            &fx,
            r#"<list><head/><item>{{COPY(Directory)}}{{VAL(title)}}-{{VAL(#copy_ix)}}</item><tail/></list>"#,
        );
        let tags: Vec<&str> = node.children.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["head", "item", "item", "item", "tail"]);
        assert_eq!(texts(&node.children[1..4]), vec!["Alpha-0", "Beta-1", "Gamma-2"]);
    }

    #[test]
    fn test_copy_enable_key_and_unwrap() {
        let fx = Fixture::new();
        let node = run(
            &fx,
            r#"<list><__COPY__>{{COPY(Directory:viewed::0=|1=yes)}}<a>{{VAL(title)}}</a><b/></__COPY__></list>"#,
        );
        // Gamma has no viewed flag, Beta converts to ""
        let tags: Vec<&str> = node.children.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(node.children[0].text.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_copy_without_matches_removes_prototype() {
        let fx = Fixture::new();
        let node = run(&fx, r#"<list><item>{{COPY(Hub/Video)}}</item><end/></list>"#);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].tag, "end");
    }

    #[test]
    fn test_copy_registers_match_alias() {
        let fx = Fixture::new();
        let node = run(&fx, r#"<list><item>{{COPY(Directory)}}<k>{{VAL(@copy_Directory/ratingKey)}}</k></item></list>"#);
        let keys: Vec<String> = node.children.iter().map(|n| n.children[0].text.clone().unwrap_or_default()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
    }

    #[rstest]
    #[case("viewed", 1)]
    #[case("missing", 3)]
    #[case("viewed::1=cut|0=", 2)]
    fn test_cut(#[case] key: &str, #[case] remaining: usize) {
        let fx = Fixture::new();
        let template = format!(
            r#"<list><item>{{{{COPY(Directory)}}}}<x>{{{{CUT({})}}}}</x><y/></item></list>"#,
            key
        );
        let node = run(&fx, &template);
        let total: usize = node.children.iter().map(|item| item.children.len()).sum();
        assert_eq!(total, 3 * 2 - (3 - remaining));
    }

    #[test]
    fn test_cut_with_conversion_table() {
        let fx = Fixture::new();
        let node = run(&fx, r#"<root><a>{{CUT(title1::0=cut|1=)}}</a><b/></root>"#);
        // "Shows" >= "1" so the replacement is empty and the node stays
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn test_var_binds_for_later_commands() {
        let fx = Fixture::new();
        let node = run(&fx, r#"<root><a>{{VAR(kind:title1)}}</a><b>{{VAL(#kind)}}</b></root>"#);
        assert_eq!(node.children[1].text.as_deref(), Some("Shows"));
    }

    #[test]
    fn test_add_xml_relative_path() {
        let mut fx = Fixture::new();
        let extras = Element::parse(r#"<MediaContainer><Video title="Trailer"/></MediaContainer>"#.as_bytes()).unwrap();
        fx.gateway.add_document("pms-1", "/library/sections/2/all/extras", extras);

        let node = run(
            &fx,
            r#"<root><a>{{ADDXML(extras::extras)}}</a><b>{{VAL(@extras/Video/title)}}</b></root>"#,
        );
        assert_eq!(node.children[1].text.as_deref(), Some("Trailer"));
    }

    #[test]
    fn test_add_xml_remote_address_marker() {
        let mut fx = Fixture::new();
        fx.gateway.add_server(pms_client::ServerRecord {
            uuid: "pms-2".to_string(),
            name: "Office".to_string(),
            address: "10.0.0.9".to_string(),
            port: "32400".to_string(),
            base_url: "http://10.0.0.9:32400".to_string(),
            ..Default::default()
        });
        let hubs = Element::parse(r#"<MediaContainer size="4"/>"#.as_bytes()).unwrap();
        fx.gateway.add_document("pms-2", "/hubs", hubs);

        let mut cx = fx.expansion(r#"<MediaContainer remote="//10.0.0.9/hubs"/>"#, "/library");
        let mut node = Node::parse(r#"<root><a>{{ADDXML(hubs:remote)}}</a><b>{{VAL(@hubs/size)}}</b></root>"#).unwrap();
        expand(&mut cx, &mut node).unwrap();
        assert_eq!(node.children[1].text.as_deref(), Some("4"));
        assert_eq!(cx.base_path("hubs").unwrap(), "/hubs");
    }

    #[test]
    fn test_add_xml_fetch_failure_aborts() {
        let fx = Fixture::new();
        let mut cx = fx.expansion(DOC, "/library/sections/2/all");
        let mut node = Node::parse(r#"<root><a>{{ADDXML(more:key)}}</a></root>"#).unwrap();
        assert!(matches!(expand(&mut cx, &mut node), Err(ConvertError::Fetch(_))));
    }

    fn playlist() -> Vec<(u32, String)> {
        ["1", "2", "3", "2", "4", "5"]
            .iter()
            .enumerate()
            .map(|(i, k)| (i as u32, k.to_string()))
            .collect()
    }

    #[rstest]
    #[case(PlayMode::Single, "2", vec![1, 3])]
    #[case(PlayMode::Single, "9", vec![])]
    #[case(PlayMode::Continuous, "2", vec![1, 2, 3, 4, 5])]
    #[case(PlayMode::Continuous, "", vec![0, 1, 2, 3, 4, 5])]
    #[case(PlayMode::Single, "", vec![0, 1, 2, 3, 4, 5])]
    fn test_select_playlist(#[case] mode: PlayMode, #[case] key: &str, #[case] expected: Vec<u32>) {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_playlist(playlist(), mode, key, &mut rng), expected);
    }

    #[test]
    fn test_shuffle_keeps_first_match() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut selected = select_playlist(playlist(), PlayMode::Shuffle, "3", &mut rng);
        assert_eq!(selected[0], 2);
        selected[1..].sort();
        assert_eq!(selected, vec![2, 3, 4, 5]);

        let mut all = select_playlist(playlist(), PlayMode::Shuffle, "", &mut rng);
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);

        assert!(select_playlist(playlist(), PlayMode::Shuffle, "9", &mut rng).is_empty());
    }

    #[test]
    fn test_copy_playlist_continuous() {
        let fx = Fixture::new();
        let node = run(
            &fx,
            r#"<list><item>{{COPY_PLAYLIST(Directory:^mode:Continuous:^PlexConnectRatingKey:2:ratingKey)}}{{VAL(title)}}</item></list>"#,
        );
        // PlexConnectRatingKey is "7" in the fixture; nothing matches
        assert!(node.children.is_empty());

        let node = run(
            &fx,
            r#"<list><item>{{COPY_PLAYLIST(Directory:^mode:Continuous:^absent:2:ratingKey)}}{{VAL(title)}}</item></list>"#,
        );
        assert_eq!(texts(&node.children), vec!["Beta", "Gamma"]);
    }
}
