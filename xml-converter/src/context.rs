//! State of one expansion pass and the path resolver
//!
//! An [`Expansion`] owns everything a pass may change (source registry,
//! variables, the shuffle RNG) and borrows the shared collaborators. It is
//! created per request and dropped with it.
//!
//! Path arguments have the form `path[:default][:conversion]`. The path may
//! start with `@alias/` (a registered source) or `/` (the main document);
//! otherwise it is resolved against the current source node. Segments are
//! child tags, `#variable`, `$setting` or `%server-property`; the terminal
//! segment may also be `^option` or an attribute name.

use std::collections::HashMap;
use std::rc::Rc;

use atv_settings::SettingsStore;
use pms_client::{is_class_name, ServerRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};
use xmltree::Element;

use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::expr::{format_message, FormatArg};
use crate::gateway::ServerGateway;
use crate::registry::CommandRegistry;
use crate::resolve::{find_child, split_param, ConversionTable};
use crate::translate::Translator;

/// Alias of the document a request was made for
pub const MAIN_SOURCE: &str = "main";

pub(crate) const DEFAULT_LANGUAGE: &str = "en";

/// Source node a command is evaluated against
#[derive(Debug, Clone)]
pub struct Source {
    pub node: Rc<Element>,
    /// Registry alias the node came from; selects the base path
    pub alias: String,
}

impl Source {
    pub fn new(node: Rc<Element>, alias: impl Into<String>) -> Self {
        Self {
            node,
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct SourceEntry {
    root: Rc<Element>,
    /// Request path the document was fetched from
    path: String,
}

/// A resolved key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key<'p> {
    pub value: String,
    /// Unparsed remainder of the argument
    pub leftover: &'p str,
    /// Nothing matched; `value` is the caller's default
    pub defaulted: bool,
}

/// Server behind `address`, or an empty record when there is none
///
/// Server classes never resolve to a single server. Any other miss is logged,
/// since URLs built from the empty record carry no host.
pub(crate) fn server_or_empty(gateway: &dyn ServerGateway, device_id: &str, address: &str) -> ServerRecord {
    match gateway.resolve_server(device_id, address) {
        Some(server) => server,
        None if address.is_empty() || is_class_name(address) => ServerRecord::default(),
        None => {
            warn!("Unknown server '{}' for device {}; URLs will have no host", address, device_id);
            ServerRecord::default()
        }
    }
}

/// Shared collaborators borrowed by a pass
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub gateway: &'a dyn ServerGateway,
    pub settings: &'a dyn SettingsStore,
    pub translator: &'a dyn Translator,
    pub config: &'a ConverterConfig,
    pub registry: &'a CommandRegistry,
}

/// One template expansion
pub struct Expansion<'a> {
    pub(crate) services: Services<'a>,
    pub(crate) device_id: String,
    pub(crate) options: HashMap<String, String>,
    /// Address or server class the request was made against
    pub(crate) server_address: String,
    /// Server behind `server_address`; empty for server classes
    pub(crate) server: ServerRecord,
    sources: HashMap<String, SourceEntry>,
    pub(crate) variables: HashMap<String, String>,
    pub(crate) rng: StdRng,
}

impl<'a> Expansion<'a> {
    pub fn new(
        services: Services<'a>,
        device_id: impl Into<String>,
        server_address: impl Into<String>,
        options: HashMap<String, String>,
        main: Element,
        path: impl Into<String>,
    ) -> Self {
        let device_id = device_id.into();
        let server_address = server_address.into();
        let server = server_or_empty(services.gateway, &device_id, &server_address);

        let mut sources = HashMap::new();
        sources.insert(
            MAIN_SOURCE.to_string(),
            SourceEntry {
                root: Rc::new(main),
                path: path.into(),
            },
        );

        Self {
            services,
            device_id,
            options,
            server_address,
            server,
            sources,
            variables: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Make shuffling reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The main document as a source
    pub fn main_source(&self) -> Option<Source> {
        self.sources
            .get(MAIN_SOURCE)
            .map(|entry| Source::new(entry.root.clone(), MAIN_SOURCE))
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Register `root` under `alias`, replacing an earlier registration
    pub fn register_source(&mut self, alias: impl Into<String>, root: Rc<Element>, path: impl Into<String>) {
        let alias = alias.into();
        debug!("Registering source '{}'", alias);
        self.sources.insert(alias, SourceEntry { root, path: path.into() });
    }

    pub fn has_source(&self, alias: &str) -> bool {
        self.sources.contains_key(alias)
    }

    /// Request path of the document registered under `alias`
    pub fn base_path(&self, alias: &str) -> Result<&str> {
        self.sources
            .get(alias)
            .map(|entry| entry.path.as_str())
            .ok_or_else(|| ConvertError::UnknownSource(alias.to_string()))
    }

    pub fn setting(&self, key: &str) -> String {
        self.services.settings.setting(&self.device_id, key)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    fn server_property(&self, name: &str) -> String {
        self.server.property(name).unwrap_or_default()
    }

    /// Pick the node a path starts from
    ///
    /// Returns the node, the alias it belongs to and the rest of the path.
    pub fn base<'p>(&self, src: &Source, path: &'p str) -> Result<(Source, &'p str)> {
        if let Some(redirect) = path.strip_prefix('@') {
            let (alias, rest) = redirect.split_once('/').unwrap_or((redirect, ""));
            let entry = self
                .sources
                .get(alias)
                .ok_or_else(|| ConvertError::UnknownSource(alias.to_string()))?;
            Ok((Source::new(entry.root.clone(), alias), rest))
        } else if let Some(rest) = path.strip_prefix('/') {
            let entry = self
                .sources
                .get(MAIN_SOURCE)
                .ok_or_else(|| ConvertError::UnknownSource(MAIN_SOURCE.to_string()))?;
            Ok((Source::new(entry.root.clone(), src.alias.clone()), rest))
        } else {
            Ok((src.clone(), path))
        }
    }

    /// Child of `element` selected by one path segment
    fn step<'e>(&self, element: &'e Element, segment: &str) -> Option<&'e Element> {
        if let Some(name) = segment.strip_prefix('#') {
            let tag = self.variables.get(name)?;
            find_child(element, tag)
        } else if let Some(name) = segment.strip_prefix('$') {
            find_child(element, &self.setting(name))
        } else if let Some(name) = segment.strip_prefix('%') {
            find_child(element, &self.server_property(name))
        } else {
            find_child(element, segment)
        }
    }

    /// Resolve `path[:default]`, leaving the rest of `param` unparsed
    pub fn get_key<'p>(&self, src: &Source, param: &'p str) -> Result<Key<'p>> {
        let (path, rest) = split_param(param);
        let (default, leftover) = split_param(rest);
        let (base, mut path) = self.base(src, &path)?;

        let mut element: Option<&Element> = Some(&base.node);
        while let (Some(el), Some((segment, tail))) = (element, path.split_once('/')) {
            element = self.step(el, segment);
            path = tail;
        }

        let found = if let Some(value) = path.strip_prefix('#').and_then(|name| self.variables.get(name)) {
            Some(value.clone())
        } else if let Some(name) = path.strip_prefix('$') {
            Some(self.setting(name))
        } else if let Some(name) = path.strip_prefix('%') {
            Some(self.server_property(name))
        } else if let Some(value) = path.strip_prefix('^').and_then(|name| self.options.get(name)) {
            Some(value.clone())
        } else {
            element.and_then(|el| el.attributes.get(path)).cloned()
        };

        let key = match found {
            Some(value) => Key { value, leftover, defaulted: false },
            None => Key { value: default, leftover, defaulted: true },
        };
        debug!("Key '{}' -> '{}' (defaulted: {})", param, key.value, key.defaulted);
        Ok(key)
    }

    /// Resolve `path[:default][:conversion]`; defaulted values skip the conversion
    pub fn value_of(&self, src: &Source, param: &str) -> Result<String> {
        let key = self.get_key(src, param)?;
        let (conversion, _) = split_param(key.leftover);
        let table = ConversionTable::parse(&conversion)?;
        if key.defaulted {
            Ok(key.value)
        } else {
            Ok(table.apply(&key.value))
        }
    }

    /// Follow a tag path (no sigils) to an element of the source
    ///
    /// An empty path yields the base node itself.
    pub fn get_element<'p>(&self, src: &Source, param: &'p str) -> Result<(Option<Element>, &'p str)> {
        let (path, leftover) = split_param(param);
        let (base, path) = self.base(src, &path)?;

        let mut element: Option<&Element> = Some(&base.node);
        if !path.is_empty() {
            for segment in path.split('/') {
                element = element.and_then(|el| find_child(el, segment));
            }
        }
        Ok((element.cloned(), leftover))
    }

    pub fn translate(&self, msgid: &str) -> String {
        let language = self.option("aTVLanguage").unwrap_or(DEFAULT_LANGUAGE);
        self.services.translator.translate(language, msgid)
    }

    /// Translate `msgid` and fill in its placeholders
    pub fn tr(&self, msgid: &str, args: &[FormatArg]) -> Result<String> {
        format_message(&self.translate(msgid), args)
    }
}
