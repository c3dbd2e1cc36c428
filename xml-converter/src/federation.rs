//! One document assembled from every server of a class
//!
//! Used when a request names a server class (`owned`, `shared`, ...) instead
//! of an address. Each server contributes its top-level `Directory`,
//! `Playlist` and `Video` entries under a `Server` element; keys are marked
//! with `PMS(<ip>)` so later URLs route back to the right server.

use pms_client::{get_url, ServerClass, ServerRecord};
use tracing::{debug, warn};
use xmltree::{Element, XMLNode};

use crate::gateway::ServerGateway;
use crate::resolve::child_elements;

const AGGREGATED_TAGS: [&str; 3] = ["Directory", "Playlist", "Video"];

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn mark_key(server: &ServerRecord, path: &str, key: &str) -> String {
    if key.starts_with("http://") || key.starts_with("https://") {
        key.to_string()
    } else {
        format!("PMS({}){}", server.address, get_url("", path, key))
    }
}

fn server_element(server: &ServerRecord) -> Element {
    let mut element = Element::new("Server");
    let attrs = [
        ("name", server.name.clone()),
        ("address", server.address.clone()),
        ("port", server.port.clone()),
        ("baseURL", server.base_url.clone()),
        ("local", flag(server.local).to_string()),
        ("owned", flag(server.owned).to_string()),
        ("searchKey", format!("PMS({})/Search/Entry.xml", server.address)),
    ];
    for (name, value) in attrs {
        element.attributes.insert(name.to_string(), value);
    }
    element
}

/// Fetch `path` from every server of `class` and merge the results
///
/// A server that fails to answer contributes an empty `Server` entry
/// (`size="0"`); it never fails the whole aggregation.
pub fn aggregate(gateway: &dyn ServerGateway, device_id: &str, class: ServerClass, path: &str) -> Element {
    let servers = gateway.federation(device_id, class);
    debug!("Aggregating {} from {} {} servers", path, servers.len(), class.name());

    let mut root = Element::new("MediaConverter");
    root.attributes
        .insert("friendlyName".to_string(), format!("{} Servers", class.name()));

    for server in &servers {
        let mut entry = server_element(server);
        let mut size = 0;

        match gateway.fetch_document(device_id, server, path) {
            Ok(document) => {
                for item in child_elements(&document).filter(|el| AGGREGATED_TAGS.contains(&el.name.as_str())) {
                    let mut item = item.clone();
                    let mut keys = vec!["key", "thumb", "art"];
                    if item.name == "Directory" {
                        keys.push("refreshKey");
                    }
                    for name in keys {
                        if let Some(value) = item.attributes.get(name).cloned() {
                            item.attributes.insert(name.to_string(), mark_key(server, path, &value));
                        }
                    }
                    entry.children.push(XMLNode::Element(item));
                    size += 1;
                }
            }
            Err(e) => warn!("Server {} ({}) did not answer {}: {}", server.name, server.address, path, e),
        }

        entry.attributes.insert("size".to_string(), size.to_string());
        root.children.push(XMLNode::Element(entry));
    }

    root.attributes
        .insert("size".to_string(), servers.len().to_string());
    root
}
