//! Access to media servers and their documents
//!
//! The converter never talks HTTP itself. It asks a [`ServerGateway`] to
//! resolve addresses and fetch documents, which keeps expansion testable
//! against in-memory documents.

use std::collections::HashMap;
use std::sync::Arc;

use pms_client::{ClientIdentity, PmsClient, PmsError, ServerClass, ServerDirectory, ServerRecord};
use xmltree::Element;

/// Server lookups and document fetching on behalf of one client device
pub trait ServerGateway: Send + Sync {
    /// Find the server at `address` (`ip`, `ip:port` or uuid) known to `device_id`
    fn resolve_server(&self, device_id: &str, address: &str) -> Option<ServerRecord>;

    /// Number of servers known to `device_id`
    fn server_count(&self, device_id: &str) -> usize;

    /// Servers of `class` known to `device_id`, in priority order
    fn federation(&self, device_id: &str, class: ServerClass) -> Vec<ServerRecord>;

    /// Fetch and parse `path` from `server`
    fn fetch_document(
        &self,
        device_id: &str,
        server: &ServerRecord,
        path: &str,
    ) -> pms_client::Result<Element>;
}

/// Gateway backed by a live [`PmsClient`] and a shared [`ServerDirectory`]
#[derive(Debug, Clone)]
pub struct PmsGateway {
    directory: Arc<ServerDirectory>,
    client: PmsClient,
}

impl PmsGateway {
    pub fn new(directory: Arc<ServerDirectory>, client: PmsClient) -> Self {
        Self { directory, client }
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }
}

impl ServerGateway for PmsGateway {
    fn resolve_server(&self, device_id: &str, address: &str) -> Option<ServerRecord> {
        self.directory.by_address(device_id, address)
    }

    fn server_count(&self, device_id: &str) -> usize {
        self.directory.count(device_id)
    }

    fn federation(&self, device_id: &str, class: ServerClass) -> Vec<ServerRecord> {
        self.directory.federation(device_id, class)
    }

    fn fetch_document(
        &self,
        device_id: &str,
        server: &ServerRecord,
        path: &str,
    ) -> pms_client::Result<Element> {
        self.client.fetch(
            &server.base_url,
            path,
            &ClientIdentity::new(device_id),
            &server.access_token,
        )
    }
}

/// Gateway over documents held in memory
///
/// Every device sees the same servers. Used for offline conversion and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    servers: Vec<ServerRecord>,
    /// Keyed by (server uuid, request path)
    documents: HashMap<(String, String), Element>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: ServerRecord) -> Self {
        self.add_server(server);
        self
    }

    pub fn add_server(&mut self, server: ServerRecord) {
        self.servers.retain(|existing| existing.uuid != server.uuid);
        self.servers.push(server);
    }

    pub fn with_document(mut self, server_uuid: &str, path: &str, document: Element) -> Self {
        self.add_document(server_uuid, path, document);
        self
    }

    pub fn add_document(&mut self, server_uuid: &str, path: &str, document: Element) {
        self.documents
            .insert((server_uuid.to_string(), path.to_string()), document);
    }
}

impl ServerGateway for MemoryGateway {
    fn resolve_server(&self, _device_id: &str, address: &str) -> Option<ServerRecord> {
        self.servers
            .iter()
            .find(|server| {
                server.address == address
                    || server.uuid == address
                    || format!("{}:{}", server.address, server.port) == address
            })
            .cloned()
    }

    fn server_count(&self, _device_id: &str) -> usize {
        self.servers.len()
    }

    fn federation(&self, _device_id: &str, class: ServerClass) -> Vec<ServerRecord> {
        self.servers
            .iter()
            .filter(|server| class.includes(server))
            .cloned()
            .collect()
    }

    fn fetch_document(
        &self,
        _device_id: &str,
        server: &ServerRecord,
        path: &str,
    ) -> pms_client::Result<Element> {
        self.documents
            .get(&(server.uuid.clone(), path.to_string()))
            .cloned()
            .ok_or(PmsError::Status(404))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(uuid: &str, address: &str, owned: bool) -> ServerRecord {
        ServerRecord {
            uuid: uuid.to_string(),
            name: uuid.to_string(),
            address: address.to_string(),
            port: "32400".to_string(),
            base_url: format!("http://{}:32400", address),
            owned,
            local: true,
            ..ServerRecord::default()
        }
    }

    #[test]
    fn test_memory_gateway_lookup_and_fetch() {
        let doc = Element::parse("<MediaContainer size=\"0\"/>".as_bytes()).unwrap();
        let gateway = MemoryGateway::new()
            .with_server(server("a", "10.0.0.1", true))
            .with_server(server("b", "10.0.0.2", false))
            .with_document("a", "/library/sections", doc);

        let a = gateway.resolve_server("atv", "10.0.0.1:32400").unwrap();
        assert_eq!(a.uuid, "a");
        assert!(gateway.fetch_document("atv", &a, "/library/sections").is_ok());
        assert!(matches!(
            gateway.fetch_document("atv", &a, "/missing"),
            Err(PmsError::Status(404))
        ));
        assert_eq!(gateway.server_count("atv"), 2);
        assert_eq!(gateway.federation("atv", ServerClass::Shared).len(), 1);
    }

    #[test]
    fn test_pms_gateway_uses_directory() {
        let directory = Arc::new(ServerDirectory::new());
        directory.register("atv", server("a", "10.0.0.1", true));
        let gateway = PmsGateway::new(Arc::clone(&directory), PmsClient::new());

        assert_eq!(gateway.server_count("atv"), 1);
        assert!(gateway.resolve_server("atv", "10.0.0.1").is_some());
        assert!(gateway.resolve_server("other", "10.0.0.1").is_none());
        assert_eq!(gateway.federation("atv", ServerClass::Owned).len(), 1);
    }
}
