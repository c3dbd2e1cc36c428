//! Per-device bookkeeping of known media servers
//!
//! Discovery and sign-in populate the directory elsewhere; this module only
//! stores what they found and answers lookups by address, identifier or
//! server class. Registration order is priority order.

use std::collections::HashMap;
use std::str::FromStr;

use parking_lot::RwLock;

/// Everything known about one media server, as seen from one client device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRecord {
    pub uuid: String,
    pub name: String,
    /// Network address without port
    pub address: String,
    pub port: String,
    /// Scheme, host and port, e.g. `http://192.168.1.10:32400`
    pub base_url: String,
    pub access_token: String,
    /// Server is on the same network as the client device
    pub local: bool,
    /// Server belongs to the signed-in user (as opposed to shared with them)
    pub owned: bool,
}

impl ServerRecord {
    /// Look up a server property by the name templates use for it
    ///
    /// Boolean properties render as `"1"`/`"0"`.
    pub fn property(&self, name: &str) -> Option<String> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        match name {
            "uuid" => Some(self.uuid.clone()),
            "name" => Some(self.name.clone()),
            "ip" | "address" => Some(self.address.clone()),
            "port" => Some(self.port.clone()),
            "baseURL" => Some(self.base_url.clone()),
            "accesstoken" => Some(self.access_token.clone()),
            "local" => Some(flag(self.local)),
            "owned" => Some(flag(self.owned)),
            _ => None,
        }
    }

    fn matches_address(&self, address: &str) -> bool {
        address == self.address
            || address == self.uuid
            || address == format!("{}:{}", self.address, self.port)
    }
}

/// Symbolic name for a group of servers queried together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerClass {
    /// Every server except the plex.tv directory itself
    All,
    Owned,
    Shared,
    Local,
    Remote,
}

impl ServerClass {
    pub fn name(&self) -> &'static str {
        match self {
            ServerClass::All => "all",
            ServerClass::Owned => "owned",
            ServerClass::Shared => "shared",
            ServerClass::Local => "local",
            ServerClass::Remote => "remote",
        }
    }

    /// Whether `server` belongs to this class
    pub fn includes(&self, server: &ServerRecord) -> bool {
        match self {
            ServerClass::All => server.name != "plex.tv",
            ServerClass::Owned => server.owned,
            ServerClass::Shared => !server.owned,
            ServerClass::Local => server.local,
            ServerClass::Remote => !server.local,
        }
    }
}

impl FromStr for ServerClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ServerClass::All),
            "owned" => Ok(ServerClass::Owned),
            "shared" => Ok(ServerClass::Shared),
            "local" => Ok(ServerClass::Local),
            "remote" => Ok(ServerClass::Remote),
            other => Err(format!("unknown server class '{}'", other)),
        }
    }
}

/// Returns true when `address` names a server class rather than a network address
pub fn is_class_name(address: &str) -> bool {
    address.chars().next().map_or(false, |c| c.is_alphabetic())
}

/// Thread-safe map from client device to its ordered list of servers
#[derive(Debug, Default)]
pub struct ServerDirectory {
    servers: RwLock<HashMap<String, Vec<ServerRecord>>>,
}

impl ServerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace (by uuid) a server for `device_id`
    pub fn register(&self, device_id: &str, record: ServerRecord) {
        let mut servers = self.servers.write();
        let list = servers.entry(device_id.to_string()).or_default();
        match list.iter_mut().find(|existing| existing.uuid == record.uuid) {
            Some(existing) => *existing = record,
            None => list.push(record),
        }
    }

    /// All servers known to `device_id`, in priority order
    pub fn servers(&self, device_id: &str) -> Vec<ServerRecord> {
        self.servers.read().get(device_id).cloned().unwrap_or_default()
    }

    pub fn count(&self, device_id: &str) -> usize {
        self.servers.read().get(device_id).map_or(0, Vec::len)
    }

    /// Find a server by address (`ip`, `ip:port`) or uuid
    pub fn by_address(&self, device_id: &str, address: &str) -> Option<ServerRecord> {
        self.servers
            .read()
            .get(device_id)?
            .iter()
            .find(|server| server.matches_address(address))
            .cloned()
    }

    pub fn by_uuid(&self, device_id: &str, uuid: &str) -> Option<ServerRecord> {
        self.servers
            .read()
            .get(device_id)?
            .iter()
            .find(|server| server.uuid == uuid)
            .cloned()
    }

    /// Servers of `class`, in priority order
    pub fn federation(&self, device_id: &str, class: ServerClass) -> Vec<ServerRecord> {
        self.servers(device_id)
            .into_iter()
            .filter(|server| class.includes(server))
            .collect()
    }

    /// Drop every server known to `device_id`
    pub fn clear(&self, device_id: &str) {
        self.servers.write().remove(device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(uuid: &str, address: &str, local: bool, owned: bool) -> ServerRecord {
        ServerRecord {
            uuid: uuid.to_string(),
            name: format!("server-{}", uuid),
            address: address.to_string(),
            port: "32400".to_string(),
            base_url: format!("http://{}:32400", address),
            access_token: format!("token-{}", uuid),
            local,
            owned,
        }
    }

    #[test]
    fn test_register_replaces_by_uuid() {
        let directory = ServerDirectory::new();
        directory.register("atv", server("a", "10.0.0.1", true, true));
        directory.register("atv", server("a", "10.0.0.2", true, true));

        assert_eq!(directory.count("atv"), 1);
        assert_eq!(directory.servers("atv")[0].address, "10.0.0.2");
    }

    #[test]
    fn test_clear_only_touches_one_device() {
        let directory = ServerDirectory::new();
        directory.register("atv", server("a", "10.0.0.1", true, true));
        directory.register("other", server("b", "10.0.0.2", true, true));

        directory.clear("atv");
        assert_eq!(directory.count("atv"), 0);
        assert_eq!(directory.count("other"), 1);
    }

    #[test]
    fn test_lookup_by_address_forms() {
        let directory = ServerDirectory::new();
        directory.register("atv", server("a", "10.0.0.1", true, true));

        assert!(directory.by_address("atv", "10.0.0.1").is_some());
        assert!(directory.by_address("atv", "10.0.0.1:32400").is_some());
        assert!(directory.by_address("atv", "a").is_some());
        assert_eq!(directory.by_uuid("atv", "a").map(|s| s.address).as_deref(), Some("10.0.0.1"));
        assert!(directory.by_address("atv", "10.0.0.9").is_none());
        assert!(directory.by_address("other", "10.0.0.1").is_none());
    }

    #[test]
    fn test_federation_keeps_priority_order() {
        let directory = ServerDirectory::new();
        directory.register("atv", server("a", "10.0.0.1", true, true));
        directory.register("atv", server("b", "10.0.0.2", false, false));
        directory.register("atv", server("c", "10.0.0.3", false, true));

        let owned: Vec<String> = directory
            .federation("atv", ServerClass::Owned)
            .into_iter()
            .map(|s| s.uuid)
            .collect();
        assert_eq!(owned, vec!["a", "c"]);

        let remote: Vec<String> = directory
            .federation("atv", ServerClass::Remote)
            .into_iter()
            .map(|s| s.uuid)
            .collect();
        assert_eq!(remote, vec!["b", "c"]);
    }

    #[test]
    fn test_property_names() {
        let record = server("a", "10.0.0.1", true, false);
        assert_eq!(record.property("ip").as_deref(), Some("10.0.0.1"));
        assert_eq!(record.property("baseURL").as_deref(), Some("http://10.0.0.1:32400"));
        assert_eq!(record.property("local").as_deref(), Some("1"));
        assert_eq!(record.property("owned").as_deref(), Some("0"));
        assert_eq!(record.property("nope"), None);
    }

    #[test]
    fn test_class_names() {
        assert!(is_class_name("owned"));
        assert!(!is_class_name("192.168.1.10"));
        assert!(!is_class_name(""));
        assert_eq!("shared".parse::<ServerClass>(), Ok(ServerClass::Shared));
        assert!("bogus".parse::<ServerClass>().is_err());
    }
}
