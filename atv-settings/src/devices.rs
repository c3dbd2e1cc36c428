//! Mapping between client device identifiers and network addresses

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

/// Known client devices, keyed by UDID
///
/// A device announces its UDID together with the address it connects from;
/// later requests that only carry the address are mapped back to the UDID.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    by_udid: RwLock<HashMap<String, String>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `udid` is currently reachable at `ip`
    ///
    /// The most recent declaration wins, both for the UDID and for the address.
    pub fn declare(&self, udid: &str, ip: &str) {
        let mut by_udid = self.by_udid.write();
        by_udid.retain(|known, known_ip| known == udid || known_ip != ip);
        by_udid.insert(udid.to_string(), ip.to_string());
        debug!(udid, ip, "Device declared");
    }

    pub fn udid_for_ip(&self, ip: &str) -> Option<String> {
        self.by_udid
            .read()
            .iter()
            .find(|(_, known_ip)| known_ip.as_str() == ip)
            .map(|(udid, _)| udid.clone())
    }

    pub fn ip_for(&self, udid: &str) -> Option<String> {
        self.by_udid.read().get(udid).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_udid.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_udid.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_declare_and_lookup() {
        let registry = DeviceRegistry::new();
        registry.declare("udid-1", "192.168.1.50");

        assert_eq!(registry.udid_for_ip("192.168.1.50").as_deref(), Some("udid-1"));
        assert_eq!(registry.ip_for("udid-1").as_deref(), Some("192.168.1.50"));
        assert_eq!(registry.udid_for_ip("192.168.1.51"), None);
    }

    #[test]
    fn test_address_moves_to_latest_device() {
        let registry = DeviceRegistry::new();
        registry.declare("udid-1", "192.168.1.50");
        registry.declare("udid-2", "192.168.1.50");

        assert_eq!(registry.udid_for_ip("192.168.1.50").as_deref(), Some("udid-2"));
        assert_eq!(registry.ip_for("udid-1"), None);
        assert_eq!(registry.len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_every_address_maps_to_one_device(
            declarations in prop::collection::vec((0u8..6, 0u8..6), 1..40)
        ) {
            let registry = DeviceRegistry::new();
            for (udid, ip) in &declarations {
                registry.declare(&format!("udid-{}", udid), &format!("10.0.0.{}", ip));
            }

            let (last_udid, last_ip) = declarations.last().unwrap();
            let ip = format!("10.0.0.{}", last_ip);
            prop_assert_eq!(registry.udid_for_ip(&ip), Some(format!("udid-{}", last_udid)));
            prop_assert!(registry.len() <= 6);
        }
    }
}
