//! Per-device settings storage
//!
//! This module provides:
//! - `SettingsStore`: the read/write interface the converter depends on
//! - `AtvSettings`: an in-memory implementation backed by the option table
//! - `Snapshot`: a serializable copy of every device's overrides

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SettingsError};
use crate::options::{self, SettingKind};

/// Read/write access to per-device settings
///
/// Implementations must be shareable across request threads.
pub trait SettingsStore: Send + Sync {
    /// Current value of `key` for `device`
    ///
    /// Unknown keys read as an empty string; unset keys read as their default.
    fn setting(&self, device: &str, key: &str) -> String;

    /// Overwrite `key` for `device`
    fn set_setting(&self, device: &str, key: &str, value: &str) -> Result<()>;

    /// Advance `key` for `device` to its next option, returning the new value
    fn toggle_setting(&self, device: &str, key: &str) -> Result<String>;
}

/// Exported settings of every known device
///
/// Only values that were explicitly set are included; defaults come from the
/// option table at read time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub devices: BTreeMap<String, BTreeMap<String, String>>,
}

/// In-memory settings for all client devices
#[derive(Debug, Default)]
pub struct AtvSettings {
    devices: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl AtvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-filled from `snapshot`
    ///
    /// Unknown keys and out-of-range values are skipped with a warning.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.import(snapshot);
        store
    }

    /// Copy every explicitly set value into a `Snapshot`
    pub fn export(&self) -> Snapshot {
        let devices = self
            .devices
            .read()
            .iter()
            .map(|(device, values)| {
                let values = values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<BTreeMap<_, _>>();
                (device.clone(), values)
            })
            .collect();
        Snapshot { devices }
    }

    /// Merge `snapshot` into the store, overwriting existing values
    pub fn import(&self, snapshot: Snapshot) {
        for (device, values) in snapshot.devices {
            for (key, value) in values {
                if let Err(e) = self.set_setting(&device, &key, &value) {
                    warn!(device = %device, "Skipping imported setting: {}", e);
                }
            }
        }
    }

    /// Number of devices with at least one explicit setting
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    fn lookup(key: &str) -> Result<SettingKind> {
        options::kind(key).ok_or_else(|| SettingsError::UnknownSetting(key.to_string()))
    }
}

impl SettingsStore for AtvSettings {
    fn setting(&self, device: &str, key: &str) -> String {
        let Some(kind) = options::kind(key) else {
            return String::new();
        };
        self.devices
            .read()
            .get(device)
            .and_then(|values| values.get(key))
            .cloned()
            .unwrap_or_else(|| kind.default_value().to_string())
    }

    fn set_setting(&self, device: &str, key: &str, value: &str) -> Result<()> {
        let kind = Self::lookup(key)?;
        if !kind.allows(value) {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        debug!(device, key, value, "Setting updated");
        self.devices
            .write()
            .entry(device.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn toggle_setting(&self, device: &str, key: &str) -> Result<String> {
        let kind = Self::lookup(key)?;

        // Read and write under one lock so concurrent toggles never skip an option
        let mut devices = self.devices.write();
        let values = devices.entry(device.to_string()).or_default();
        let current = values
            .get(key)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_value());
        let next = kind.next(current);
        values.insert(key.to_string(), next.clone());

        debug!(device, key, value = %next, "Setting toggled");
        Ok(next)
    }
}
