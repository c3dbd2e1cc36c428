//! Per-device settings and device identity for plexconnect
//!
//! Every client device has its own set of view and playback settings. This
//! crate stores them in memory, validates them against a fixed option table
//! and maps device addresses back to device identifiers.
//!
//! ```rust
//! use atv_settings::{AtvSettings, SettingsStore};
//!
//! let settings = AtvSettings::new();
//! assert_eq!(settings.setting("udid", "transcoderaction"), "Auto");
//! settings.toggle_setting("udid", "transcoderaction")?;
//! assert_eq!(settings.setting("udid", "transcoderaction"), "DirectPlay");
//! # Ok::<(), atv_settings::SettingsError>(())
//! ```

mod devices;
mod error;
pub mod options;
mod store;

pub use devices::DeviceRegistry;
pub use error::{Result, SettingsError};
pub use options::SettingKind;
pub use store::{AtvSettings, SettingsStore, Snapshot};
