//! Converter configuration

use std::path::PathBuf;

use thiserror::Error;

/// Default bitrate cap for direct audio playback, in kbps
pub const DEFAULT_MAX_AUDIO_BITRATE: u32 = 384;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings shared by every conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Public address of the bridge, prefixed to `URL` results
    pub base_url: String,
    /// Directory holding the `*.xml` templates
    pub template_dir: PathBuf,
    /// Direct-play limit for audio tracks, in kbps
    pub max_audio_bitrate: u32,
    /// Target size for image transcoding when a template gives none
    pub default_image_size: (u32, u32),
    /// Reported as `X-Plex-Version` in transcode requests
    pub client_version: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://trailers.apple.com".to_string(),
            template_dir: PathBuf::from("assets/templates"),
            max_audio_bitrate: DEFAULT_MAX_AUDIO_BITRATE,
            default_image_size: (1920, 1080),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ConverterConfig {
    /// Defaults overridden by `PLEXCONNECT_BASE_URL`,
    /// `PLEXCONNECT_TEMPLATE_DIR` and `PLEXCONNECT_MAX_AUDIO_BITRATE`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("PLEXCONNECT_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup("PLEXCONNECT_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(bitrate) = lookup("PLEXCONNECT_MAX_AUDIO_BITRATE") {
            config.max_audio_bitrate =
                bitrate.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    var: "PLEXCONNECT_MAX_AUDIO_BITRATE",
                    value: bitrate.clone(),
                })?;
        }

        Ok(config)
    }
}
