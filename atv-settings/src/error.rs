//! Error types for settings operations

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The key is not part of the option table
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// The value is not one of the options allowed for the key
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, SettingsError>;
