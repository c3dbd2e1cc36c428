//! Error types for the media-server client

use thiserror::Error;

/// Errors that can occur while talking to a media server
#[derive(Debug, Error)]
pub enum PmsError {
    /// Network or transport failure (connection refused, timeout, ...)
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The server answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response body was not well-formed XML
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// No server is registered for the given address or class
    #[error("Unknown server: {0}")]
    UnknownServer(String),
}

/// Type alias for results returned by this crate
pub type Result<T> = std::result::Result<T, PmsError>;
