use pms_client::PmsError;
use thiserror::Error;

/// Errors raised while expanding a template
///
/// Only [`ConvertError::Fetch`] aborts an expansion pass. Every other variant
/// raised by a command handler is logged and replaced by an inline marker (value
/// commands) or ignored (structural commands).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A media-server document could not be fetched or parsed
    ///
    /// Raised for the primary document, for `ADDXML` sources and for indirect
    /// media descriptors. Aborts the whole conversion.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] PmsError),

    /// A path referenced a source alias that no `ADDXML` or `COPY` registered
    #[error("Unknown source alias: {0}")]
    UnknownSource(String),

    /// A conversion table entry without `=`
    #[error("Malformed conversion entry: '{0}'")]
    MalformedConversion(String),

    /// A value that had to be an integer was not
    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),

    /// Arithmetic expression or format specifier could not be evaluated
    #[error("Expression error: {0}")]
    Expression(String),

    /// Quality label not present in the tier table
    #[error("Unknown quality tier: '{0}'")]
    UnknownQuality(String),

    /// Template missing or not well-formed
    #[error("Template error: {0}")]
    Template(String),

    /// Expanded template could not be written back to XML
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// The request carried neither a device id nor a known device address
    #[error("Unidentified client device")]
    UnidentifiedDevice,
}

impl ConvertError {
    /// Errors that must abort the pass instead of being reported inline
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConvertError::Fetch(_))
    }
}

/// Type alias for results that can return a ConvertError
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fetch_is_fatal() {
        assert!(ConvertError::Fetch(PmsError::Status(500)).is_fatal());
        assert!(!ConvertError::UnknownSource("x".to_string()).is_fatal());
        assert!(!ConvertError::InvalidNumber("abc".to_string()).is_fatal());
    }

    #[test]
    fn test_pms_error_converts() {
        let err: ConvertError = PmsError::Network("refused".to_string()).into();
        assert!(matches!(err, ConvertError::Fetch(PmsError::Network(_))));
        assert_eq!(err.to_string(), "Fetch failed: Network/HTTP error: refused");
    }
}
