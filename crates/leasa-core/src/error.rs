use thiserror::Error;

/// Top-level error type for the Leasa system.
///
/// Subsystem crates define their own error types and convert into
/// `LeasaError` where a failure has to cross a crate boundary (startup,
/// storage, the HTTP surface).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeasaError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LeasaError {
    fn from(err: toml::de::Error) -> Self {
        LeasaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LeasaError {
    fn from(err: toml::ser::Error) -> Self {
        LeasaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LeasaError {
    fn from(err: serde_json::Error) -> Self {
        LeasaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Leasa operations.
pub type Result<T> = std::result::Result<T, LeasaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LeasaError::Config("GEMINI_API_KEY is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: GEMINI_API_KEY is not set"
        );

        let err = LeasaError::Validation("address must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: address must not be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LeasaError = io_err.into();
        assert!(matches!(err, LeasaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let err: LeasaError = toml_err.into();
        assert!(matches!(err, LeasaError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad json}").unwrap_err();
        let err: LeasaError = json_err.into();
        assert!(matches!(err, LeasaError::Serialization(_)));
    }
}
