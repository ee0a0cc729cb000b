use thiserror::Error;

/// Top-level error type for the Parley system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for CoreError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Completion error: {0}")]
    Llm(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(CoreError, &str)> = vec![
            (
                CoreError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                CoreError::Llm("quota exceeded".to_string()),
                "Completion error: quota exceeded",
            ),
            (
                CoreError::Store("connection refused".to_string()),
                "Store error: connection refused",
            ),
            (
                CoreError::Session("lock poisoned".to_string()),
                "Session error: lock poisoned",
            ),
            (
                CoreError::Api("unauthorized".to_string()),
                "API error: unauthorized",
            ),
            (
                CoreError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
        assert!(core_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let err: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(err.is_err());
        let core_err: CoreError = err.unwrap_err().into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(err.is_err());
        let core_err: CoreError = err.unwrap_err().into();
        assert!(matches!(core_err, CoreError::Serialization(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(CoreError::Config("fail".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_debug_impl() {
        let err = CoreError::Store("test debug".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Store"));
        assert!(debug_str.contains("test debug"));
    }
}
