//! Error types for the telemetry core

use std::fmt;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug)]
pub enum TelemetryError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// A service probe could not be completed
    Probe(String),

    /// An upstream API answered with a non-success status
    Upstream(String),

    /// A file listing could not be fetched
    Listing(String),

    /// Identifier that does not name a tracked service
    UnknownService(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Io(err) => write!(f, "IO error: {}", err),
            TelemetryError::Http(err) => write!(f, "HTTP error: {}", err),
            TelemetryError::Json(err) => write!(f, "JSON error: {}", err),
            TelemetryError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TelemetryError::Probe(msg) => write!(f, "Probe error: {}", msg),
            TelemetryError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            TelemetryError::Listing(msg) => write!(f, "Listing error: {}", msg),
            TelemetryError::UnknownService(id) => write!(f, "Unknown service id: {}", id),
            TelemetryError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Io(err) => Some(err),
            TelemetryError::Http(err) => Some(err),
            TelemetryError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::Io(err)
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Http(err)
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_messages() {
        let err = TelemetryError::UnknownService("ipfs".to_string());
        assert_eq!(err.to_string(), "Unknown service id: ipfs");

        let err = TelemetryError::Listing("status 503".to_string());
        assert_eq!(err.to_string(), "Listing error: status 503");

        let err = TelemetryError::Upstream("unexpected response 502".to_string());
        assert_eq!(err.to_string(), "Upstream error: unexpected response 502");
    }

    #[test]
    fn test_json_error_has_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TelemetryError::from(json_err);
        assert!(err.source().is_some());
        assert!(TelemetryError::Config("x".to_string()).source().is_none());
    }
}
