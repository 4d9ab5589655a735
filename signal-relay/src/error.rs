//! Error types for signal-relay.
//!
//! Per-connection failures (malformed frames, dead sockets, unreachable
//! destinations) are recovered locally and never surface here; these types
//! cover the startup/run path only. No error is ever fatal once the server
//! is accepting connections.

/// Main error type for signal-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn config_errors_convert_and_display() {
        let source = Config::from_file(std::path::Path::new("/nonexistent/signal.toml"))
            .unwrap_err();
        let err = RelayError::from(source);
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().starts_with("configuration error"));
    }
}
