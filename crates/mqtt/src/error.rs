//! Unified error type for broker operations.
//!
//! [`BrokerError`] aggregates the failure modes of this crate: configuration
//! and setup problems that should be caught at startup, serialization problems
//! caused by user data, and runtime connectivity errors coming out of
//! `rumqttc`. Callers can pattern-match on the variant to decide whether an
//! error is worth retrying; setup and configuration variants never are.

use thiserror::Error;

/// The unified error type for broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// An endpoint carried an out-of-range value, e.g. a QoS other than 0-2.
    ///
    /// This is a programming error. Catch it in tests, not in production.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Payload serialization to JSON failed.
    ///
    /// Not retryable: the data itself is the problem.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client construction failed (missing TLS material, malformed options).
    ///
    /// The application won't be able to connect; fail fast at startup.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Configuration validation failed.
    ///
    /// Produced by the `validator` constraints on [`crate::Config`]. The
    /// message names the offending field and constraint.
    #[error("Configuration error: {0}")]
    Config(#[from] validator::ValidationErrors),

    /// The local client could not queue a packet.
    ///
    /// Usually means the event loop is shutting down or the request channel
    /// is full.
    #[error("Client transfer error: {0}")]
    Transfer(#[from] rumqttc::ClientError),

    /// The connection to the broker failed or was lost.
    ///
    /// Boxed because `rumqttc::ConnectionError` is large. The connection
    /// driver retries these automatically unless they classify as fatal.
    #[error("Connection error: {0}")]
    Connection(#[from] Box<rumqttc::ConnectionError>),

    /// The reconnect backoff schedule was exhausted.
    ///
    /// Indicates a sustained outage rather than a transient glitch.
    #[error("Retry policy error: {0}")]
    Retries(#[from] super::backoff::BackoffError),

    /// File I/O failed, typically while loading TLS certificates.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Boxes the connection error so the `?` operator works without callers
// wrapping it themselves.
impl From<rumqttc::ConnectionError> for BrokerError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        BrokerError::Connection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_endpoint() {
        let err = BrokerError::InvalidEndpoint("QoS must be 0-2".into());
        assert_eq!(err.to_string(), "Invalid endpoint: QoS must be 0-2");
    }

    #[test]
    fn display_client_setup() {
        let err = BrokerError::ClientSetup("CA certificate not found".into());
        assert!(err.to_string().contains("CA certificate not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BrokerError = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn is_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(BrokerError::Serialization("bad payload".into()));
        assert_eq!(err.to_string(), "Serialization error: bad payload");
    }
}
