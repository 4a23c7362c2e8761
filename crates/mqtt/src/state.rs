//! Observable connection state.
//!
//! The connection driver broadcasts [`ConnectionState`] over a watch channel
//! so applications can react to connectivity changes without polling the
//! event loop themselves.

use std::fmt;

/// Current state of the broker connection.
///
/// The lifecycle flows `Connecting -> Connected`, and on failure
/// `Connected -> Disconnected -> Reconnecting -> Connecting -> ...` until the
/// backoff schedule is exhausted or shutdown is requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// CONNECT sent, waiting for CONNACK. Publishes will be queued.
    Connecting,

    /// Handshake complete, keep-alive active. Normal operating state.
    Connected,

    /// Connection lost. The payload carries the reason (broker disconnect,
    /// network error, exhausted retries).
    Disconnected(String),

    /// Waiting out the backoff delay before the next attempt. The payload is
    /// the delay in seconds.
    Reconnecting(f64),
}

impl ConnectionState {
    /// Short static identifier, suitable for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
        }
    }

    /// Contextual details: the disconnect reason or the reconnect delay.
    /// Empty for `Connecting` and `Connected`.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Connecting | ConnectionState::Connected => String::new(),
            ConnectionState::Disconnected(reason) => reason.clone(),
            ConnectionState::Reconnecting(seconds) => format!("in {seconds:.1} seconds"),
        }
    }

    /// True only in `Connected`; the only state where publishes go out
    /// immediately.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// True while an attempt is underway or scheduled.
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting(_)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_names() {
        assert_eq!(ConnectionState::Connecting.as_str(), "Connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(
            ConnectionState::Disconnected("x".into()).as_str(),
            "Disconnected"
        );
        assert_eq!(ConnectionState::Reconnecting(1.0).as_str(), "Reconnecting");
    }

    #[test]
    fn details_contents() {
        assert_eq!(ConnectionState::Connected.details(), "");
        assert_eq!(
            ConnectionState::Disconnected("network error".into()).details(),
            "network error"
        );
        assert_eq!(
            ConnectionState::Reconnecting(3.5).details(),
            "in 3.5 seconds"
        );
    }

    #[test]
    fn display_with_details() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Disconnected("broker closed".into()).to_string(),
            "Disconnected (broker closed)"
        );
    }

    #[test]
    fn connectivity_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connecting.is_connecting());
        assert!(ConnectionState::Reconnecting(1.0).is_connecting());
        assert!(!ConnectionState::Disconnected("e".into()).is_connecting());
    }
}
