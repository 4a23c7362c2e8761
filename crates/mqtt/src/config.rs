//! Connection configuration.
//!
//! All types here derive `serde` traits so they can be embedded in a larger
//! application configuration, and carry `validator` constraints so malformed
//! settings fail at load time rather than at connect time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Transport selection for the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain TCP, typically port 1883.
    #[default]
    Plain,
    /// TLS, typically port 8883. Requires [`Config::tls`] to be set.
    Secure,
}

/// Broker connection configuration.
///
/// Validation runs on every load; the constraints are listed on each field.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Transport to use. `Secure` requires [`Config::tls`].
    pub protocol: Protocol,

    /// Broker hostname or IP address. DNS resolution happens at connect time.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port. 1883 for plain TCP, 8883 for TLS.
    #[validate(range(min = 1, message = "Port must be non-zero"))]
    pub port: u16,

    /// Client identifier sent in CONNECT. When empty, a UUID is generated so
    /// two instances never collide on the broker.
    #[validate(length(max = 36, message = "Client id must not exceed 36 characters"))]
    pub client_id: String,

    /// Keep-alive interval in seconds. The broker drops the session if the
    /// client stays silent longer than this.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep-alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Whether the broker should discard session state on disconnect.
    pub clean_session: bool,

    /// Capacity of the local request channel; publishes beyond this queue up.
    #[validate(range(min = 1, message = "Channel capacity must be non-zero"))]
    pub request_channel_capacity: usize,

    /// TLS material, required when `protocol` is [`Protocol::Secure`].
    #[validate(nested)]
    pub tls: Option<TlsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: Protocol::Plain,
            host: "localhost".to_string(),
            port: 1883,
            client_id: String::new(),
            keep_alive: 60,
            clean_session: true,
            request_channel_capacity: 10,
            tls: None,
        }
    }
}

/// Certificate paths for TLS connections.
///
/// The CA certificate is always required. Client certificate and key are only
/// needed for mutual TLS; they must be provided together.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_client_auth_pair))]
pub struct TlsConfig {
    /// Path to the CA certificate bundle (PEM).
    #[validate(length(min = 1, message = "CA certificate path must not be empty"))]
    pub ca_cert_path: String,

    /// Path to the client certificate (PEM), for mutual TLS.
    pub client_cert_path: Option<String>,

    /// Path to the client private key (PEM, unencrypted), for mutual TLS.
    pub client_key_path: Option<String>,
}

impl TlsConfig {
    /// CA-only verification, the common case.
    pub fn with_ca_only(ca_cert_path: impl Into<String>) -> Self {
        Self {
            ca_cert_path: ca_cert_path.into(),
            client_cert_path: None,
            client_key_path: None,
        }
    }

    /// Mutual TLS with client authentication.
    pub fn with_client_auth(
        ca_cert_path: impl Into<String>,
        client_cert_path: impl Into<String>,
        client_key_path: impl Into<String>,
    ) -> Self {
        Self {
            ca_cert_path: ca_cert_path.into(),
            client_cert_path: Some(client_cert_path.into()),
            client_key_path: Some(client_key_path.into()),
        }
    }

    /// True when both client certificate and key are configured.
    pub fn has_client_auth(&self) -> bool {
        self.client_cert_path.is_some() && self.client_key_path.is_some()
    }

    /// Checks that every configured path points at an existing file.
    ///
    /// Performed at build time, not validation time, so configs can be
    /// round-tripped on machines that don't hold the certificates.
    pub fn check_paths(&self) -> Result<(), String> {
        let mut paths = vec![self.ca_cert_path.as_str()];
        if let Some(cert) = &self.client_cert_path {
            paths.push(cert);
        }
        if let Some(key) = &self.client_key_path {
            paths.push(key);
        }
        for path in paths {
            if !Path::new(path).exists() {
                return Err(format!("File does not exist: {path}"));
            }
        }
        Ok(())
    }
}

fn validate_client_auth_pair(tls: &TlsConfig) -> Result<(), ValidationError> {
    if tls.client_cert_path.is_some() != tls.client_key_path.is_some() {
        let mut err = ValidationError::new("client_auth_pair");
        err.message = Some("Client certificate and key must be provided together".into());
        return Err(err);
    }
    Ok(())
}

/// Destination of a single publish: topic, QoS and retain flag.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Endpoint {
    /// Full topic string.
    pub topic: String,
    /// Quality of service: 0, 1 or 2.
    pub qos: u8,
    /// Whether the broker should retain the message for new subscribers.
    pub retain: bool,
}
