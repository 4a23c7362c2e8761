//! MQTT client construction.
//!
//! [`ClientBuilder`] turns a validated [`Config`] into a rumqttc
//! `AsyncClient` / `EventLoop` pair. The two must be used together: the client
//! queues commands, the event loop pumps them over the network. The builder
//! also resolves the transport, loading TLS material from disk when the
//! configuration asks for a secure connection.

use std::{fs, time::Duration};

use rumqttc::{AsyncClient, EventLoop, MqttOptions, TlsConfiguration, Transport};

use super::{
    config::{Config, Protocol, TlsConfig},
    error::BrokerError,
};

/// Fluent builder for the MQTT client.
///
/// Consumed by [`build`](ClientBuilder::build); the returned `AsyncClient` is
/// cheap to clone and thread-safe, while the `EventLoop` must be driven from a
/// single task.
pub struct ClientBuilder {
    opts: MqttOptions,
    cap: usize,
    tls: Option<TlsConfig>,
}

impl ClientBuilder {
    /// Creates a builder with minimal settings and a plain TCP transport.
    pub fn new(
        client_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        cap: usize,
    ) -> Self {
        Self {
            opts: MqttOptions::new(client_id, host, port),
            cap,
            tls: None,
        }
    }

    /// Creates a builder from a full [`Config`].
    ///
    /// The configuration is validated first, so an invalid host or port range
    /// is reported here rather than at connect time. An empty `client_id`
    /// gets a generated UUID; brokers drop the older session when two clients
    /// share an id.
    ///
    /// # Errors
    ///
    /// [`BrokerError::Config`] when validation fails;
    /// [`BrokerError::ClientSetup`] when `Secure` is requested without TLS
    /// material.
    pub fn from_config(config: &Config) -> Result<Self, BrokerError> {
        use validator::Validate;
        config.validate()?;

        let client_id = if config.client_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        let mut opts = MqttOptions::new(client_id, config.host.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(config.keep_alive));
        opts.set_clean_session(config.clean_session);

        let tls = match config.protocol {
            Protocol::Plain => None,
            Protocol::Secure => Some(config.tls.clone().ok_or_else(|| {
                BrokerError::ClientSetup(
                    "Secure protocol requires TLS configuration (CA certificate)".into(),
                )
            })?),
        };

        Ok(Self {
            opts,
            cap: config.request_channel_capacity,
            tls,
        })
    }

    /// Sets the keep-alive interval in seconds.
    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    /// Sets broker authentication credentials.
    ///
    /// Sent in the CONNECT packet; pair with TLS in production.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.set_credentials(username, password);
        self
    }

    /// Enables TLS with the given certificate material.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Loads certificate files and assembles the TLS transport.
    fn build_tls_transport(tls: &TlsConfig) -> Result<Transport, BrokerError> {
        tls.check_paths()
            .map_err(|e| BrokerError::ClientSetup(format!("Invalid TLS configuration: {e}")))?;

        let ca = fs::read(&tls.ca_cert_path)?;
        let client_auth = if tls.has_client_auth() {
            // check_paths verified both are present
            let cert = fs::read(tls.client_cert_path.as_ref().unwrap())?;
            let key = fs::read(tls.client_key_path.as_ref().unwrap())?;
            Some((cert, key))
        } else {
            None
        };

        Ok(Transport::Tls(TlsConfiguration::Simple {
            ca,
            client_auth,
            alpn: None,
        }))
    }

    /// Constructs the client and its event loop, consuming the builder.
    ///
    /// # Errors
    ///
    /// Fails only when TLS material is configured but cannot be loaded.
    pub fn build(self) -> Result<(AsyncClient, EventLoop), BrokerError> {
        let transport = match &self.tls {
            Some(tls) => Self::build_tls_transport(tls)?,
            None => Transport::Tcp,
        };

        let mut opts = self.opts;
        opts.set_transport(transport);

        Ok(AsyncClient::new(opts, self.cap))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::TempDir;

    use super::*;

    /// Dummy certificate files that disappear with the TempDir.
    struct CertFiles {
        _dir: TempDir,
        ca: String,
        cert: String,
        key: String,
    }

    impl CertFiles {
        fn create() -> std::io::Result<Self> {
            let dir = TempDir::new()?;
            let ca = dir.path().join("ca.pem");
            let cert = dir.path().join("client.crt");
            let key = dir.path().join("client.key");

            File::create(&ca)?.write_all(b"ca certificate content")?;
            File::create(&cert)?.write_all(b"client certificate content")?;
            File::create(&key)?.write_all(b"client key content")?;

            Ok(Self {
                _dir: dir,
                ca: ca.to_string_lossy().into_owned(),
                cert: cert.to_string_lossy().into_owned(),
                key: key.to_string_lossy().into_owned(),
            })
        }
    }

    #[test]
    fn builds_plain_tcp_client() {
        let result = ClientBuilder::new("test_client", "localhost", 1883, 10).build();
        assert!(result.is_ok());
    }

    #[test]
    fn from_config_defaults() {
        let config = Config::default();
        let builder = ClientBuilder::from_config(&config).unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn from_config_rejects_invalid_host() {
        let config = Config {
            host: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            ClientBuilder::from_config(&config),
            Err(BrokerError::Config(_))
        ));
    }

    #[test]
    fn secure_without_tls_rejected() {
        let config = Config {
            protocol: Protocol::Secure,
            ..Default::default()
        };
        assert!(matches!(
            ClientBuilder::from_config(&config),
            Err(BrokerError::ClientSetup(_))
        ));
    }

    #[test]
    fn secure_with_ca_builds() {
        let certs = CertFiles::create().unwrap();
        let config = Config {
            protocol: Protocol::Secure,
            port: 8883,
            tls: Some(TlsConfig::with_ca_only(&certs.ca)),
            ..Default::default()
        };
        let result = ClientBuilder::from_config(&config).unwrap().build();
        assert!(result.is_ok());
    }

    #[test]
    fn secure_with_client_auth_builds() {
        let certs = CertFiles::create().unwrap();
        let result = ClientBuilder::new("test_client", "localhost", 8883, 10)
            .tls(TlsConfig::with_client_auth(&certs.ca, &certs.cert, &certs.key))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn missing_ca_file_fails_at_build() {
        let result = ClientBuilder::new("test_client", "localhost", 8883, 10)
            .tls(TlsConfig::with_ca_only("/nonexistent/ca.pem"))
            .build();
        assert!(matches!(result, Err(BrokerError::ClientSetup(_))));
    }
}
