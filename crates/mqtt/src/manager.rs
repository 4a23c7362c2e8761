//! High-level assembly of the MQTT machinery.
//!
//! [`MqttManager`] is the entry point: it validates configuration, builds the
//! client and event loop, spawns the [`ConnectionDriver`] on its own task and
//! hands back an [`MqttHandle`] the application uses for publishing, state
//! observation and shutdown.

use rumqttc::AsyncClient;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{
    client::ClientBuilder, config::Config, connection::ConnectionDriver, error::BrokerError,
    state::ConnectionState,
};

/// Entry point for building a broker connection.
pub struct MqttManager {
    config: Config,
    cancel: CancellationToken,
}

impl MqttManager {
    /// Creates a manager from an existing configuration.
    pub fn from_config(config: Config) -> Result<Self, BrokerError> {
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a manager with minimal settings; everything else defaults.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, BrokerError> {
        Self::from_config(Config {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Access to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clone of the token that stops the connection driver.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Builds the client, spawns the connection driver and returns a handle.
    ///
    /// The driver connects asynchronously after this returns; watch the state
    /// receiver to learn when the broker is actually reachable. Publishes
    /// issued before that are queued by rumqttc.
    ///
    /// # Errors
    ///
    /// Configuration validation and TLS loading errors from
    /// [`ClientBuilder`]; the connect itself cannot fail here.
    pub async fn build_and_start(self) -> Result<MqttHandle, BrokerError> {
        info!(
            "Connecting to broker at {}:{}...",
            self.config.host, self.config.port
        );

        let (client, event_loop) = ClientBuilder::from_config(&self.config)?.build()?;

        let mut driver = ConnectionDriver::new(client.clone(), event_loop, self.cancel.clone());
        let state_rx = driver.subscribe_state();

        tokio::spawn(async move {
            if let Err(e) = driver.run().await {
                error!("Broker connection driver exited with error: {}", e);
            }
        });

        Ok(MqttHandle {
            client,
            state_rx,
            cancel: self.cancel,
        })
    }
}

/// A live broker connection.
///
/// Cheap to clone; all clones share the same client, driver task and
/// cancellation token.
#[derive(Debug, Clone)]
pub struct MqttHandle {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl MqttHandle {
    /// The underlying client, for publishing from any task.
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    /// Receiver for connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Current connection state without subscribing.
    pub fn current_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Token that stops the connection driver when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Gracefully closes the connection.
    ///
    /// Sends a DISCONNECT packet (best effort), then stops the driver task
    /// via the cancellation token.
    pub async fn shutdown(&self) -> Result<(), BrokerError> {
        self.client.disconnect().await?;
        self.cancel.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_from_minimal_settings() {
        let manager = MqttManager::new("localhost", 1883).unwrap();
        assert_eq!(manager.config().host, "localhost");
        assert_eq!(manager.config().port, 1883);
        assert!(!manager.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn build_and_start_yields_handle() {
        let handle = MqttManager::new("localhost", 1883)
            .unwrap()
            .build_and_start()
            .await
            .unwrap();

        // Driver just spawned; no broker in tests, so the state stays at
        // Connecting or moves to Reconnecting. It must not be Connected.
        assert!(!handle.current_state().is_connected());

        handle.cancel_token().cancel();
    }

    #[tokio::test]
    async fn build_and_start_rejects_invalid_config() {
        let manager = MqttManager::from_config(Config {
            host: String::new(),
            ..Default::default()
        })
        .unwrap();
        assert!(manager.build_and_start().await.is_err());
    }
}
