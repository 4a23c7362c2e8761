//! # brewbee-mqtt: publish-oriented MQTT client with automatic reconnection
//!
//! A small async MQTT client library built on top of `rumqttc`, focused on the
//! needs of long-running telemetry publishers:
//!
//! - **Automatic reconnection** with exponential backoff
//! - **Connection state observation** through a watch channel
//! - **JSON publishing** of any `serde`-serializable value
//! - **TLS** with optional client certificate authentication
//! - **Typed errors** that separate fatal setup problems from transient
//!   network conditions
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use brewbee_mqtt::{Config, MqttManager, Publisher};
//!
//! #[tokio::main]
//! async fn main() -> brewbee_mqtt::Result<()> {
//!     let config = Config {
//!         host: "mqtt.example.com".into(),
//!         port: 1883,
//!         ..Default::default()
//!     };
//!
//!     let handle = MqttManager::from_config(config)?.build_and_start().await?;
//!     let publisher = Publisher::new(Arc::new(handle.clone()));
//!
//!     publisher
//!         .publish_to("sensors/fermenter", &serde_json::json!({"temp": 19.5}), 0, false)
//!         .await?;
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Application
//!     ↓ publishes through
//! Publisher (JSON serialization, QoS mapping)
//!     ↓ uses
//! MqttHandle (client + cancel token + state receiver)
//!     ↑ produced by
//! MqttManager::build_and_start()
//!     ↓ spawns
//! ConnectionDriver (event loop, error classification, backoff)
//!     ↓ drives
//! rumqttc AsyncClient & EventLoop
//! ```
//!
//! The driver runs on its own tokio task and reconnects on transient errors.
//! Fatal conditions (bad credentials, broken TLS setup) stop it and are logged;
//! the application observes the outcome through [`ConnectionState`].
//!
//! # Connection lifecycle
//!
//! ```text
//! Connecting ──(CONNACK)──► Connected
//!                              │ (network error)
//!                              ▼
//!                        Disconnected
//!                              │ (apply backoff)
//!                              ▼
//!                       Reconnecting(secs) ──► Connecting ──► ...
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod publisher;
pub mod state;

pub use backoff::Backoff;
pub use client::ClientBuilder;
pub use config::{Config, Endpoint, Protocol, TlsConfig};
pub use connection::ConnectionDriver;
pub use error::BrokerError;
pub use manager::{MqttHandle, MqttManager};
pub use publisher::Publisher;
pub use state::ConnectionState;

/// Result type for broker operations.
///
/// All fallible operations in this crate return this alias for
/// `std::result::Result<T, BrokerError>`.
pub type Result<T> = std::result::Result<T, BrokerError>;
