//! JSON message publishing.
//!
//! [`Publisher`] is the high-level write path: it serializes any
//! `serde`-serializable value to JSON, maps the numeric QoS onto rumqttc's
//! enum and hands the payload to the shared client. Publishing is
//! fire-and-forget from the caller's perspective; delivery and reconnection
//! are the connection driver's concern.

use std::sync::Arc;

use rumqttc::QoS;
use serde::Serialize;
use tracing::debug;

use super::{config::Endpoint, error::BrokerError, manager::MqttHandle};

/// High-level publishing interface.
///
/// Clones share the underlying handle, so a publisher can be handed to any
/// number of tasks.
#[derive(Debug, Clone)]
pub struct Publisher {
    handle: Arc<MqttHandle>,
}

impl Publisher {
    /// Creates a publisher over an active broker handle.
    pub fn new(handle: Arc<MqttHandle>) -> Self {
        Self { handle }
    }

    /// Publishes a value to the endpoint's topic.
    ///
    /// The value is serialized to JSON. Errors cover serialization failures,
    /// an out-of-range QoS and a closed client channel; they never cover
    /// broker-side delivery, which this crate does not track.
    pub async fn publish<T: Serialize + Send + Sync>(
        &self,
        data: T,
        endpoint: &Endpoint,
    ) -> Result<(), BrokerError> {
        let payload =
            serde_json::to_vec(&data).map_err(|e| BrokerError::Serialization(e.to_string()))?;

        let qos = map_qos(endpoint.qos)?;

        debug!(
            "Publishing {} bytes to topic '{}' (qos {})",
            payload.len(),
            endpoint.topic,
            endpoint.qos,
        );

        self.handle
            .client()
            .publish(endpoint.topic.as_str(), qos, endpoint.retain, payload)
            .await?;

        Ok(())
    }

    /// Convenience wrapper around [`publish`](Publisher::publish) for callers
    /// that don't keep [`Endpoint`] values around.
    pub async fn publish_to<T: Serialize + Send + Sync>(
        &self,
        topic: &str,
        data: T,
        qos: u8,
        retain: bool,
    ) -> Result<(), BrokerError> {
        let endpoint = Endpoint {
            topic: topic.to_string(),
            qos,
            retain,
        };
        self.publish(data, &endpoint).await
    }
}

fn map_qos(qos: u8) -> Result<QoS, BrokerError> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BrokerError::InvalidEndpoint(format!(
            "Invalid QoS value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, MqttManager};

    async fn test_publisher() -> Publisher {
        let handle = MqttManager::from_config(Config::default())
            .unwrap()
            .build_and_start()
            .await
            .unwrap();
        Publisher::new(Arc::new(handle))
    }

    #[test]
    fn qos_mapping() {
        assert!(matches!(map_qos(0), Ok(QoS::AtMostOnce)));
        assert!(matches!(map_qos(1), Ok(QoS::AtLeastOnce)));
        assert!(matches!(map_qos(2), Ok(QoS::ExactlyOnce)));
        assert!(matches!(map_qos(3), Err(BrokerError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn invalid_qos_rejected_before_sending() {
        let publisher = test_publisher().await;
        let result = publisher
            .publish_to("test/topic", &serde_json::json!({"v": 1}), 7, false)
            .await;
        assert!(matches!(result, Err(BrokerError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn queues_publish_without_broker() {
        // No broker is running; rumqttc queues the request locally, so the
        // call itself succeeds.
        let publisher = test_publisher().await;
        let result = publisher
            .publish_to("test/topic", &serde_json::json!({"v": 1}), 0, false)
            .await;
        assert!(result.is_ok());
    }
}
