//! Periodic telemetry publishing loop.
//!
//! The [`Emitter`] publishes one service heartbeat and one synthetic
//! temperature sample per interval until cancelled. The temperature follows
//! an unclamped random walk: each iteration adds a uniform step from
//! [-5, +5] °C, so the value drifts freely over long runs.

use std::sync::Arc;

use erased_serde::Serialize;
use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::message::{SampleMessage, StateMessage};
use crate::config::ServiceConfig;

/// Temperature the random walk starts from, in °C.
pub const INITIAL_VALUE: f64 = 20.0;

/// Half-width of the uniform step distribution, in °C.
const STEP_RANGE: f64 = 5.0;

/// Trait for publishers that can deliver a payload to a topic.
///
/// The loop treats publishing as fire-and-forget; delivery, retries and
/// reconnection are entirely the implementation's concern.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes serialized data to the given topic.
    async fn publish(
        &self,
        topic: &str,
        payload: &(dyn Serialize + Send + Sync),
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Source of random-walk increments. Seam for deterministic tests.
pub trait StepSource: Send {
    /// Next increment to add to the walk.
    fn next_step(&mut self) -> f64;
}

/// Production step source: uniform draws from [-5, +5].
#[derive(Debug, Default)]
pub struct UniformStep;

impl StepSource for UniformStep {
    fn next_step(&mut self) -> f64 {
        rand::thread_rng().gen_range(-STEP_RANGE..=STEP_RANGE)
    }
}

/// Periodic publisher of heartbeat and history messages.
pub struct Emitter {
    config: Arc<ServiceConfig>,
    publisher: Arc<dyn Publisher>,
    steps: Box<dyn StepSource>,
}

impl Emitter {
    /// Creates an emitter with the production random walk.
    pub fn new(config: Arc<ServiceConfig>, publisher: Arc<dyn Publisher>) -> Self {
        Self::with_steps(config, publisher, Box::new(UniformStep))
    }

    /// Creates an emitter with an explicit step source.
    pub fn with_steps(
        config: Arc<ServiceConfig>,
        publisher: Arc<dyn Publisher>,
        steps: Box<dyn StepSource>,
    ) -> Self {
        Self {
            config,
            publisher,
            steps,
        }
    }

    /// Runs the publish loop until the token is cancelled.
    ///
    /// Each iteration sleeps for the configured interval — the loop's only
    /// suspension point, so cancellation takes effect within one interval —
    /// then publishes the heartbeat followed by the sample. Publish failures
    /// are logged and never retried here. Cancellation mid-sleep ends the
    /// loop without a final publish.
    pub async fn run(mut self, cancel: CancellationToken) {
        let state_topic = format!("{}/state/{}", self.config.topic_prefix, self.config.name);
        let history_topic = format!("{}/history/{}", self.config.topic_prefix, self.config.name);
        let interval = self.config.publish_interval;

        let mut value = INITIAL_VALUE;

        info!(
            "Telemetry loop started (interval: {:.1}s)",
            interval.as_secs_f64()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(interval) => {}
            }

            value += self.steps.next_step();

            let heartbeat = StateMessage::new(&self.config.name);
            if let Err(e) = self.publisher.publish(&state_topic, &heartbeat).await {
                error!("Failed to publish heartbeat: {}", e);
            }

            let sample = SampleMessage::new(&self.config.name, value);
            match self.publisher.publish(&history_topic, &sample).await {
                Ok(()) => info!("Sent {:?}", sample),
                Err(e) => error!("Failed to publish sample: {}", e),
            }
        }

        info!("Telemetry loop stopped");
    }
}

/// Broker-backed publisher implementation.
#[async_trait::async_trait]
impl Publisher for brewbee_mqtt::Publisher {
    async fn publish(
        &self,
        topic: &str,
        payload: &(dyn Serialize + Send + Sync),
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.publish_to(topic, payload, 0, false)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}
