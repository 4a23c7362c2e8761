//! Event loop driving and reconnection.
//!
//! [`ConnectionDriver`] owns the rumqttc `EventLoop` and runs it on a single
//! task: it pumps MQTT packets, classifies failures as fatal or transient,
//! waits out the backoff schedule between transient failures, and broadcasts
//! [`ConnectionState`] transitions over a watch channel. Shutdown is
//! cooperative through a `CancellationToken`.

use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{backoff::Backoff, error::BrokerError, state::ConnectionState};

/// Drives the MQTT event loop and keeps the connection alive.
///
/// Designed to run on one tokio task (see
/// [`MqttManager::build_and_start`](crate::MqttManager::build_and_start));
/// the `AsyncClient` can be cloned and used from any other task meanwhile.
pub struct ConnectionDriver {
    client: AsyncClient,
    event_loop: EventLoop,
    backoff: Backoff,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionDriver {
    /// Creates a driver in the `Connecting` state with the default backoff
    /// schedule.
    pub fn new(client: AsyncClient, event_loop: EventLoop, cancel: CancellationToken) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        Self {
            client,
            event_loop,
            backoff: Backoff::default(),
            cancel,
            state_tx,
            state_rx,
        }
    }

    /// Returns a receiver for connection state changes.
    ///
    /// The receiver sees the current state immediately on subscription.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Broadcasts a state change, skipping no-op transitions.
    fn update_state(&self, state: ConnectionState) {
        let changed = *self.state_tx.borrow() != state;
        if changed {
            info!("Connection state changed to: {}", state);
            let _ = self.state_tx.send(state);
        }
    }

    /// Runs the event loop until shutdown or a fatal error.
    ///
    /// On transient errors the driver waits out the backoff delay and lets
    /// the event loop retry. On fatal errors (bad credentials, broken TLS) it
    /// broadcasts `Disconnected` and returns the error. On cancellation it
    /// sends a best-effort DISCONNECT and returns `Ok(())`.
    pub async fn run(&mut self) -> Result<(), BrokerError> {
        info!("Starting connection event loop...");
        self.update_state(ConnectionState::Connecting);
        self.backoff.reset();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received, closing broker connection...");
                    if let Err(e) = self.client.disconnect().await {
                        warn!("Error sending disconnect packet: {:?}", e);
                    }
                    return Ok(());
                }

                event = self.event_loop.poll() => {
                    match event {
                        Ok(event) => self.handle_event(event),
                        Err(e) if is_fatal(&e) => {
                            error!("Fatal connection error, giving up: {}", e);
                            self.update_state(ConnectionState::Disconnected(e.to_string()));
                            return Err(e.into());
                        }
                        Err(e) => {
                            match self.backoff.next_sleep() {
                                Ok(delay) => {
                                    warn!(
                                        "Reconnecting in {:.2}s after error: {}",
                                        delay.as_secs_f64(),
                                        root_cause(&e)
                                    );
                                    self.update_state(ConnectionState::Reconnecting(
                                        delay.as_secs_f64(),
                                    ));
                                    tokio::time::sleep(delay).await;
                                    self.update_state(ConnectionState::Connecting);
                                }
                                Err(exhausted) => {
                                    error!("Reconnect attempts exhausted: {}", exhausted);
                                    self.update_state(ConnectionState::Disconnected(
                                        exhausted.to_string(),
                                    ));
                                    return Err(exhausted.into());
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Reacts to a single MQTT event.
    ///
    /// Only connection-level packets matter here; acknowledgments and
    /// subscription traffic are not this crate's concern.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to broker");
                    self.update_state(ConnectionState::Connected);
                    self.backoff.reset();
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Disconnected by broker");
                self.update_state(ConnectionState::Disconnected(
                    "Disconnected by broker".into(),
                ));
            }
            Event::Incoming(packet) => {
                trace!("Incoming packet: {:?}", packet);
            }
            Event::Outgoing(outgoing) => {
                trace!("Outgoing packet: {:?}", outgoing);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Unrecoverable; reconnecting cannot help.
    Fatal,
    /// Temporary; a reconnect attempt is reasonable.
    Reconnect,
}

fn classify(err: &ConnectionError) -> Disposition {
    use Disposition::*;

    match err {
        // Broken certificates or crypto setup won't fix themselves.
        ConnectionError::Tls(_) => Fatal,
        // Protocol state corruption.
        ConnectionError::MqttState(_) => Fatal,
        // Broker answered with something other than CONNACK.
        ConnectionError::NotConnAck(_) => Fatal,
        // Request stream closed; the loop cannot be reused.
        ConnectionError::RequestsDone => Fatal,

        ConnectionError::Io(e) => match e.kind() {
            // Local misconfiguration, not a transient condition.
            std::io::ErrorKind::AddrInUse
            | std::io::ErrorKind::PermissionDenied
            | std::io::ErrorKind::InvalidInput
            | std::io::ErrorKind::InvalidData => Fatal,
            _ => Reconnect,
        },

        ConnectionError::NetworkTimeout | ConnectionError::FlushTimeout => Reconnect,

        ConnectionError::ConnectionRefused(code) => match code {
            ConnectReturnCode::RefusedProtocolVersion
            | ConnectReturnCode::BadClientId
            | ConnectReturnCode::BadUserNamePassword
            | ConnectReturnCode::NotAuthorized => Fatal,
            ConnectReturnCode::ServiceUnavailable => Reconnect,
            _ => Reconnect,
        },

        // Unknown or future variants: prefer retry over a hard failure.
        #[allow(unreachable_patterns)]
        _ => Reconnect,
    }
}

fn is_fatal(err: &ConnectionError) -> bool {
    matches!(classify(err), Disposition::Fatal)
}

/// Walks the error chain down to the root cause message.
fn root_cause(e: &dyn std::error::Error) -> String {
    let mut current = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string().trim_matches('"').to_string()
}
