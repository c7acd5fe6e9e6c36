//! The broker connection: connect, clean-session handshake, disconnect.
//!
//! The event loop runs in its own task and shares nothing with the
//! session layer. It acknowledges the handshake, logs inbound publishes
//! without acting on them, and stops at the first connection error.
//! There is no reconnect.

use std::time::{Duration, SystemTime};

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::task::JoinHandle;

use crate::{BrokerConfig, BrokerError};

/// How long `disconnect` waits for the event loop to flush DISCONNECT.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// A live (or connecting) broker connection.
pub struct BrokerClient {
    client: AsyncClient,
    client_id: String,
    task: JoinHandle<()>,
}

impl BrokerClient {
    /// Starts connecting to the broker.
    ///
    /// Returns as soon as the event loop task is spawned; the TCP connect
    /// and CONNECT/CONNACK exchange happen on that task. A failure there
    /// is logged, not returned: an unreachable broker ends only the
    /// broker task and never stops the HTTP side.
    ///
    /// # Errors
    /// Returns [`BrokerError::InvalidConfig`] if `config` fails validation.
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        config.validate()?;

        let client_id = config.client_id(SystemTime::now());
        let mut options = MqttOptions::new(client_id.clone(), config.host.clone(), config.port);
        options.set_clean_session(true);
        options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);

        tracing::info!(
            host = %config.host,
            port = config.port,
            %client_id,
            "connecting to broker"
        );
        let task = tokio::spawn(drive(eventloop, client_id.clone()));

        Ok(Self {
            client,
            client_id,
            task,
        })
    }

    /// The identifier sent in the CONNECT packet.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the event loop has stopped (error or disconnect).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Sends DISCONNECT and stops the event loop.
    ///
    /// If the connection already failed this just reaps the task. The
    /// loop gets [`DISCONNECT_TIMEOUT`] to flush the packet before it is
    /// aborted.
    pub async fn disconnect(mut self) -> Result<(), BrokerError> {
        if self.task.is_finished() {
            return Ok(());
        }

        if let Err(e) = self.client.disconnect().await {
            self.task.abort();
            return Err(BrokerError::Client(e));
        }

        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut self.task).await.is_err() {
            tracing::warn!(client_id = %self.client_id, "broker did not disconnect in time, aborting");
            self.task.abort();
        }
        Ok(())
    }
}

async fn drive(mut eventloop: EventLoop, client_id: String) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(
                    %client_id,
                    code = ?ack.code,
                    session_present = ack.session_present,
                    "broker handshake acknowledged"
                );
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                // No routing contract yet.
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "ignoring broker publish"
                );
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!(%client_id, "disconnected from broker");
                break;
            }
            Ok(event) => tracing::trace!(?event, "broker event"),
            Err(e) => {
                tracing::error!(%client_id, error = %e, "broker connection failed");
                break;
            }
        }
    }
}
