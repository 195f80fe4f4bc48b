//! Realtime chat hub.
//!
//! Connected clients share one transient conversation. Every accepted
//! message is appended to the session history and relayed to all clients;
//! newcomers get the history replayed first. The history lives only while at
//! least one client is connected.
//!
//! Two long-lived workers back a [`Hub`]: the registry, which owns the client
//! set and the history, and the relay, which fans messages out. Both are
//! returned by [`Hub::new`] as [`HubWorkers`] and must be driven with
//! [`HubWorkers::run`].

mod connection;
mod message;
mod registry;
mod relay;

pub use connection::{FrameSink, FrameSource, InboundFrame};
pub use message::{ChatMessage, InboundMessage};

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::RealtimeSettings;

use registry::{ClientId, Registry, RegistryCommand};
use relay::Relay;

pub(crate) const METRIC_CLIENTS: &str = "recipebox_realtime_clients";
pub(crate) const METRIC_MESSAGES: &str = "recipebox_realtime_messages_total";
pub(crate) const METRIC_EVICTED: &str = "recipebox_realtime_evicted_total";

const COMMAND_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("failed to decode inbound message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("hub is not running")]
    Closed,
    #[error("relay queue is closed")]
    Relay,
    #[error("transport error: {0}")]
    Transport(String),
}

impl HubError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    pub relay_capacity: usize,
    /// Outbound slots per client on top of the replayed history.
    pub client_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            relay_capacity: 256,
            client_buffer: 64,
        }
    }
}

impl From<&RealtimeSettings> for HubConfig {
    fn from(settings: &RealtimeSettings) -> Self {
        Self {
            relay_capacity: settings.relay_capacity.get(),
            client_buffer: settings.client_buffer.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub clients: usize,
    pub history_len: usize,
}

/// Cloneable handle used by connection handlers.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<RegistryCommand>,
    relay: mpsc::Sender<ChatMessage>,
}

/// Background tasks backing a [`Hub`].
pub struct HubWorkers {
    registry: Registry,
    relay: Relay,
}

impl HubWorkers {
    /// Drive the registry and the relay. Returns once every [`Hub`] handle is dropped.
    pub async fn run(self) {
        tokio::join!(self.registry.run(), self.relay.run());
    }
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, HubWorkers) {
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (relay, relay_rx) = mpsc::channel(config.relay_capacity.max(1));

        let workers = HubWorkers {
            registry: Registry::new(command_rx, config.client_buffer.max(1)),
            relay: Relay::new(relay_rx, commands.clone()),
        };
        (Self { commands, relay }, workers)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.request(|reply| RegistryCommand::Stats { reply }).await
    }

    /// Messages retained for replay, oldest first.
    pub async fn history(&self) -> Result<Vec<ChatMessage>, HubError> {
        self.request(|reply| RegistryCommand::History { reply }).await
    }

    async fn register(&self) -> Result<(ClientId, mpsc::Receiver<Arc<str>>), HubError> {
        self.request(|reply| RegistryCommand::Register { reply }).await
    }

    async fn unregister(&self, id: ClientId) {
        let _ = self.commands.send(RegistryCommand::Unregister { id }).await;
    }

    /// Record `message` in history, then queue it for delivery.
    async fn publish(&self, message: ChatMessage) -> Result<(), HubError> {
        let relayed = message.clone();
        self.request(|reply| RegistryCommand::Append { message, reply })
            .await?;
        self.relay.send(relayed).await.map_err(|_| HubError::Relay)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, HubError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }
}
