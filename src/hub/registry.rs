use std::{collections::HashMap, sync::Arc};

use metrics::gauge;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{ChatMessage, HubStats, METRIC_CLIENTS};

pub(crate) type ClientId = u64;
pub(crate) type Outbound = mpsc::Sender<Arc<str>>;

pub(crate) enum RegistryCommand {
    Register {
        reply: oneshot::Sender<(ClientId, mpsc::Receiver<Arc<str>>)>,
    },
    Unregister {
        id: ClientId,
    },
    Append {
        message: ChatMessage,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<(ClientId, Outbound)>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    History {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
}

/// Sole owner of the client registry and the session history.
pub(crate) struct Registry {
    commands: mpsc::Receiver<RegistryCommand>,
    clients: HashMap<ClientId, Outbound>,
    history: Vec<ChatMessage>,
    next_id: ClientId,
    client_buffer: usize,
}

impl Registry {
    pub(crate) fn new(commands: mpsc::Receiver<RegistryCommand>, client_buffer: usize) -> Self {
        Self {
            commands,
            clients: HashMap::new(),
            history: Vec::new(),
            next_id: 0,
            client_buffer,
        }
    }

    /// Runs until every command sender is gone.
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                RegistryCommand::Register { reply } => self.register(reply),
                RegistryCommand::Unregister { id } => self.unregister(id),
                RegistryCommand::Append { message, reply } => {
                    self.history.push(message);
                    let _ = reply.send(());
                }
                RegistryCommand::Snapshot { reply } => {
                    let snapshot = self
                        .clients
                        .iter()
                        .map(|(id, outbound)| (*id, outbound.clone()))
                        .collect();
                    let _ = reply.send(snapshot);
                }
                RegistryCommand::Stats { reply } => {
                    let _ = reply.send(HubStats {
                        clients: self.clients.len(),
                        history_len: self.history.len(),
                    });
                }
                RegistryCommand::History { reply } => {
                    let _ = reply.send(self.history.clone());
                }
            }
        }
        debug!(target = "recipebox::hub", "registry stopped");
    }

    fn register(&mut self, reply: oneshot::Sender<(ClientId, mpsc::Receiver<Arc<str>>)>) {
        let id = self.next_id;
        self.next_id += 1;

        // Sized so the replay below can never block or fail for lack of room.
        let (outbound, receiver) = mpsc::channel(self.history.len() + self.client_buffer);
        for message in &self.history {
            match serde_json::to_string(message) {
                Ok(json) => {
                    let _ = outbound.try_send(Arc::from(json));
                }
                Err(err) => {
                    warn!(
                        target = "recipebox::hub",
                        error = %err,
                        "skipping unserializable history entry"
                    );
                }
            }
        }

        if reply.send((id, receiver)).is_err() {
            debug!(
                target = "recipebox::hub",
                client_id = id,
                "client left before registration completed"
            );
            self.clear_history_if_empty();
            return;
        }

        self.clients.insert(id, outbound);
        gauge!(METRIC_CLIENTS).set(self.clients.len() as f64);
        info!(
            target = "recipebox::hub",
            client_id = id,
            clients = self.clients.len(),
            replayed = self.history.len(),
            "client registered"
        );
    }

    fn unregister(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_none() {
            return;
        }
        gauge!(METRIC_CLIENTS).set(self.clients.len() as f64);
        info!(
            target = "recipebox::hub",
            client_id = id,
            clients = self.clients.len(),
            "client unregistered"
        );
        self.clear_history_if_empty();
    }

    fn clear_history_if_empty(&mut self) {
        if self.clients.is_empty() && !self.history.is_empty() {
            info!(
                target = "recipebox::hub",
                dropped = self.history.len(),
                "no clients left, clearing chat history"
            );
            self.history.clear();
        }
    }
}
