use std::sync::Arc;

use metrics::counter;
use tokio::sync::{mpsc, mpsc::error::TrySendError, oneshot};
use tracing::{debug, warn};

use super::registry::RegistryCommand;
use super::{ChatMessage, METRIC_EVICTED, METRIC_MESSAGES};

/// Fans each accepted message out to the clients registered at delivery time.
pub(crate) struct Relay {
    inbox: mpsc::Receiver<ChatMessage>,
    registry: mpsc::Sender<RegistryCommand>,
}

impl Relay {
    pub(crate) fn new(
        inbox: mpsc::Receiver<ChatMessage>,
        registry: mpsc::Sender<RegistryCommand>,
    ) -> Self {
        Self { inbox, registry }
    }

    /// Runs until every publishing handle is gone.
    pub(crate) async fn run(mut self) {
        while let Some(message) = self.inbox.recv().await {
            let payload: Arc<str> = match serde_json::to_string(&message) {
                Ok(json) => Arc::from(json),
                Err(err) => {
                    warn!(
                        target = "recipebox::hub",
                        error = %err,
                        "dropping unserializable message"
                    );
                    continue;
                }
            };

            let (reply, snapshot) = oneshot::channel();
            if self
                .registry
                .send(RegistryCommand::Snapshot { reply })
                .await
                .is_err()
            {
                break;
            }
            let Ok(clients) = snapshot.await else {
                break;
            };

            counter!(METRIC_MESSAGES).increment(1);
            for (id, outbound) in clients {
                let reason = match outbound.try_send(Arc::clone(&payload)) {
                    Ok(()) => continue,
                    Err(TrySendError::Full(_)) => "queue full",
                    Err(TrySendError::Closed(_)) => "queue closed",
                };

                counter!(METRIC_EVICTED).increment(1);
                warn!(target = "recipebox::hub", client_id = id, reason, "evicting client");
                if self
                    .registry
                    .send(RegistryCommand::Unregister { id })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
        debug!(target = "recipebox::hub", "relay stopped");
    }
}
