use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Hub, HubError, InboundMessage};

/// A frame read from a client transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    /// Ping/pong and other frames without application payload.
    Control,
    Close,
}

/// Read half of a client transport.
#[async_trait]
pub trait FrameSource: Send {
    /// `None` once the peer has gone away.
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, HubError>>;
}

/// Write half of a client transport.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), HubError>;

    async fn close(&mut self);
}

impl Hub {
    /// Drive one client from registration to disconnect.
    ///
    /// History is replayed before anything relayed after registration. The
    /// call returns once the peer closes, a read or write fails, or a frame
    /// cannot be decoded (reported as [`HubError::Decode`]). The client is
    /// unregistered on every exit path.
    pub async fn serve_connection<Src, Snk>(
        &self,
        user_id: String,
        mut source: Src,
        sink: Snk,
    ) -> Result<(), HubError>
    where
        Src: FrameSource,
        Snk: FrameSink + 'static,
    {
        let (client_id, outbound) = self.register().await?;
        info!(
            target = "recipebox::hub",
            client_id,
            user_id = %user_id,
            "realtime connection established"
        );

        let mut writer = tokio::spawn(write_loop(outbound, sink));
        let outcome = tokio::select! {
            result = self.read_loop(&user_id, &mut source) => result,
            _ = &mut writer => {
                debug!(target = "recipebox::hub", client_id, "writer finished first");
                Ok(())
            }
        };

        writer.abort();
        self.unregister(client_id).await;

        match &outcome {
            Ok(()) => info!(
                target = "recipebox::hub",
                client_id,
                user_id = %user_id,
                "realtime connection closed"
            ),
            Err(err) => warn!(
                target = "recipebox::hub",
                client_id,
                user_id = %user_id,
                error = %err,
                "realtime connection terminated"
            ),
        }
        outcome
    }

    async fn read_loop<Src: FrameSource>(
        &self,
        user_id: &str,
        source: &mut Src,
    ) -> Result<(), HubError> {
        while let Some(frame) = source.next_frame().await {
            let inbound: InboundMessage = match frame {
                Ok(InboundFrame::Text(text)) => {
                    serde_json::from_str(&text).map_err(HubError::Decode)?
                }
                Ok(InboundFrame::Binary(bytes)) => {
                    serde_json::from_slice(&bytes).map_err(HubError::Decode)?
                }
                Ok(InboundFrame::Control) => continue,
                Ok(InboundFrame::Close) => break,
                Err(err) => {
                    debug!(target = "recipebox::hub", error = %err, "read failed");
                    break;
                }
            };

            self.publish(inbound.attribute_to(user_id)).await?;
        }
        Ok(())
    }
}

async fn write_loop<Snk: FrameSink>(mut outbound: mpsc::Receiver<Arc<str>>, mut sink: Snk) {
    while let Some(payload) = outbound.recv().await {
        if let Err(err) = sink.send_text(&payload).await {
            debug!(target = "recipebox::hub", error = %err, "write failed");
            break;
        }
    }
    sink.close().await;
}
