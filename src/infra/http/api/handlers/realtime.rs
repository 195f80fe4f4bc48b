//! Websocket entry point for the chat hub

use async_trait::async_trait;
use axum::extract::ws::{
    Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection,
};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::hub::{FrameSink, FrameSource, HubError, InboundFrame};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::RealtimeQuery;
use crate::infra::http::api::state::ApiState;

pub async fn connect_realtime(
    State(state): State<ApiState>,
    Query(query): Query<RealtimeQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(user_id) = query
        .user_id
        .map(|user_id| user_id.trim().to_string())
        .filter(|user_id| !user_id.is_empty())
    else {
        let hint = Some("`userId` is required".to_string());
        return ApiError::bad_request("missing query parameter", hint).into_response();
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = state.hub.clone();
    upgrade.on_upgrade(move |socket| async move {
        let (sink, source) = socket.split();
        // Outcome is logged by the hub.
        let _ = hub
            .serve_connection(user_id, WebSocketSource(source), WebSocketSink(sink))
            .await;
    })
}

pub struct WebSocketSource(SplitStream<WebSocket>);

pub struct WebSocketSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, HubError>> {
        let frame = match self.0.next().await? {
            Ok(Message::Text(text)) => Ok(InboundFrame::Text(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => Ok(InboundFrame::Binary(bytes.to_vec())),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Ok(InboundFrame::Control),
            Ok(Message::Close(_)) => Ok(InboundFrame::Close),
            Err(err) => Err(HubError::transport(err)),
        };
        Some(frame)
    }
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, text: &str) -> Result<(), HubError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(HubError::transport)
    }

    async fn close(&mut self) {
        let _ = self.0.send(Message::Close(None)).await;
        let _ = SinkExt::close(&mut self.0).await;
    }
}
