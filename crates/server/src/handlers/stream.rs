//! # Streaming Query Handler
//!
//! Upgrades to a WebSocket and drives one `StreamingSession::start` call
//! per connection, forwarding each `StreamEvent` to the client as JSON.
//! Connection lifecycle (`on_upgrade`, splitting the socket, a
//! channel-fed sender task) follows the usual Axum WebSocket handler
//! shape.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use studyrag::models::SourceAttribution;
use studyrag::streaming::{StartRequest, StreamEvent};
use tracing::{info, warn};

use crate::{auth::CallerId, state::AppState};

/// The client's opening message on a streaming socket. `owner_id` is
/// resolved from the caller's JWT, not accepted from the client.
#[derive(Debug, Deserialize)]
struct WsStartRequest {
    project_id: String,
    message: String,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOutboundEvent {
    Status { stage: &'static str, message: String },
    ConversationCreated { id: String, title: String },
    UserMessage { id: String, content: String },
    StreamStart { sources_preview: Vec<String> },
    StreamChunk { content: String, full_content: String },
    StreamComplete {
        message_id: String,
        content: String,
        tokens_used: u32,
        sources: Vec<SourceAttribution>,
    },
    Error { message: String },
}

impl From<StreamEvent> for WsOutboundEvent {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Status { stage, message } => WsOutboundEvent::Status { stage, message },
            StreamEvent::ConversationCreated { id, title } => {
                WsOutboundEvent::ConversationCreated { id, title }
            }
            StreamEvent::UserMessage { id, content } => WsOutboundEvent::UserMessage { id, content },
            StreamEvent::StreamStart { sources_preview } => {
                WsOutboundEvent::StreamStart { sources_preview }
            }
            StreamEvent::StreamChunk { content, full_content } => {
                WsOutboundEvent::StreamChunk { content, full_content }
            }
            StreamEvent::StreamComplete {
                message_id,
                content,
                tokens_used,
                sources,
            } => WsOutboundEvent::StreamComplete {
                message_id,
                content,
                tokens_used,
                sources,
            },
            StreamEvent::Error { message } => WsOutboundEvent::Error { message },
        }
    }
}

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    caller: CallerId,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, caller, app_state))
}

async fn handle_socket(socket: WebSocket, caller: CallerId, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let Some(Ok(Message::Text(text))) = receiver.next().await else {
        warn!("streaming socket closed before a start request was received");
        return;
    };

    let request: StartRequest = match serde_json::from_str::<WsStartRequest>(&text) {
        Ok(parsed) => StartRequest {
            project_id: parsed.project_id,
            owner_id: caller.0,
            message: parsed.message,
            conversation_id: parsed.conversation_id,
        },
        Err(e) => {
            let _ = sender
                .send(Message::Text(
                    serde_json::to_string(&WsOutboundEvent::Error {
                        message: format!("invalid start request: {e}"),
                    })
                    .unwrap_or_default()
                    .into(),
                ))
                .await;
            return;
        }
    };

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(32);
    let session = app_state.streaming.clone();
    let run = tokio::spawn(async move { session.start(request, events_tx).await });

    while let Some(event) = events_rx.recv().await {
        let outbound: WsOutboundEvent = event.into();
        let payload = match serde_json::to_string(&outbound) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to serialize stream event: {e}");
                continue;
            }
        };
        if sender.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }

    match run.await {
        Ok(Ok(())) => info!("streaming session completed"),
        Ok(Err(e)) => warn!("streaming session failed: {e}"),
        Err(e) => warn!("streaming session task panicked: {e}"),
    }

    let _ = sender.close().await;
}
