//! One WebSocket chat connection.
//!
//! A connection whose handshake token fails verification receives
//! `{"error":"invalid token"}` and is closed. Accepted connections relay
//! every valid envelope to all other connections; the sender gets no echo.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_shared::{InboundPayload, OutboundEnvelope};

use crate::api::AppState;
use crate::auth::TokenCheck;
use crate::config::ServerConfig;
use crate::rate_limit::MessageBudget;

/// Relayed messages per second per connection, with a burst allowance.
const MESSAGE_RATE: f64 = 5.0;
const MESSAGE_BURST: f64 = 20.0;

#[derive(Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Broadcast this frame to the other connections.
    Relay(String),
    /// Answer the sender with an error frame; the connection stays open.
    Reply(String),
    /// The envelope's credential failed verification; close the connection.
    Reject,
}

pub async fn run_connection(socket: WebSocket, state: AppState, token: Option<String>) {
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    let authorized = token.as_deref().is_some_and(|t| state.auth.verify(t));
    if !authorized {
        warn!(connection = %id, has_token = token.is_some(), "Rejecting connection: invalid token");
        let _ = sink.send(Message::Text(error_frame("invalid token"))).await;
        let _ = sink.send(Message::Close(None)).await;
        return;
    }

    let _guard = state.hub.join();
    let mut relay_rx = state.hub.subscribe();
    let mut budget = MessageBudget::new(MESSAGE_RATE, MESSAGE_BURST);
    info!(
        connection = %id,
        connections = state.hub.connection_count(),
        "Client connected"
    );

    loop {
        tokio::select! {
            relayed = relay_rx.recv() => {
                match relayed {
                    Ok(relayed) if relayed.from == id => {}
                    Ok(relayed) => {
                        if sink.send(Message::Text(relayed.frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(connection = %id, skipped, "Slow client, frames dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match process_frame(&text, &state.config, &state.auth, &mut budget) {
                            FrameOutcome::Relay(frame) => {
                                let receivers = state.hub.publish(id, frame);
                                debug!(connection = %id, receivers, "Message relayed");
                            }
                            FrameOutcome::Reply(error) => {
                                if sink.send(Message::Text(error_frame(&error))).await.is_err() {
                                    break;
                                }
                            }
                            FrameOutcome::Reject => {
                                warn!(connection = %id, "Envelope credential rejected, closing");
                                let _ = sink.send(Message::Text(error_frame("invalid token"))).await;
                                let _ = sink.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection = %id, error = %e, "Socket error");
                        break;
                    }
                }
            }
        }
    }

    info!(connection = %id, "Client disconnected");
}

/// Validate one inbound envelope and decide what to do with it.
pub fn process_frame(
    text: &str,
    config: &ServerConfig,
    auth: &TokenCheck,
    budget: &mut MessageBudget,
) -> FrameOutcome {
    if text.len() > config.max_frame_size {
        return FrameOutcome::Reply("message too long".into());
    }

    let envelope = match OutboundEnvelope::from_frame(text) {
        Ok(envelope) => envelope,
        Err(e) => return FrameOutcome::Reply(format!("malformed message: {e}")),
    };

    if !auth.verify(&envelope.credential) {
        return FrameOutcome::Reject;
    }

    if !budget.spend() {
        let wait_ms = budget.retry_after().as_millis();
        return FrameOutcome::Reply(format!("rate limited, retry in {wait_ms}ms"));
    }

    FrameOutcome::Relay(relay_frame(envelope, config.tag_channels))
}

fn relay_frame(envelope: OutboundEnvelope, tag_channels: bool) -> String {
    let payload = InboundPayload::Text {
        text: envelope.text,
        channel: tag_channels.then_some(envelope.channel),
    };

    // Untagged text goes out raw unless the raw form would be read back as
    // something else (e.g. a JSON object with an "error" key).
    let frame = match payload.to_frame() {
        Ok(frame) => frame,
        Err(_) => return error_frame("internal error"),
    };
    if InboundPayload::parse(&frame) == payload {
        return frame;
    }
    match &payload {
        InboundPayload::Text { text, .. } => serde_json::json!({ "text": text }).to_string(),
        InboundPayload::Error { .. } => frame,
    }
}

fn error_frame(error: &str) -> String {
    InboundPayload::Error {
        error: error.to_string(),
    }
    .to_frame()
    .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
}
