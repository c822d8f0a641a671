//! Wire frames exchanged with the chat backend.
//!
//! Outbound every frame is a JSON [`OutboundEnvelope`]. Inbound the backend
//! speaks three shapes, all carried in WebSocket text frames:
//!
//! - `{"error": "..."}`, a structured server-side failure;
//! - `{"text": "...", "channel": "..."}`, a channel-tagged message (the
//!   `channel` label is optional);
//! - anything else, plain text belonging to no particular channel.

use serde::{Deserialize, Serialize};

use crate::constants::AUTH_FAILURE_MARKERS;

/// Message sent by the client for every user send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub text: String,
    pub credential: String,
    pub channel: String,
}

impl OutboundEnvelope {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Payload received from the backend after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Chat text. `channel` is `None` when the backend did not label it.
    Text {
        text: String,
        channel: Option<String>,
    },
    /// Structured failure reported by the backend.
    Error { error: String },
}

#[derive(Serialize, Deserialize)]
struct ErrorFrame {
    error: String,
}

#[derive(Serialize, Deserialize)]
struct TaggedFrame {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

impl InboundPayload {
    /// Classify a raw text frame. Never fails: unrecognised frames are
    /// plain text.
    pub fn parse(frame: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(frame) {
            Ok(serde_json::Value::Object(map)) => {
                if let Some(error) = map.get("error").and_then(|v| v.as_str()) {
                    return InboundPayload::Error {
                        error: error.to_string(),
                    };
                }
                if let Some(text) = map.get("text").and_then(|v| v.as_str()) {
                    let channel = map
                        .get("channel")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    return InboundPayload::Text {
                        text: text.to_string(),
                        channel,
                    };
                }
                Self::plain(frame)
            }
            Ok(serde_json::Value::String(text)) => InboundPayload::Text {
                text,
                channel: None,
            },
            _ => Self::plain(frame),
        }
    }

    /// Render the payload the way the backend puts it on the wire.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        match self {
            InboundPayload::Error { error } => serde_json::to_string(&ErrorFrame {
                error: error.clone(),
            }),
            InboundPayload::Text {
                text,
                channel: Some(channel),
            } => serde_json::to_string(&TaggedFrame {
                text: text.clone(),
                channel: Some(channel.clone()),
            }),
            InboundPayload::Text {
                text,
                channel: None,
            } => Ok(text.clone()),
        }
    }

    /// `true` for an error payload that matches the auth-failure convention.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            InboundPayload::Error { error } => is_auth_failure(error),
            InboundPayload::Text { .. } => false,
        }
    }

    fn plain(frame: &str) -> Self {
        InboundPayload::Text {
            text: frame.to_string(),
            channel: None,
        }
    }
}

/// Case-insensitive match of an error text against [`AUTH_FAILURE_MARKERS`].
pub fn is_auth_failure(error: &str) -> bool {
    let lowered = error.to_lowercase();
    AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
