//! Domain model structs held by the stores.
//!
//! Read-side structs derive `Serialize` so they can be handed directly to a
//! renderer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use parley_shared::Message;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A named, independently scrollable message stream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Channel {
    /// Unique key within the store, also the routing key on the wire.
    pub name: String,
    /// `false` only for the default channel.
    pub deletable: bool,
    /// When the channel was created locally.
    pub created_at: DateTime<Utc>,
    /// Append-only history; insertion order is chronological order.
    pub(crate) messages: Vec<Message>,
}

impl Channel {
    pub(crate) fn new(name: String, deletable: bool) -> Self {
        Self {
            name,
            deletable,
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChannelSummary
// ---------------------------------------------------------------------------

/// Channel list entry as shown by a renderer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChannelSummary {
    pub name: String,
    pub deletable: bool,
    pub selected: bool,
    pub message_count: usize,
}
