//! Read-only view of a session handed to renderers.

use serde::Serialize;

use parley_shared::Message;
use parley_store::ChannelSummary;

/// Full session state at one point in time.
///
/// Serializable so a renderer living behind an IPC boundary can receive it
/// as JSON.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Channel list in creation order.
    pub channels: Vec<ChannelSummary>,

    /// Name of the selected channel.
    pub selected: String,

    /// History of the selected channel, oldest first.
    pub history: Vec<Message>,

    /// Connection state, e.g. `"connected"` or `"reconnecting"`.
    pub connection: String,

    /// Whether a credential is currently stored.
    pub authenticated: bool,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
