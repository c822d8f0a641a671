use parley_net::ConnectionState;
use parley_shared::Message;
use parley_store::ChannelSummary;

/// Everything a renderer needs to react to, published by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message entered the history of `channel`.
    MessageAppended { channel: String, message: Message },

    /// A channel was created or deleted.
    ChannelsChanged(Vec<ChannelSummary>),

    SelectionChanged { channel: String },

    ConnectionStateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// Human-readable, non-fatal information (server errors, rejected
    /// channel operations, reconnect progress).
    Notice(String),

    /// No usable credential: the user must log in again. Published once per
    /// rejection.
    AuthenticationRequired,
}
