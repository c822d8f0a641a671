//! Transport seam between the connection state machine and the network.
//!
//! A [`Transport`] is driven synchronously: `open` only *starts* a
//! handshake. Everything that happens afterwards comes back as
//! [`TransportEvent`]s tagged with the generation of the attempt that
//! produced them, which lets the manager ignore events from attempts it has
//! already abandoned.

use thiserror::Error;

use parley_shared::Credential;

/// Parameters of one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub generation: u64,
    pub url: String,
    pub credential: Credential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Handshake completed; frames may now flow.
    Established,
    /// A text frame from the backend.
    Frame(String),
    /// The handshake failed for a transient reason.
    Failed(String),
    /// The backend refused the handshake because of the credential.
    Rejected(String),
    /// An established connection was lost.
    Dropped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(generation: u64, kind: TransportEventKind) -> Self {
        Self { generation, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid connection request: {0}")]
    InvalidRequest(String),

    #[error("Handshake refused with HTTP {0}")]
    Refused(u16),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Connection is not open")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Read failed: {0}")]
    Read(String),
}

impl TransportError {
    /// HTTP 401/403 on the upgrade request: the credential was refused.
    pub fn is_auth_refusal(&self) -> bool {
        matches!(self, TransportError::Refused(401 | 403))
    }
}

pub trait Transport {
    /// Start a handshake for `request`, replacing any current connection.
    fn open(&mut self, request: ConnectRequest);

    /// Queue one text frame on the open connection.
    fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Tear the connection down. Idempotent.
    fn close(&mut self);
}
