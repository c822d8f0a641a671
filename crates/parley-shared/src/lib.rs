//! Types shared by every Parley crate: the credential and message model,
//! the wire envelopes exchanged with the chat backend, and the error
//! taxonomy of the session core.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ChatError;
pub use protocol::{InboundPayload, OutboundEnvelope};
pub use types::{Credential, Message, Sender};
