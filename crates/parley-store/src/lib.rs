//! # parley-store
//!
//! In-memory session state for the Parley client.
//!
//! The crate holds the two leaf components of a chat session: the
//! [`CredentialStore`] with the current bearer token, and the
//! [`ChannelStore`] that maps channel names to their ordered message
//! history. Both are plain owned values without I/O; the session
//! coordinator is their only writer.

pub mod channels;
pub mod credentials;
pub mod models;

mod error;

pub use channels::ChannelStore;
pub use credentials::CredentialStore;
pub use error::Result;
pub use models::*;
