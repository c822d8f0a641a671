use thiserror::Error;

/// Every failure the session core can report.
///
/// None of these are fatal to the process: the worst outcome is a terminal
/// `Disconnected` or `AuthRejected` connection that needs a fresh connect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("No credential available, authentication required")]
    NoCredential,

    #[error("Not connected")]
    NotConnected,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Credential rejected by backend: {0}")]
    AuthRejected(String),

    #[error("Channel already exists: {0}")]
    DuplicateChannel(String),

    #[error("Channel cannot be deleted: {0}")]
    ProtectedChannel(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannelName(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ChatError {
    /// Channel-store misuse. Reported to the user, never touches the connection.
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            ChatError::DuplicateChannel(_)
                | ChatError::ProtectedChannel(_)
                | ChatError::UnknownChannel(_)
                | ChatError::InvalidChannelName(_)
        )
    }

    /// Trust failures that must be escalated to the auth provider.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, ChatError::NoCredential | ChatError::AuthRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(ChatError::DuplicateChannel("Work".into()).is_channel_error());
        assert!(ChatError::InvalidChannelName(" ".into()).is_channel_error());
        assert!(!ChatError::NotConnected.is_channel_error());

        assert!(ChatError::NoCredential.requires_reauthentication());
        assert!(ChatError::AuthRejected("invalid token".into()).requires_reauthentication());
        assert!(!ChatError::TransportFailure("reset".into()).requires_reauthentication());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ChatError::UnknownChannel("Work".into()).to_string(),
            "Unknown channel: Work"
        );
    }
}
