use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token proving the user's identity to the backend.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wrap a bearer token. Blank input yields `None`: an empty token is
    /// treated exactly like an absent one.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Sent by this session (optimistic echo).
    Local,
    /// Received from the backend.
    Remote,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::Local => f.write_str("local"),
            Sender::Remote => f.write_str("remote"),
        }
    }
}

/// One entry of a channel's history. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    /// Insertion position within the owning channel, starting at 0.
    pub seq: u64,
    /// Local time at which the message entered the history.
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credential_is_absent() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
        assert_eq!(Credential::new(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("s3cret").unwrap();
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Local).unwrap(), "\"local\"");
        assert_eq!(Sender::Remote.to_string(), "remote");
    }
}
