//! Holder for the current bearer credential.

use parley_shared::Credential;
use tracing::debug;

/// Current bearer token, or nothing.
///
/// Read by the connection manager at connect time and on every send.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: Option<Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Credential> {
        self.current.as_ref()
    }

    /// Replace the current credential after a successful external login.
    pub fn set(&mut self, credential: Credential) {
        debug!(replaced = self.current.is_some(), "Credential stored");
        self.current = Some(credential);
    }

    /// Drop the credential, e.g. after the backend rejected it.
    /// Returns `true` if there was one.
    pub fn clear(&mut self) -> bool {
        let had = self.current.take().is_some();
        if had {
            debug!("Credential cleared");
        }
        had
    }

    pub fn is_present(&self) -> bool {
        self.current.is_some()
    }
}
