//! The two collaborators outside the session core.

use parley_shared::Credential;

use crate::events::SessionEvent;
use crate::state::SessionSnapshot;

/// Source of the bearer credential (login form, keychain, environment).
pub trait AuthProvider {
    /// Credential to use right now, if the user is logged in.
    fn credential(&self) -> Option<Credential>;

    /// The stored credential is missing or was rejected; the user has to
    /// log in again.
    fn reauthentication_required(&mut self);
}

/// Displays the session. Intents flow the other way, through
/// [`crate::runtime::Intent`].
pub trait Renderer {
    fn on_event(&mut self, event: &SessionEvent);

    /// Redraw everything from a snapshot.
    fn render(&mut self, snapshot: &SessionSnapshot);
}

/// Auth provider with a fixed credential, e.g. one read from the
/// environment at startup.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    credential: Option<Credential>,
    reauth_requests: usize,
}

impl StaticAuthProvider {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            credential,
            reauth_requests: 0,
        }
    }

    /// How many times re-authentication was requested.
    pub fn reauth_requests(&self) -> usize {
        self.reauth_requests
    }
}

impl AuthProvider for StaticAuthProvider {
    fn credential(&self) -> Option<Credential> {
        self.credential.clone()
    }

    fn reauthentication_required(&mut self) {
        self.reauth_requests += 1;
        // A rejected static credential will not get better by retrying.
        self.credential = None;
        tracing::warn!("Re-authentication required, use /login <token>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_forgets_rejected_credential() {
        let mut provider = StaticAuthProvider::new(Credential::new("abc"));
        assert_eq!(provider.credential().map(|c| c.as_str().to_string()), Some("abc".into()));

        provider.reauthentication_required();
        assert!(provider.credential().is_none());
        assert_eq!(provider.reauth_requests(), 1);
    }
}
