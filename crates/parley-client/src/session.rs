//! Session coordinator.
//!
//! Owns the credential store, the channel store and the connection manager
//! of one login session and keeps them consistent:
//!
//! - outbound sends go through the connection manager with the stored
//!   credential and are echoed locally only once the send succeeded;
//! - inbound text is attributed to a channel and appended as `remote`;
//! - auth failures clear the credential and ask the [`AuthProvider`] for a
//!   new one, exactly once per rejection.
//!
//! Every public method runs to completion and then drains the connection
//! manager's events, so observers always see a consistent state.

use tracing::{debug, info, warn};

use parley_net::{
    ConnectionEvent, ConnectionManager, ConnectionState, EventBus, RetryToken, Scheduler,
    Subscription, SubscriptionId, Transport, TransportEvent,
};
use parley_shared::{ChatError, Credential, InboundPayload, Sender};
use parley_store::{ChannelStore, CredentialStore};

use crate::attribution::{ChannelAttribution, SelectedChannelAttribution};
use crate::boundary::AuthProvider;
use crate::events::SessionEvent;
use crate::state::SessionSnapshot;

pub struct Session<T, S, A> {
    connection: ConnectionManager<T, S>,
    connection_events: Subscription<ConnectionEvent>,
    credentials: CredentialStore,
    channels: ChannelStore,
    auth: A,
    attribution: Box<dyn ChannelAttribution>,
    events: EventBus<SessionEvent>,
    /// Set once "authentication required" has been signalled; cleared by
    /// `login`.
    awaiting_auth: bool,
}

impl<T: Transport, S: Scheduler, A: AuthProvider> Session<T, S, A> {
    pub fn new(mut connection: ConnectionManager<T, S>, auth: A) -> Self {
        let connection_events = connection.subscribe();
        Self {
            connection,
            connection_events,
            credentials: CredentialStore::new(),
            channels: ChannelStore::new(),
            auth,
            attribution: Box::new(SelectedChannelAttribution),
            events: EventBus::new(),
            awaiting_auth: false,
        }
    }

    pub fn with_attribution(mut self, attribution: Box<dyn ChannelAttribution>) -> Self {
        self.attribution = attribution;
        self
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channels: self.channels.summaries(),
            selected: self.channels.selected().to_string(),
            history: self
                .channels
                .selected_channel()
                .map(|c| c.messages().to_vec())
                .unwrap_or_default(),
            connection: self.connection.state().to_string(),
            authenticated: self.credentials.is_present(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Seed the default channel, pick up the provider's credential and
    /// connect. A missing credential only raises "authentication required".
    pub fn start(&mut self) {
        self.channels.ensure_default();
        if let Some(credential) = self.auth.credential() {
            self.credentials.set(credential);
        }
        info!(
            url = %self.connection.url(),
            authenticated = self.credentials.is_present(),
            "Session starting"
        );
        self.connect_stored();
        self.process_connection_events();
    }

    /// Store a fresh credential and (re)connect with it.
    pub fn login(&mut self, credential: Credential) {
        self.credentials.set(credential);
        self.awaiting_auth = false;
        self.connect_stored();
        self.process_connection_events();
    }

    /// Disconnect and forget the credential.
    pub fn logout(&mut self) {
        self.connection.disconnect();
        self.credentials.clear();
        info!("Logged out");
        self.process_connection_events();
    }

    /// Disconnect but keep the credential, e.g. when the process exits.
    pub fn shutdown(&mut self) {
        self.connection.disconnect();
        self.process_connection_events();
    }

    fn connect_stored(&mut self) {
        match self.connection.connect(self.credentials.get()) {
            Ok(()) => {}
            Err(e) if e.requires_reauthentication() => self.require_authentication(),
            Err(e) => self.notice(e.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Renderer intents
    // ------------------------------------------------------------------

    /// Send `text` to the selected channel.
    ///
    /// Whitespace-only input is ignored. The local echo is appended only
    /// after the connection manager accepted the frame.
    pub fn send_message(&mut self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let channel = self.channels.selected().to_string();
        let result = self
            .connection
            .send(&channel, text, self.credentials.get());

        let outcome = match result {
            Ok(()) => {
                self.append(&channel, text, Sender::Local);
                Ok(())
            }
            Err(e) => {
                debug!(channel = %channel, error = %e, "Send rejected");
                self.notice(format!("Message not sent: {e}"));
                Err(e)
            }
        };
        self.process_connection_events();
        outcome
    }

    pub fn select_channel(&mut self, name: &str) -> Result<(), ChatError> {
        match self.channels.select(name).map(|c| c.name.clone()) {
            Ok(channel) => {
                self.events.publish(SessionEvent::SelectionChanged { channel });
                self.publish_channels();
                Ok(())
            }
            Err(e) => Err(self.channel_error(e)),
        }
    }

    pub fn create_channel(&mut self, name: &str) -> Result<(), ChatError> {
        match self.channels.create(name).map(|_| ()) {
            Ok(()) => {
                self.publish_channels();
                Ok(())
            }
            Err(e) => Err(self.channel_error(e)),
        }
    }

    pub fn delete_channel(&mut self, name: &str) -> Result<(), ChatError> {
        match self.channels.delete(name) {
            Ok(fell_back) => {
                info!(channel = %name, "Channel deleted");
                if fell_back {
                    let channel = self.channels.selected().to_string();
                    self.events.publish(SessionEvent::SelectionChanged { channel });
                }
                self.publish_channels();
                Ok(())
            }
            Err(e) => Err(self.channel_error(e)),
        }
    }

    // ------------------------------------------------------------------
    // Runtime inputs
    // ------------------------------------------------------------------

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        self.connection.handle_transport_event(event);
        self.process_connection_events();
    }

    pub fn handle_retry(&mut self, token: RetryToken) {
        self.connection.handle_retry(token);
        self.process_connection_events();
    }

    /// React to everything the connection manager published so far.
    pub fn process_connection_events(&mut self) {
        while let Some(event) = self.connection_events.try_next() {
            self.on_connection_event(event);
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::StateChanged { from, to } => {
                self.events
                    .publish(SessionEvent::ConnectionStateChanged { from, to });
                if to == ConnectionState::AuthRejected {
                    self.on_auth_failure();
                }
            }
            ConnectionEvent::Inbound(InboundPayload::Text { text, channel }) => {
                let target = self.attribution.resolve(channel.as_deref(), &self.channels);
                self.append(&target, &text, Sender::Remote);
            }
            ConnectionEvent::Inbound(payload @ InboundPayload::Error { .. }) => {
                if let InboundPayload::Error { error } = &payload {
                    warn!(error = %error, "Backend reported an error");
                    self.notice(format!("Server error: {error}"));
                }
                if payload.is_auth_failure() {
                    self.on_auth_failure();
                }
            }
            ConnectionEvent::RetryScheduled { attempt, delay } => {
                self.notice(format!(
                    "Connection lost, retrying in {} ms (attempt {attempt})",
                    delay.as_millis()
                ));
            }
            ConnectionEvent::RetriesExhausted { attempts } => {
                debug!(attempts, "Reconnect attempts exhausted");
            }
            ConnectionEvent::Failure(e) if e.requires_reauthentication() => {
                // Handled through the AuthRejected transition.
            }
            ConnectionEvent::Failure(e) => self.notice(e.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn append(&mut self, channel: &str, text: &str, sender: Sender) {
        match self.channels.append(channel, text, sender).cloned() {
            Ok(message) => {
                debug!(channel = %channel, %sender, seq = message.seq, "Message appended");
                self.events.publish(SessionEvent::MessageAppended {
                    channel: channel.to_string(),
                    message,
                });
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Inbound message dropped");
                self.notice(e.to_string());
            }
        }
    }

    fn on_auth_failure(&mut self) {
        self.credentials.clear();
        self.require_authentication();
    }

    fn require_authentication(&mut self) {
        if self.awaiting_auth {
            return;
        }
        self.awaiting_auth = true;
        info!("Authentication required");
        self.auth.reauthentication_required();
        self.events.publish(SessionEvent::AuthenticationRequired);
    }

    fn channel_error(&mut self, error: ChatError) -> ChatError {
        debug_assert!(error.is_channel_error());
        debug!(error = %error, "Channel operation rejected");
        self.notice(error.to_string());
        error
    }

    fn publish_channels(&mut self) {
        self.events
            .publish(SessionEvent::ChannelsChanged(self.channels.summaries()));
    }

    fn notice(&mut self, text: String) {
        self.events.publish(SessionEvent::Notice(text));
    }
}
