//! Connection state machine.
//!
//! ```text
//!                 connect(cred)            established
//!  Disconnected ───────────────► Connecting ───────────► Connected
//!       ▲                          │   ▲                   │   │
//!       │ retries exhausted        │   │ backoff elapsed   │   │ auth error
//!       ├──────────────────────────┤   │                   │   ▼
//!       │                  failure ▼   │          dropped  │ AuthRejected
//!       └──────────────────── Reconnecting ◄───────────────┘
//! ```
//!
//! `disconnect()` returns to `Disconnected` from every state. Every connect
//! attempt gets a fresh generation number; transport events and timer
//! firings from an older generation are ignored, so a late "established"
//! after `disconnect()` cannot resurrect the connection.
//!
//! The manager is synchronous and never blocks. Handshakes and backoff
//! waits happen elsewhere (in the [`Transport`] and the [`Scheduler`]) and
//! come back through [`ConnectionManager::handle_transport_event`] and
//! [`ConnectionManager::handle_retry`].

use std::time::Duration;

use tracing::{debug, info, warn};

use parley_shared::{ChatError, Credential, InboundPayload, OutboundEnvelope};

use crate::backoff::ReconnectPolicy;
use crate::bus::{EventBus, Subscription, SubscriptionId};
use crate::scheduler::{RetryToken, Scheduler};
use crate::transport::{ConnectRequest, Transport, TransportEvent, TransportEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    AuthRejected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::AuthRejected => "auth-rejected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Notifications published by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Payload received while `Connected`.
    Inbound(InboundPayload),
    RetryScheduled {
        attempt: u32,
        delay: Duration,
    },
    /// The retry budget ran out; the manager is back in `Disconnected`.
    RetriesExhausted { attempts: u32 },
    /// Reportable failure: `AuthRejected`, or `TransportFailure` when the
    /// retry budget ran out. Write failures are returned by `send` instead.
    Failure(ChatError),
}

pub struct ConnectionManager<T, S> {
    url: String,
    policy: ReconnectPolicy,
    transport: T,
    scheduler: S,
    events: EventBus<ConnectionEvent>,
    state: ConnectionState,
    /// Snapshot taken at connect time; reused for every retry.
    credential: Option<Credential>,
    generation: u64,
    /// Retries used since the last successful handshake.
    attempts: u32,
    pending_retry: Option<RetryToken>,
}

impl<T: Transport, S: Scheduler> ConnectionManager<T, S> {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, transport: T, scheduler: S) -> Self {
        Self {
            url: url.into(),
            policy,
            transport,
            scheduler,
            events: EventBus::new(),
            state: ConnectionState::Disconnected,
            credential: None,
            generation: 0,
            attempts: 0,
            pending_retry: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Retries used since the last successful handshake.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&mut self) -> Subscription<ConnectionEvent> {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Public contract
    // ------------------------------------------------------------------

    /// Attach `credential` and begin a handshake.
    ///
    /// Fails with `NoCredential` (state unchanged) when no credential is
    /// given. A no-op while already `Connecting`/`Connected` with the same
    /// credential; any other state is torn down and restarted.
    pub fn connect(&mut self, credential: Option<&Credential>) -> Result<(), ChatError> {
        let Some(credential) = credential else {
            warn!(url = %self.url, "Connect refused: no credential");
            return Err(ChatError::NoCredential);
        };

        let in_progress = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        );
        if in_progress && self.credential.as_ref() == Some(credential) {
            debug!(state = %self.state, "Connect ignored, already in progress");
            return Ok(());
        }

        if self.state != ConnectionState::Disconnected {
            self.teardown();
        }

        self.credential = Some(credential.clone());
        self.attempts = 0;
        self.open();
        Ok(())
    }

    /// Send one message envelope. Only valid while `Connected`.
    pub fn send(
        &mut self,
        channel: &str,
        text: &str,
        credential: Option<&Credential>,
    ) -> Result<(), ChatError> {
        if self.state != ConnectionState::Connected {
            return Err(ChatError::NotConnected);
        }
        let credential = credential.ok_or(ChatError::NoCredential)?;

        let frame = OutboundEnvelope {
            text: text.to_string(),
            credential: credential.as_str().to_string(),
            channel: channel.to_string(),
        }
        .to_frame()
        .map_err(|e| ChatError::Protocol(e.to_string()))?;

        if let Err(e) = self.transport.send(frame) {
            let error = ChatError::TransportFailure(e.to_string());
            warn!(channel = %channel, error = %e, "Send failed, treating connection as dropped");
            self.on_transport_lost(&e.to_string());
            return Err(error);
        }

        debug!(channel = %channel, len = text.len(), "Message sent");
        Ok(())
    }

    /// Tear down the transport, cancel pending retries and return to
    /// `Disconnected`. Always succeeds; idempotent.
    pub fn disconnect(&mut self) {
        self.teardown();
        self.credential = None;
        self.attempts = 0;
        if self.state != ConnectionState::Disconnected {
            info!(url = %self.url, "Disconnected");
        }
        self.transition(ConnectionState::Disconnected);
    }

    // ------------------------------------------------------------------
    // Event inputs
    // ------------------------------------------------------------------

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if event.generation != self.generation {
            debug!(
                event_generation = event.generation,
                current = self.generation,
                "Ignoring transport event from abandoned attempt"
            );
            return;
        }

        match event.kind {
            TransportEventKind::Established => {
                if self.state == ConnectionState::Connecting {
                    info!(url = %self.url, retries = self.attempts, "Connected");
                    self.attempts = 0;
                    self.transition(ConnectionState::Connected);
                }
            }
            TransportEventKind::Frame(frame) => {
                if self.state != ConnectionState::Connected {
                    debug!(state = %self.state, "Dropping frame received outside Connected");
                    return;
                }
                let payload = InboundPayload::parse(&frame);
                let auth_failure = payload.is_auth_failure();
                let reason = match &payload {
                    InboundPayload::Error { error } => Some(error.clone()),
                    InboundPayload::Text { .. } => None,
                };
                self.events.publish(ConnectionEvent::Inbound(payload));
                if auth_failure {
                    self.reject(reason.unwrap_or_default());
                }
            }
            TransportEventKind::Failed(reason) => {
                if self.state == ConnectionState::Connecting {
                    warn!(url = %self.url, reason = %reason, "Handshake failed");
                    self.on_transport_lost(&reason);
                }
            }
            TransportEventKind::Dropped(reason) => {
                if matches!(
                    self.state,
                    ConnectionState::Connected | ConnectionState::Connecting
                ) {
                    warn!(url = %self.url, reason = %reason, "Connection dropped");
                    self.on_transport_lost(&reason);
                }
            }
            TransportEventKind::Rejected(reason) => {
                if matches!(
                    self.state,
                    ConnectionState::Connected | ConnectionState::Connecting
                ) {
                    self.reject(reason);
                }
            }
        }
    }

    /// Backoff timer fired. Tokens other than the pending one are stale.
    pub fn handle_retry(&mut self, token: RetryToken) {
        if self.state != ConnectionState::Reconnecting || self.pending_retry != Some(token) {
            debug!(attempt = token.attempt, "Ignoring stale retry timer");
            return;
        }
        self.pending_retry = None;
        info!(attempt = token.attempt, url = %self.url, "Reconnecting");
        self.open();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn open(&mut self) {
        let Some(credential) = self.credential.clone() else {
            self.transition(ConnectionState::Disconnected);
            return;
        };
        self.generation += 1;
        self.pending_retry = None;
        self.transition(ConnectionState::Connecting);
        self.transport.open(ConnectRequest {
            generation: self.generation,
            url: self.url.clone(),
            credential,
        });
    }

    /// Abandon the current attempt: cancel the timer, invalidate the
    /// generation and close the transport.
    fn teardown(&mut self) {
        if let Some(token) = self.pending_retry.take() {
            self.scheduler.cancel(token);
        }
        self.generation += 1;
        self.transport.close();
    }

    fn reject(&mut self, reason: String) {
        warn!(url = %self.url, reason = %reason, "Credential rejected by backend");
        self.teardown();
        self.credential = None;
        self.attempts = 0;
        self.events
            .publish(ConnectionEvent::Failure(ChatError::AuthRejected(reason)));
        self.transition(ConnectionState::AuthRejected);
    }

    fn on_transport_lost(&mut self, reason: &str) {
        self.transport.close();

        let next = self.attempts + 1;
        if !self.policy.allows(next) {
            warn!(
                url = %self.url,
                attempts = self.attempts,
                "Reconnect budget exhausted"
            );
            self.teardown();
            self.credential = None;
            self.events.publish(ConnectionEvent::RetriesExhausted {
                attempts: self.attempts,
            });
            self.events
                .publish(ConnectionEvent::Failure(ChatError::TransportFailure(format!(
                    "{reason} (gave up after {} retries)",
                    self.attempts
                ))));
            self.attempts = 0;
            self.transition(ConnectionState::Disconnected);
            return;
        }

        self.attempts = next;
        let delay = self.policy.delay_for(next);
        let token = RetryToken {
            generation: self.generation,
            attempt: next,
        };
        self.scheduler.schedule(delay, token);
        self.pending_retry = Some(token);
        self.transition(ConnectionState::Reconnecting);
        self.events.publish(ConnectionEvent::RetryScheduled {
            attempt: next,
            delay,
        });
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(%from, %to, "Connection state changed");
        self.events
            .publish(ConnectionEvent::StateChanged { from, to });
    }
}
