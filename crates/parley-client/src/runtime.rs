//! The single task that drives a session.
//!
//! [`SessionRuntime::run`] `select!`s over renderer intents, transport
//! events and retry timer firings. Each input is handed to the session and
//! processed to completion; the resulting session events are forwarded to
//! the renderer before the next input is taken.

use tokio::sync::mpsc;
use tracing::{debug, info};

use parley_net::{
    ConnectionManager, RetryToken, Scheduler, Subscription, TokioScheduler, Transport,
    TransportEvent, WsTransport,
};
use parley_shared::Credential;

use crate::attribution::TaggedChannelAttribution;
use crate::boundary::{AuthProvider, Renderer};
use crate::config::ClientConfig;
use crate::events::SessionEvent;
use crate::session::Session;

/// A user action forwarded by the renderer.
#[derive(Debug, Clone)]
pub enum Intent {
    Send(String),
    Select(String),
    Create(String),
    Delete(String),
    Login(Credential),
    Logout,
    /// Ask the renderer to redraw from a fresh snapshot.
    Refresh,
    Quit,
}

pub struct SessionRuntime<T, S, A, R> {
    session: Session<T, S, A>,
    events: Subscription<SessionEvent>,
    renderer: R,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    retry_rx: mpsc::UnboundedReceiver<RetryToken>,
}

impl<A: AuthProvider, R: Renderer> SessionRuntime<WsTransport, TokioScheduler, A, R> {
    /// Wire a session to a real WebSocket and tokio timers.
    pub fn connect_ws(config: &ClientConfig, auth: A, renderer: R) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (scheduler, retry_rx) = TokioScheduler::new();
        let connection = ConnectionManager::new(
            config.server_url.clone(),
            config.reconnect.clone(),
            WsTransport::new(transport_tx),
            scheduler,
        );

        let mut session = Session::new(connection, auth);
        if config.tagged_channels {
            session = session.with_attribution(Box::new(TaggedChannelAttribution));
        }
        Self::new(session, transport_rx, retry_rx, renderer)
    }
}

impl<T, S, A, R> SessionRuntime<T, S, A, R>
where
    T: Transport,
    S: Scheduler,
    A: AuthProvider,
    R: Renderer,
{
    pub fn new(
        mut session: Session<T, S, A>,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        retry_rx: mpsc::UnboundedReceiver<RetryToken>,
        renderer: R,
    ) -> Self {
        let events = session.subscribe();
        Self {
            session,
            events,
            renderer,
            transport_rx,
            retry_rx,
        }
    }

    /// Run until [`Intent::Quit`] arrives or the intent channel closes.
    /// Returns the renderer so callers can inspect or reuse it.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) -> anyhow::Result<R> {
        self.session.start();
        self.flush();

        loop {
            tokio::select! {
                biased;

                Some(event) = self.transport_rx.recv() => {
                    self.session.handle_transport_event(event);
                }
                Some(token) = self.retry_rx.recv() => {
                    self.session.handle_retry(token);
                }
                intent = intents.recv() => {
                    match intent {
                        None | Some(Intent::Quit) => break,
                        Some(intent) => self.apply(intent),
                    }
                }
            }
            self.flush();
        }

        info!("Session ending");
        self.session.shutdown();
        self.flush();
        Ok(self.renderer)
    }

    fn apply(&mut self, intent: Intent) {
        debug!(?intent, "Intent");
        // Failures are already published as notices.
        let _ = match intent {
            Intent::Send(text) => self.session.send_message(&text),
            Intent::Select(name) => self.session.select_channel(&name),
            Intent::Create(name) => self.session.create_channel(&name),
            Intent::Delete(name) => self.session.delete_channel(&name),
            Intent::Login(credential) => {
                self.session.login(credential);
                Ok(())
            }
            Intent::Logout => {
                self.session.logout();
                Ok(())
            }
            Intent::Refresh => {
                let snapshot = self.session.snapshot();
                self.renderer.render(&snapshot);
                Ok(())
            }
            Intent::Quit => Ok(()),
        };
    }

    fn flush(&mut self) {
        for event in self.events.drain() {
            self.renderer.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parley_net::{ManualScheduler, MemoryTransport, ReconnectPolicy, TransportEventKind};
    use parley_shared::Sender;

    use super::*;
    use crate::boundary::StaticAuthProvider;
    use crate::state::SessionSnapshot;

    #[derive(Default)]
    struct RecordingRenderer {
        events: Vec<SessionEvent>,
        snapshots: Vec<SessionSnapshot>,
    }

    impl Renderer for RecordingRenderer {
        fn on_event(&mut self, event: &SessionEvent) {
            self.events.push(event.clone());
        }

        fn render(&mut self, snapshot: &SessionSnapshot) {
            self.snapshots.push(snapshot.clone());
        }
    }

    #[tokio::test]
    async fn test_runtime_routes_transport_events_and_intents() {
        let transport = MemoryTransport::new();
        let connection = ConnectionManager::new(
            "ws://chat.test/ws",
            ReconnectPolicy::default(),
            transport.clone(),
            ManualScheduler::new(),
        );
        let session = Session::new(connection, StaticAuthProvider::new(Credential::new("abc")));

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (_retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (intent_tx, intent_rx) = mpsc::channel(8);

        // start() opens generation 1; transport events are taken before
        // intents, so the session is connected by the time "hello" is sent.
        transport_tx
            .send(TransportEvent::new(1, TransportEventKind::Established))
            .unwrap();
        transport_tx
            .send(TransportEvent::new(1, TransportEventKind::Frame("hi there".into())))
            .unwrap();
        intent_tx.send(Intent::Send("hello".into())).await.unwrap();
        intent_tx.send(Intent::Refresh).await.unwrap();
        intent_tx.send(Intent::Quit).await.unwrap();

        let runtime = SessionRuntime::new(session, transport_rx, retry_rx, RecordingRenderer::default());
        let renderer = tokio::time::timeout(Duration::from_secs(5), runtime.run(intent_rx))
            .await
            .unwrap()
            .unwrap();

        let appended: Vec<(String, Sender)> = renderer
            .events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::MessageAppended { message, .. } => {
                    Some((message.text.clone(), message.sender))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            appended,
            vec![
                ("hi there".to_string(), Sender::Remote),
                ("hello".to_string(), Sender::Local),
            ]
        );

        assert_eq!(renderer.snapshots.len(), 1);
        assert_eq!(renderer.snapshots[0].history.len(), 2);
        assert_eq!(transport.sent_envelopes().len(), 1);
        assert!(!transport.is_open());
    }
}
