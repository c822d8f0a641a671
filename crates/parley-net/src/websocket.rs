//! [`Transport`] over a real WebSocket.
//!
//! Each `open` spawns one connection task. The task owns both socket halves
//! and reports back through an unbounded channel of [`TransportEvent`]s;
//! outbound frames reach it through a second channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transport::{ConnectRequest, Transport, TransportError, TransportEvent, TransportEventKind};
use crate::ws::{self, WsMessage};

#[derive(Debug)]
pub struct WsTransport {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Events from every connection this transport opens are delivered on
    /// `events_tx`.
    pub fn new(events_tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events_tx,
            outbound: None,
            task: None,
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, request: ConnectRequest) {
        self.close();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let events_tx = self.events_tx.clone();
        self.outbound = Some(outbound_tx);
        self.task = Some(tokio::spawn(run_connection(request, events_tx, outbound_rx)));
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    request: ConnectRequest,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let generation = request.generation;
    let emit = |kind: TransportEventKind| {
        let _ = events_tx.send(TransportEvent::new(generation, kind));
    };

    let url = ws::http_to_ws_scheme(&request.url);
    let bearer = format!("Bearer {}", request.credential.as_str());
    debug!(url = %url, generation, "Opening WebSocket");

    let (mut writer, mut reader) = match ws::connect(&url, &[("Authorization", &bearer)]).await {
        Ok(halves) => halves,
        Err(e) if e.is_auth_refusal() => {
            emit(TransportEventKind::Rejected(e.to_string()));
            return;
        }
        Err(e) => {
            emit(TransportEventKind::Failed(e.to_string()));
            return;
        }
    };

    info!(url = %url, generation, "WebSocket established");
    emit(TransportEventKind::Established);

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = writer.send_text(&frame).await {
                            emit(TransportEventKind::Dropped(e.to_string()));
                            return;
                        }
                    }
                    None => {
                        // Transport closed by the owner.
                        let _ = writer.close().await;
                        return;
                    }
                }
            }
            message = reader.recv() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => emit(TransportEventKind::Frame(text)),
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = writer.send_pong(data).await {
                            emit(TransportEventKind::Dropped(e.to_string()));
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Binary(data))) => {
                        debug!(len = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        info!(code, reason = %reason, "Backend closed the connection");
                        emit(TransportEventKind::Dropped(format!("closed by backend ({code})")));
                        return;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read failed");
                        emit(TransportEventKind::Dropped(e.to_string()));
                        return;
                    }
                    None => {
                        emit(TransportEventKind::Dropped("stream ended".into()));
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use parley_shared::Credential;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::Message;

    /// Single-connection echo backend that only accepts `Bearer good`.
    async fn spawn_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let check = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        let authorized = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            == Some("Bearer good");
                        if authorized {
                            Ok(resp)
                        } else {
                            let mut refused = ErrorResponse::new(Some("unauthorized".into()));
                            *refused.status_mut() =
                                tokio_tungstenite::tungstenite::http::StatusCode::UNAUTHORIZED;
                            Err(refused)
                        }
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, check).await else {
                        return;
                    };
                    while let Some(Ok(message)) = ws.next().await {
                        if let Message::Text(text) = message {
                            let _ = ws.send(Message::Text(format!("echo:{text}"))).await;
                        }
                    }
                });
            }
        });

        format!("ws://{addr}/ws")
    }

    fn request(url: &str, token: &str) -> ConnectRequest {
        ConnectRequest {
            generation: 7,
            url: url.to_string(),
            credential: Credential::new(token).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_open_send_and_receive() {
        let url = spawn_backend().await;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new(events_tx);

        transport.open(request(&url, "good"));
        let established = events_rx.recv().await.unwrap();
        assert_eq!(established, TransportEvent::new(7, TransportEventKind::Established));

        transport.send("hello".into()).unwrap();
        let echoed = events_rx.recv().await.unwrap();
        assert_eq!(
            echoed,
            TransportEvent::new(7, TransportEventKind::Frame("echo:hello".into()))
        );

        transport.close();
        assert_eq!(transport.send("late".into()), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_bad_credential_is_rejected() {
        let url = spawn_backend().await;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new(events_tx);

        transport.open(request(&url, "bad"));
        let event = events_rx.recv().await.unwrap();
        assert!(matches!(event.kind, TransportEventKind::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut transport = WsTransport::new(events_tx);
        transport.open(request(&format!("ws://{addr}/ws"), "good"));

        let event = events_rx.recv().await.unwrap();
        assert!(matches!(event.kind, TransportEventKind::Failed(_)));
    }
}
