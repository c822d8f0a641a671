//! Thin wrapper around `tokio-tungstenite`.
//!
//! [`connect`] builds the upgrade request (URL plus headers), performs the
//! handshake and returns split ([`WsWriter`], [`WsReader`]) halves ready for
//! a `tokio::select!` loop.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::transport::TransportError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    pub async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    /// Flush pending writes and close the sink.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Next message, or `None` when the stream ends. Raw frames are skipped.
    pub async fn recv(&mut self) -> Option<Result<WsMessage, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Read(e.to_string()))),
            };
            let converted = match message {
                tungstenite::Message::Text(text) => WsMessage::Text(text.to_string()),
                tungstenite::Message::Binary(data) => WsMessage::Binary(data.to_vec()),
                tungstenite::Message::Ping(data) => WsMessage::Ping(data.to_vec()),
                tungstenite::Message::Pong(data) => WsMessage::Pong(data.to_vec()),
                tungstenite::Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    WsMessage::Close { code, reason }
                }
                tungstenite::Message::Frame(_) => continue,
            };
            return Some(Ok(converted));
        }
    }
}

/// Connect to `url`, inserting each `(name, value)` header into the upgrade
/// request.
///
/// A non-101 HTTP answer is reported as [`TransportError::Refused`] so the
/// caller can tell a refused credential from a network failure.
pub async fn connect(
    url: &str,
    headers: &[(&str, &str)],
) -> Result<(WsWriter, WsReader), TransportError> {
    use tungstenite::client::IntoClientRequest;

    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::InvalidRequest(format!("{url}: {e}")))?;

    for &(name, value) in headers {
        let header_name = tungstenite::http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        let header_value = tungstenite::http::HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        request.headers_mut().insert(header_name, header_value);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| match e {
            tungstenite::Error::Http(response) => TransportError::Refused(response.status().as_u16()),
            other => TransportError::Handshake(other.to_string()),
        })?;

    let (sink, stream) = ws_stream.split();

    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to the WS(S) scheme. `ws://` and `wss://` pass
/// through unchanged.
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}
