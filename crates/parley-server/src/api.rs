use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{HeaderMap, Method},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{bearer_token, TokenCheck};
use crate::chat;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::hub::Hub;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: TokenCheck,
    pub hub: Hub,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            auth: TokenCheck::new(config.accepted_tokens.clone()),
            config: Arc::new(config),
            hub: Hub::default(),
            started_at: Utc::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route(parley_shared::constants::WS_PATH, get(ws_upgrade))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    open_mode: bool,
    tag_channels: bool,
    connections: usize,
    max_connections: usize,
    started_at: DateTime<Utc>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        open_mode: state.config.open_mode(),
        tag_channels: state.config.tag_channels,
        connections: state.hub.connection_count(),
        max_connections: state.config.max_connections,
        started_at: state.started_at,
    })
}

/// Upgrade to a chat WebSocket. The token comes from the `Authorization`
/// header or, for browser clients, the `token` query parameter. It is
/// checked after the upgrade so a rejected client still gets an error frame.
async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Result<Response, ServerError> {
    let max = state.config.max_connections;
    if max > 0 && state.hub.connection_count() >= max {
        return Err(ServerError::AtCapacity(max));
    }

    let token = bearer_token(&headers).or_else(|| params.get("token").cloned());
    Ok(ws.on_upgrade(move |socket| chat::run_connection(socket, state, token)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting HTTP server");
    serve_listener(state, listener).await
}

pub async fn serve_listener(
    state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::Message;

    use parley_shared::OutboundEnvelope;

    use super::*;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn spawn_server(config: ServerConfig) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(AppState::new(config), listener));
        addr
    }

    async fn connect(addr: std::net::SocketAddr, token: &str) -> Client {
        let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("authorization", format!("Bearer {token}").parse().unwrap());
        let (ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        ws
    }

    async fn next_text(ws: &mut Client) -> Option<String> {
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next()).await.ok()??;
        match next.ok()? {
            Message::Text(text) => Some(text.to_string()),
            _ => None,
        }
    }

    fn envelope(text: &str, token: &str) -> Message {
        Message::Text(
            OutboundEnvelope {
                text: text.into(),
                credential: token.into(),
                channel: "General".into(),
            }
            .to_frame()
            .unwrap(),
        )
    }

    fn config(tokens: &[&str]) -> ServerConfig {
        ServerConfig {
            accepted_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_messages_reach_other_clients_only() {
        let addr = spawn_server(config(&["abc"])).await;
        let mut alice = connect(addr, "abc").await;
        let mut bob = connect(addr, "abc").await;

        // Both sockets must be registered with the hub before relaying.
        tokio::time::sleep(Duration::from_millis(100)).await;

        alice.send(envelope("hello", "abc")).await.unwrap();
        assert_eq!(next_text(&mut bob).await.as_deref(), Some("hello"));

        bob.send(envelope("hi there", "abc")).await.unwrap();
        assert_eq!(next_text(&mut alice).await.as_deref(), Some("hi there"));
    }

    #[tokio::test]
    async fn test_invalid_token_gets_error_then_close() {
        let addr = spawn_server(config(&["abc"])).await;
        let mut mallory = connect(addr, "bad").await;

        assert_eq!(
            next_text(&mut mallory).await.as_deref(),
            Some(r#"{"error":"invalid token"}"#)
        );
    }

    #[tokio::test]
    async fn test_query_token_is_accepted() {
        let addr = spawn_server(config(&["abc"])).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token=abc"))
            .await
            .unwrap();
        let mut other = connect(addr, "abc").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        other.send(envelope("via header", "abc")).await.unwrap();
        assert_eq!(next_text(&mut ws).await.as_deref(), Some("via header"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let addr = spawn_server(ServerConfig::default()).await;
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));
    }
}
