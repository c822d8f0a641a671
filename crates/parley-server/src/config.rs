//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;

use parley_shared::constants::{DEFAULT_HTTP_PORT, MAX_FRAME_SIZE};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP + WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:4000`
    pub http_addr: SocketAddr,

    /// Bearer tokens accepted on `/ws`, comma separated.
    /// Env: `ACCEPTED_TOKENS`
    /// Default: empty, meaning open mode (any non-empty token is accepted).
    pub accepted_tokens: Vec<String>,

    /// Relay frames as `{"text", "channel"}` instead of plain text.
    /// Env: `TAG_CHANNELS` (true/false)
    /// Default: `false`
    pub tag_channels: bool,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Parley dev server"`
    pub instance_name: String,

    /// Maximum number of concurrent WebSocket connections (0 = unlimited).
    /// Env: `MAX_CONNECTIONS`
    /// Default: `0`
    pub max_connections: usize,

    /// Largest accepted text frame in bytes.
    pub max_frame_size: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("accepted_tokens", &self.accepted_tokens.len())
            .field("tag_channels", &self.tag_channels)
            .field("instance_name", &self.instance_name)
            .field("max_connections", &self.max_connections)
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            accepted_tokens: Vec::new(),
            tag_channels: false,
            instance_name: "Parley dev server".to_string(),
            max_connections: 0,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(tokens) = std::env::var("ACCEPTED_TOKENS") {
            config.accepted_tokens = parse_token_list(&tokens);
        }

        if let Ok(val) = std::env::var("TAG_CHANNELS") {
            config.tag_channels = val != "false" && val != "0";
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("MAX_CONNECTIONS") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_connections = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_CONNECTIONS, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// No token list configured: any non-empty token is accepted.
    pub fn open_mode(&self) -> bool {
        self.accepted_tokens.is_empty()
    }
}

fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
