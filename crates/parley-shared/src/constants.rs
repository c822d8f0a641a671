/// Application name
pub const APP_NAME: &str = "Parley";

/// Name of the channel that always exists and can never be deleted
pub const DEFAULT_CHANNEL: &str = "General";

/// Default backend address used by the terminal client
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:4000/ws";

/// Path of the WebSocket endpoint on the backend
pub const WS_PATH: &str = "/ws";

/// Default HTTP port of the development backend
pub const DEFAULT_HTTP_PORT: u16 = 4000;

/// Maximum size of a single text frame in bytes (64 KiB)
pub const MAX_FRAME_SIZE: usize = 65_536;

/// Reconnect backoff defaults
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// Lower-cased fragments that mark a backend error as an authentication failure.
pub const AUTH_FAILURE_MARKERS: &[&str] = &[
    "unauthorized",
    "invalid token",
    "invalid credential",
    "authentication",
    "forbidden",
];
