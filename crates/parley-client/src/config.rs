//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so `parley` starts against a local
//! development backend without any configuration.

use std::time::Duration;

use parley_net::ReconnectPolicy;
use parley_shared::constants::DEFAULT_SERVER_URL;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat backend. `http(s)://` is accepted and
    /// rewritten to `ws(s)://`.
    /// Env: `PARLEY_SERVER_URL`
    pub server_url: String,

    /// Bearer token used at startup.
    /// Env: `PARLEY_TOKEN`
    /// Default: none (the user logs in with `/login`).
    pub token: Option<String>,

    /// Env: `PARLEY_BACKOFF_INITIAL_MS`, `PARLEY_BACKOFF_MAX_MS`,
    /// `PARLEY_MAX_RECONNECTS`
    pub reconnect: ReconnectPolicy,

    /// Route inbound `{"text", "channel"}` frames to their labelled channel
    /// instead of the selected one.
    /// Env: `PARLEY_TAGGED_CHANNELS` (true/false)
    pub tagged_channels: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            reconnect: ReconnectPolicy::default(),
            tagged_channels: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PARLEY_SERVER_URL") {
            if url.trim().is_empty() {
                tracing::warn!("Empty PARLEY_SERVER_URL, using default");
            } else {
                config.server_url = url.trim().to_string();
            }
        }

        if let Some(token) = lookup("PARLEY_TOKEN") {
            if !token.trim().is_empty() {
                config.token = Some(token);
            }
        }

        match parse_number::<u64>(&lookup, "PARLEY_BACKOFF_INITIAL_MS") {
            Some(0) => tracing::warn!("PARLEY_BACKOFF_INITIAL_MS must be positive, using default"),
            Some(ms) => config.reconnect.initial_delay = Duration::from_millis(ms),
            None => {}
        }
        if let Some(ms) = parse_number::<u64>(&lookup, "PARLEY_BACKOFF_MAX_MS") {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(n) = parse_number::<u32>(&lookup, "PARLEY_MAX_RECONNECTS") {
            config.reconnect.max_attempts = n;
        }

        if config.reconnect.max_delay < config.reconnect.initial_delay {
            tracing::warn!(
                initial_ms = config.reconnect.initial_delay.as_millis() as u64,
                max_ms = config.reconnect.max_delay.as_millis() as u64,
                "Backoff cap below initial delay, raising cap"
            );
            config.reconnect.max_delay = config.reconnect.initial_delay;
        }

        if let Some(val) = lookup("PARLEY_TAGGED_CHANNELS") {
            config.tagged_channels = val != "false" && val != "0";
        }

        config
    }
}

fn parse_number<N: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<N> {
    let raw = lookup(key)?;
    match raw.trim().parse::<N>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid number, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.token.is_none());
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert!(!config.tagged_channels);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PARLEY_SERVER_URL", "wss://chat.example/ws"),
            ("PARLEY_TOKEN", "abc"),
            ("PARLEY_BACKOFF_INITIAL_MS", "250"),
            ("PARLEY_BACKOFF_MAX_MS", "4000"),
            ("PARLEY_MAX_RECONNECTS", "3"),
            ("PARLEY_TAGGED_CHANNELS", "true"),
        ]);
        assert_eq!(config.server_url, "wss://chat.example/ws");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.reconnect.initial_delay, Duration::from_millis(250));
        assert_eq!(config.reconnect.max_delay, Duration::from_millis(4000));
        assert_eq!(config.reconnect.max_attempts, 3);
        assert!(config.tagged_channels);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("PARLEY_MAX_RECONNECTS", "lots"),
            ("PARLEY_TOKEN", "   "),
            ("PARLEY_BACKOFF_INITIAL_MS", "5000"),
            ("PARLEY_BACKOFF_MAX_MS", "100"),
        ]);
        assert_eq!(
            config.reconnect.max_attempts,
            ReconnectPolicy::default().max_attempts
        );
        assert!(config.token.is_none());
        assert_eq!(config.reconnect.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_zero_initial_backoff_keeps_default() {
        let config = config(&[("PARLEY_BACKOFF_INITIAL_MS", "0")]);
        assert_eq!(
            config.reconnect.initial_delay,
            ReconnectPolicy::default().initial_delay
        );
        assert!(config.reconnect.initial_delay > Duration::ZERO);
    }
}
