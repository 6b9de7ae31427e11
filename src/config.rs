// src/config.rs
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Public relay the client talks to by default.
pub const DEFAULT_RELAY_URL: &str = "https://www.iranguard.workers.dev";
pub const REGISTRATION_UPSTREAM: &str = "https://api.cloudflareclient.com/v0a2158/reg";
/// Deployment-specific key generator; set `RELAY_KEYS_UPSTREAM` for a real one.
pub const KEYS_UPSTREAM: &str = "https://keygen.invalid/keys";

pub const KEYS_PATH: &str = "/keys";
pub const REGISTRATION_PATH: &str = "/wg";

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_or(name, default_ms))
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub upstream_timeout: Duration,
    pub keys_upstream: String,
    pub registration_upstream: String,
    pub max_body_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            upstream_timeout: Duration::from_secs(10),
            keys_upstream: KEYS_UPSTREAM.into(),
            registration_upstream: REGISTRATION_UPSTREAM.into(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind: env_or("RELAY_BIND", d.bind),
            upstream_timeout: env_ms("RELAY_UPSTREAM_TIMEOUT_MS", 10_000),
            keys_upstream: env_or("RELAY_KEYS_UPSTREAM", d.keys_upstream),
            registration_upstream: env_or("RELAY_REGISTRATION_UPSTREAM", d.registration_upstream),
            max_body_bytes: d.max_body_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the relay, without a trailing path.
    pub relay_url: String,
    pub request_timeout: Duration,
    pub attempt_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.into(),
            request_timeout: Duration::from_secs(15),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            relay_url: env_or("PROVISION_RELAY_URL", DEFAULT_RELAY_URL.to_string()),
            request_timeout: env_ms("PROVISION_REQUEST_TIMEOUT_MS", 15_000),
            attempt_timeout: env_ms("PROVISION_ATTEMPT_TIMEOUT_MS", 30_000),
        }
    }

    pub fn with_relay_url(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            ..Self::default()
        }
    }

    pub fn keys_url(&self) -> String {
        format!("{}{KEYS_PATH}", self.relay_url.trim_end_matches('/'))
    }

    pub fn registration_url(&self) -> String {
        format!("{}{REGISTRATION_PATH}", self.relay_url.trim_end_matches('/'))
    }
}
