//! Runtime configuration from environment variables, with the defaults used in production.

use std::str::FromStr;
use std::time::Duration;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Timings of the sync engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncConfig {
    /// Quiet period before pending edits are written as one batch.
    pub debounce: Duration,
    /// How often viewers pull the live subtree.
    pub poll_interval: Duration,
    /// Inactivity after which live channels are released.
    pub idle_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl SyncConfig {
    /// Override defaults with `SYNC_DEBOUNCE_MS`, `SYNC_POLL_SECS`, `SYNC_IDLE_SECS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            debounce: Duration::from_millis(env_or(
                "SYNC_DEBOUNCE_MS",
                d.debounce.as_millis() as u64,
            )),
            poll_interval: Duration::from_secs(env_or("SYNC_POLL_SECS", d.poll_interval.as_secs())),
            idle_timeout: Duration::from_secs(env_or("SYNC_IDLE_SECS", d.idle_timeout.as_secs())),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often idle documents are swept.
    pub cleanup_interval: Duration,
    /// Documents untouched for this long are removed.
    pub inactivity_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cleanup_interval: Duration::from_secs(30 * 60),
            inactivity_timeout: Duration::from_secs(12 * 3600),
        }
    }
}

impl ServerConfig {
    /// Override defaults with `HOST` and `PORT`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: env_or("HOST", d.host),
            port: env_or("PORT", d.port),
            ..d
        }
    }
}
