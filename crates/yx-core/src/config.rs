//! Configuration system for YX.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $YX_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/yx/config.toml
//!   3. ~/.config/yx/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Peers sending faster than this may be dropped by receivers running the
/// normative default, so configuring a smaller window is warned loudly.
pub const RATE_LIMIT_FLOOR: usize = 10_000;

/// Top-level configuration. Field meanings and defaults are part of the
/// cross-implementation contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YxConfig {
    /// UDP bind port.
    pub listen_port: u16,
    /// UDP bind address.
    pub listen_addr: String,
    /// Set SO_BROADCAST on the socket.
    pub broadcast: bool,
    /// Allow multiple cooperating listeners on one port.
    pub reuse_port: bool,
    /// If false, datagrams bearing the local GUID are dropped.
    pub process_own_packets: bool,
    /// Max payload bytes per binary chunk.
    pub chunk_size: usize,
    /// Seconds before a partial reassembly buffer is discarded.
    pub buffer_timeout_secs: f64,
    /// Seconds a completed (channel, sequence) suppresses repeats.
    pub dedup_window_secs: f64,
    /// Seconds a packet nonce is retained for replay suppression.
    pub replay_max_age_secs: f64,
    /// Successful inserts between replay-cache GC sweeps.
    pub replay_cleanup_interval: u32,
    /// Rate-limit count per window.
    pub max_requests: usize,
    /// Rate-limit window in seconds.
    pub window_secs: f64,
    /// GUID hex values exempt from rate limiting.
    pub trusted_guids: Vec<String>,
    /// Append-only forensic log of failed MAC verifications.
    pub failure_log_path: PathBuf,
}

impl Default for YxConfig {
    fn default() -> Self {
        Self {
            listen_port: 50_000,
            listen_addr: "0.0.0.0".to_string(),
            broadcast: true,
            reuse_port: true,
            process_own_packets: true,
            chunk_size: 1024,
            buffer_timeout_secs: 60.0,
            dedup_window_secs: 5.0,
            replay_max_age_secs: 300.0,
            replay_cleanup_interval: 100,
            max_requests: 10_000,
            window_secs: 60.0,
            trusted_guids: Vec::new(),
            failure_log_path: PathBuf::from("/tmp/hmac_failures.log"),
        }
    }
}

impl YxConfig {
    /// Load config: env vars → file → defaults. Validated before return.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            YxConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("YX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Construction-time validation. Never recovered internally — a bad
    /// config is the caller's problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidConfig("chunk_size must be at least 1"));
        }
        if self.buffer_timeout_secs <= 0.0
            || self.dedup_window_secs <= 0.0
            || self.replay_max_age_secs <= 0.0
            || self.window_secs <= 0.0
        {
            return Err(ConfigError::InvalidConfig("time windows must be positive"));
        }
        if self.replay_cleanup_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "replay_cleanup_interval must be at least 1",
            ));
        }
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidConfig("max_requests must be at least 1"));
        }
        if self.max_requests < RATE_LIMIT_FLOOR {
            // Interoperability footgun: a lower limit silently drops
            // legitimate traffic from peers tuned to the normative default.
            tracing::warn!(
                max_requests = self.max_requests,
                floor = RATE_LIMIT_FLOOR,
                "max_requests below the normative minimum — high-frequency peers will be dropped"
            );
        }
        Ok(())
    }

    pub fn buffer_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_timeout_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs_f64(self.dedup_window_secs)
    }

    pub fn replay_max_age(&self) -> Duration {
        Duration::from_secs_f64(self.replay_max_age_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_secs)
    }

    /// Apply YX_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("YX_LISTEN_PORT") {
            if let Ok(p) = v.parse() {
                self.listen_port = p;
            }
        }
        if let Ok(v) = std::env::var("YX_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Ok(v) = std::env::var("YX_BROADCAST") {
            self.broadcast = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("YX_REUSE_PORT") {
            self.reuse_port = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("YX_PROCESS_OWN_PACKETS") {
            self.process_own_packets = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("YX_CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("YX_FAILURE_LOG") {
            self.failure_log_path = PathBuf::from(v);
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("yx")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {1}", .0.display())]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {}: {1}", .0.display())]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
