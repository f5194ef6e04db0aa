//! Configuration types for hirechat.
//!
//! `MessagingConfig` represents the top-level `config.toml` that controls the
//! event bus buffer, subscription reconnect policy and the HTTP listener.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the messaging service.
///
/// Loaded from `~/.hirechat/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Buffered events per conversation topic before slow subscribers lag.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Seconds a subscription loop waits for an event before re-checking
    /// whether its session is still alive.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_bus_capacity() -> usize {
    256
}

fn default_idle_timeout_secs() -> u64 {
    60
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            bus_capacity: default_bus_capacity(),
            idle_timeout_secs: default_idle_timeout_secs(),
            reconnect: ReconnectConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Capped exponential backoff for resubscribing after `Error`/`Disconnected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> u32 {
    2
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// HTTP/WebSocket listener address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
