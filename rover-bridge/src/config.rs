//! Client-side bridge configuration.
//!
//! Loaded from TOML (every field optional) or from the `ROVER_*`
//! environment variables used by the command-line tools.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where and how to reach the simulator bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Simulator host name or IP
    #[serde(default = "default_host")]
    pub host: String,

    /// Simulator TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Artificial latency slept before every command (ms)
    #[serde(default)]
    pub command_latency_ms: u64,

    /// Read deadline for frame responses (ms). Absent means block forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5555
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            command_latency_ms: 0,
            read_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents).map_err(|e| {
            Error::Config(format!(
                "failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Defaults overridden by `ROVER_HOST`, `ROVER_PORT` and `ROVER_LATENCY_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("ROVER_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("ROVER_PORT") {
            config.port = parse_var("ROVER_PORT", &port)?;
        }
        if let Some(latency) = lookup("ROVER_LATENCY_MS") {
            config.command_latency_ms = parse_var("ROVER_LATENCY_MS", &latency)?;
        }
        Ok(config)
    }

    /// `host:port` string for [`std::net::TcpStream::connect`]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn command_latency(&self) -> Duration {
        Duration::from_millis(self.command_latency_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Parse one environment value, naming the variable on failure.
pub fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}={:?}: {}", name, value, e)))
}
