//! Server configuration types
//!
//! Defines the root configuration and the listening socket settings.

use super::{ResolverConfig, SocksConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default listening host
fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default listening port
fn default_port() -> u16 {
    5001
}

/// Default keepalive seconds
fn default_keepalive_secs() -> u64 {
    20
}

/// Default keepalive interval
fn default_keepalive_interval() -> u64 {
    8
}

fn default_nodelay() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SOCKS protocol configuration
    #[serde(default)]
    pub socks: SocksConfig,

    /// Name resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Config {
    /// Validate the whole configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server.tcp.validate()?;
        self.socks.validate()?;
        self.resolver.validate()?;
        Ok(())
    }
}

/// Listening socket configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Hostname or IP address to listen on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Options applied to client and target sockets
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Listening address as `host:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TCP socket options
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TcpConfig {
    /// Enable TCP_NODELAY
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,

    /// TCP keepalive timeout in seconds (0 disables keepalive)
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// TCP keepalive interval in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: default_nodelay(),
            keepalive_secs: default_keepalive_secs(),
            keepalive_interval: default_keepalive_interval(),
        }
    }
}

impl TcpConfig {
    /// Keepalive idle time, if enabled
    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }

    /// Validate keepalive settings
    pub fn validate(&self) -> Result<(), String> {
        if self.keepalive_secs > 0 && self.keepalive_interval == 0 {
            return Err("keepalive_interval must be greater than 0 when keepalive is enabled".to_string());
        }
        Ok(())
    }
}
