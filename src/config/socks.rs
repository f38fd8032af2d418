//! SOCKS and resolver configuration types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default BIND accept timeout in milliseconds
fn default_bind_timeout_ms() -> u64 {
    120_000
}

fn default_auth_methods() -> Vec<AuthMethodKind> {
    vec![AuthMethodKind::None]
}

/// Default DNS resolver address
fn default_resolver_address() -> SocketAddr {
    SocketAddr::from(([8, 8, 8, 8], 53))
}

/// Default DNS round trip timeout in milliseconds
fn default_resolver_timeout_ms() -> u64 {
    5_000
}

/// Authentication methods that can be enabled from configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethodKind {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

/// SOCKS server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocksConfig {
    /// Accept SOCKS4 clients
    #[serde(default)]
    pub allow_socks4: bool,

    /// Supported authentication methods, in server preference order
    #[serde(default = "default_auth_methods")]
    pub auth_methods: Vec<AuthMethodKind>,

    /// Username accepted by the built-in verifier
    #[serde(default)]
    pub username: Option<String>,

    /// Password accepted by the built-in verifier
    #[serde(default)]
    pub password: Option<String>,

    /// How long BIND waits for the inbound connection, in milliseconds
    #[serde(default = "default_bind_timeout_ms")]
    pub bind_timeout_ms: u64,
}

impl Default for SocksConfig {
    fn default() -> Self {
        Self {
            allow_socks4: false,
            auth_methods: default_auth_methods(),
            username: None,
            password: None,
            bind_timeout_ms: default_bind_timeout_ms(),
        }
    }
}

impl SocksConfig {
    /// Check if authentication credentials are configured
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Configured methods, falling back to no-authentication when empty
    pub fn effective_auth_methods(&self) -> Vec<AuthMethodKind> {
        if self.auth_methods.is_empty() {
            default_auth_methods()
        } else {
            self.auth_methods.clone()
        }
    }

    /// BIND accept timeout
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_methods.contains(&AuthMethodKind::Password) && !self.has_credentials() {
            return Err("Password authentication enabled but no credentials configured".to_string());
        }
        if self.bind_timeout_ms == 0 {
            return Err("bind_timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// DNS resolver configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Address of the upstream DNS server
    #[serde(default = "default_resolver_address")]
    pub address: SocketAddr,

    /// Round trip timeout in milliseconds
    #[serde(default = "default_resolver_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            address: default_resolver_address(),
            timeout_ms: default_resolver_timeout_ms(),
        }
    }
}

impl ResolverConfig {
    /// Round trip timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("resolver timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}
