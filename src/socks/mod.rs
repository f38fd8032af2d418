//! SOCKS module for Socksrelay
//!
//! This module implements the SOCKS4 and SOCKS5 protocols: the handshake,
//! authentication, CONNECT and BIND commands, and the byte relay that
//! follows a successful command.

mod auth;
mod bind;
mod command;
mod consts;
mod handler;
mod tcp_relay;
mod types;

pub use auth::{
    authenticate, select_auth_method, AuthMethod, CredentialVerifier, NoAuth, PasswordAuth,
    StaticCredentials,
};
pub use bind::{handle_tcp_bind, peer_matches};
pub use command::{build_reply, read_request, read_version, send_reply};
pub use consts::*;
pub use handler::{handle_socks_on_stream, negotiate, Session};
pub use tcp_relay::{handle_tcp_connect, relay_tcp, RelayStats};
pub use types::{AddressKind, Host, ProtocolVersion, SocksCommand, SocksRequest, TargetAddr};

use crate::config::{AuthMethodKind, Config, ResolverConfig, SocksConfig};
use crate::dns::Resolver;
use crate::transport::SocketOpts;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Shared, read-only state for every connection
///
/// Built once at startup and handed to each connection task.
#[derive(Debug, Clone)]
pub struct SocksContext {
    /// Accept SOCKS4 clients
    pub allow_socks4: bool,
    /// Supported authentication methods, in preference order
    pub auth_methods: Vec<AuthMethod>,
    /// How long BIND waits for the inbound connection
    pub bind_timeout: Duration,
    /// Resolver for domain targets
    pub resolver: Resolver,
    /// Options applied to client and outbound sockets
    pub socket_opts: SocketOpts,
}

impl Default for SocksContext {
    fn default() -> Self {
        SocksContext {
            allow_socks4: false,
            auth_methods: vec![AuthMethod::None],
            bind_timeout: SocksConfig::default().bind_timeout(),
            resolver: Resolver::from_config(&ResolverConfig::default()),
            socket_opts: SocketOpts::default(),
        }
    }
}

impl SocksContext {
    /// Build the context from a validated configuration
    ///
    /// The password method uses the configured username and password.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!(e))
            .with_context(|| "Invalid configuration")?;

        let socks = &config.socks;
        let auth_methods = socks
            .effective_auth_methods()
            .into_iter()
            .map(|kind| match kind {
                AuthMethodKind::None => Ok(AuthMethod::None),
                AuthMethodKind::Password => match (&socks.username, &socks.password) {
                    (Some(username), Some(password)) => Ok(AuthMethod::Password(Arc::new(
                        StaticCredentials::new(username.clone(), password.clone()),
                    ))),
                    _ => Err(anyhow!("Password authentication requires username and password")),
                },
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SocksContext {
            allow_socks4: socks.allow_socks4,
            auth_methods,
            bind_timeout: socks.bind_timeout(),
            resolver: Resolver::from_config(&config.resolver),
            socket_opts: SocketOpts::from_tcp_config(&config.server.tcp),
        })
    }

    /// Replace the verifier of every password method
    ///
    /// Adds a password method if none is configured.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let mut replaced = false;
        for method in self.auth_methods.iter_mut() {
            if let AuthMethod::Password(_) = method {
                *method = AuthMethod::Password(verifier.clone());
                replaced = true;
            }
        }
        if !replaced {
            self.auth_methods.insert(0, AuthMethod::Password(verifier));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_context_default() {
        let ctx = SocksContext::default();
        assert!(!ctx.allow_socks4);
        assert_eq!(ctx.auth_methods.len(), 1);
        assert_eq!(ctx.auth_methods[0].code(), SOCKS5_AUTH_METHOD_NONE);
        assert_eq!(ctx.bind_timeout, Duration::from_secs(120));
        assert_eq!(ctx.resolver.server(), "8.8.8.8:53".parse().unwrap());
    }

    #[test]
    fn test_context_from_config() {
        let config = parse_config(
            r#"
[socks]
allow_socks4 = true
auth_methods = ["password", "none"]
username = "alice"
password = "secret"
bind_timeout_ms = 500

[resolver]
address = "127.0.0.1:5353"
"#,
        )
        .unwrap();

        let ctx = SocksContext::from_config(&config).unwrap();
        assert!(ctx.allow_socks4);
        let codes: Vec<u8> = ctx.auth_methods.iter().map(|m| m.code()).collect();
        assert_eq!(codes, vec![SOCKS5_AUTH_METHOD_PASSWORD, SOCKS5_AUTH_METHOD_NONE]);
        assert_eq!(ctx.bind_timeout, Duration::from_millis(500));
        assert_eq!(ctx.resolver.server(), "127.0.0.1:5353".parse().unwrap());
    }

    #[test]
    fn test_context_empty_auth_list_means_none() {
        let config = parse_config("[socks]\nauth_methods = []\n").unwrap();
        let ctx = SocksContext::from_config(&config).unwrap();
        assert_eq!(ctx.auth_methods.len(), 1);
        assert_eq!(ctx.auth_methods[0].code(), SOCKS5_AUTH_METHOD_NONE);
    }

    #[test]
    fn test_context_with_verifier() {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(StaticCredentials::new("u", "p"));

        let ctx = SocksContext::default().with_verifier(verifier.clone());
        let codes: Vec<u8> = ctx.auth_methods.iter().map(|m| m.code()).collect();
        assert_eq!(codes, vec![SOCKS5_AUTH_METHOD_PASSWORD, SOCKS5_AUTH_METHOD_NONE]);

        // A second call replaces rather than adds
        let ctx = ctx.with_verifier(verifier);
        assert_eq!(ctx.auth_methods.len(), 2);
    }
}
