//! UDP name resolver
//!
//! Sends one query datagram per resolution to the configured server and
//! waits a bounded time for one response datagram. No retries, no TCP
//! fallback.

use super::query::{build_query, parse_response, MAX_RESPONSE_LEN};
use crate::config::ResolverConfig;
use anyhow::{anyhow, Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Minimal A-record resolver
#[derive(Debug, Clone)]
pub struct Resolver {
    /// Upstream DNS server
    server: SocketAddr,
    /// Round trip timeout
    timeout: Duration,
}

impl Resolver {
    /// Create a resolver for the given server
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Resolver { server, timeout }
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &ResolverConfig) -> Self {
        Resolver::new(config.address, config.timeout())
    }

    /// Upstream DNS server address
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Resolve `domain` to its first IPv4 address
    ///
    /// Every failure (socket error, timeout, unparseable response) is
    /// reported as `None`; retry policy belongs to the caller.
    pub async fn resolve(&self, domain: &str) -> Option<Ipv4Addr> {
        if let Ok(ip) = domain.parse::<Ipv4Addr>() {
            return Some(ip);
        }

        match self.lookup(domain).await {
            Ok(ip) => {
                debug!("Resolved {} to {}", domain, ip);
                Some(ip)
            }
            Err(e) => {
                debug!("Resolution of {} failed: {:#}", domain, e);
                None
            }
        }
    }

    /// Perform a single query round trip
    pub async fn lookup(&self, domain: &str) -> Result<Ipv4Addr> {
        let id: u16 = rand::random();
        let query = build_query(id, domain)?;

        let local: SocketAddr = if self.server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)
            .await
            .context("Failed to bind DNS socket")?;
        socket
            .connect(self.server)
            .await
            .with_context(|| format!("Failed to connect DNS socket to {}", self.server))?;

        socket.send(&query).await.context("Failed to send DNS query")?;

        let mut response = [0u8; MAX_RESPONSE_LEN];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut response))
            .await
            .map_err(|_| anyhow!("DNS query timed out after {:?}", self.timeout))?
            .context("Failed to receive DNS response")?;

        parse_response(&response[..len], id)
            .ok_or_else(|| anyhow!("No usable A record in response for {}", domain))
    }
}
