//! BIND command
//!
//! Opens a one-shot listener, tells the client where it is, then waits a
//! bounded time for the single inbound connection the client announced.

use super::command::{send_reply, send_reply_best_effort};
use super::types::{ProtocolVersion, TargetAddr};
use super::SocksContext;
use crate::dns::Resolver;
use crate::error::{Result, SocksError};
use std::net::{IpAddr, SocketAddr};
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Handle the BIND command
///
/// This function:
/// 1. Listens on an ephemeral port of `bind_ip`
/// 2. Sends the first reply carrying the listening address
/// 3. Waits up to `ctx.bind_timeout` for one inbound connection
/// 4. Checks the peer against the requested address
/// 5. Sends the second reply carrying the peer address
///
/// The listener is closed as soon as this returns, whatever the outcome.
///
/// # Returns
///
/// The accepted peer stream, ready to be relayed
pub async fn handle_tcp_bind<S>(
    client_stream: &mut S,
    version: ProtocolVersion,
    target_addr: &TargetAddr,
    ctx: &SocksContext,
    bind_ip: IpAddr,
) -> Result<TcpStream>
where
    S: AsyncWrite + Unpin,
{
    let listener = match TcpListener::bind(SocketAddr::new(bind_ip, 0)).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Failed to open BIND listener on {}: {}", bind_ip, e);
            send_reply_best_effort(client_stream, version, version.failure_code()).await;
            return Err(SocksError::Bind(e.to_string()));
        }
    };
    let listen_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            send_reply_best_effort(client_stream, version, version.failure_code()).await;
            return Err(e.into());
        }
    };

    send_reply(client_stream, version, version.success_code(), Some(listen_addr)).await?;
    debug!("BIND listening on {} for {}", listen_addr, target_addr);

    let (peer_stream, peer_addr) = match timeout(ctx.bind_timeout, listener.accept()).await {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(e)) => {
            warn!("BIND accept on {} failed: {}", listen_addr, e);
            send_reply_best_effort(client_stream, version, version.host_unreachable_code()).await;
            return Err(SocksError::Bind(e.to_string()));
        }
        Err(_) => {
            warn!("BIND on {} timed out after {:?}", listen_addr, ctx.bind_timeout);
            send_reply_best_effort(client_stream, version, version.host_unreachable_code()).await;
            return Err(SocksError::BindTimeout(ctx.bind_timeout));
        }
    };
    drop(listener);

    if !peer_matches(target_addr, peer_addr, &ctx.resolver).await {
        warn!("BIND peer {} does not match requested {}", peer_addr, target_addr);
        drop(peer_stream);
        send_reply_best_effort(client_stream, version, version.connection_refused_code()).await;
        return Err(SocksError::AddressMismatch {
            requested: target_addr.to_string(),
            actual: peer_addr,
        });
    }
    ctx.socket_opts.hint(&peer_stream);

    send_reply(client_stream, version, version.success_code(), Some(peer_addr)).await?;

    info!("{} BIND established with {} via {}", version, peer_addr, listen_addr);

    Ok(peer_stream)
}

/// Whether an accepted BIND peer is the host the client asked for
///
/// Only the IP is compared; the peer's source port is its own choice. An
/// unspecified requested IP (`0.0.0.0` or `::`) accepts any peer. A domain
/// target is resolved first and counts as a mismatch if it does not resolve.
pub async fn peer_matches(requested: &TargetAddr, peer: SocketAddr, resolver: &Resolver) -> bool {
    let requested_ip = match requested {
        TargetAddr::Ip(addr) => addr.ip(),
        TargetAddr::Domain(..) => match requested.resolve(resolver).await {
            Some(addr) => addr.ip(),
            None => return false,
        },
    };

    if requested_ip.is_unspecified() {
        return true;
    }

    requested_ip.to_canonical() == peer.ip().to_canonical()
}
