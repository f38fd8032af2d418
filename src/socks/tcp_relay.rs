//! TCP relay for the CONNECT command
//!
//! Handles CONNECT requests by establishing a connection to the target, and
//! relays data bidirectionally once a secondary connection exists.

use super::command::{send_reply, send_reply_best_effort};
use super::consts::RELAY_BUFFER_SIZE;
use super::types::{ProtocolVersion, TargetAddr};
use super::SocksContext;
use crate::error::{Result, SocksError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Byte counts of a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes forwarded from the client to the target
    pub client_to_target: u64,
    /// Bytes forwarded from the target to the client
    pub target_to_client: u64,
}

/// Handle the CONNECT command
///
/// This function:
/// 1. Resolves the target address
/// 2. Establishes a TCP connection to the target
/// 3. Sends a success reply carrying the outbound socket's local address
///
/// # Returns
///
/// The connected target stream, ready to be relayed
pub async fn handle_tcp_connect<S>(
    client_stream: &mut S,
    version: ProtocolVersion,
    target_addr: &TargetAddr,
    ctx: &SocksContext,
) -> Result<TcpStream>
where
    S: AsyncWrite + Unpin,
{
    let socket_addr = match target_addr.resolve(&ctx.resolver).await {
        Some(addr) => addr,
        None => {
            warn!("Failed to resolve {}", target_addr);
            send_reply_best_effort(client_stream, version, version.host_unreachable_code()).await;
            return Err(SocksError::Resolution(target_addr.to_string()));
        }
    };

    debug!("Connecting to target: {}", socket_addr);

    let target_stream = match TcpStream::connect(socket_addr).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", socket_addr, e);
            send_reply_best_effort(client_stream, version, version.host_unreachable_code()).await;
            return Err(SocksError::Connect {
                target: socket_addr,
                source: e,
            });
        }
    };
    ctx.socket_opts.hint(&target_stream);

    let local_addr = match target_stream.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            send_reply_best_effort(client_stream, version, version.failure_code()).await;
            return Err(e.into());
        }
    };

    // The target stream is dropped, and so closed, if this fails
    send_reply(client_stream, version, version.success_code(), Some(local_addr)).await?;

    info!("{} tunnel established to {} via {}", version, socket_addr, local_addr);

    Ok(target_stream)
}

/// Relay data bidirectionally between client and target
///
/// Both directions run concurrently and independently. When one side
/// reaches end-of-stream its peer's write half is shut down, and the other
/// direction keeps running. Returns once both directions have finished;
/// both streams are closed when the halves are dropped.
pub async fn relay_tcp<A, B>(client: A, target: B) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (target_read, target_write) = tokio::io::split(target);

    let (client_to_target, target_to_client) = tokio::join!(
        copy_half(client_read, target_write, "client->target"),
        copy_half(target_read, client_write, "target->client"),
    );

    RelayStats {
        client_to_target,
        target_to_client,
    }
}

/// Copy one direction until end-of-stream or error, then half-close
async fn copy_half<R, W>(mut reader: R, mut writer: W, direction: &'static str) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("{} read error: {}", direction, e);
                break;
            }
        };

        if let Err(e) = writer.write_all(&buf[..n]).await {
            debug!("{} write error: {}", direction, e);
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!("{} flush error: {}", direction, e);
            break;
        }
        total += n as u64;
    }

    if let Err(e) = writer.shutdown().await {
        debug!("{} shutdown error: {}", direction, e);
    }
    debug!("{} finished: {} bytes", direction, total);

    total
}
