//! Main SOCKS handler
//!
//! This module provides the main entry point for handling SOCKS requests
//! on accepted client streams. It orchestrates version detection,
//! authentication, request parsing and command dispatch.

use super::auth::authenticate;
use super::bind::handle_tcp_bind;
use super::command::{read_request, read_version, send_reply_best_effort};
use super::consts::SOCKS5_VERSION;
use super::tcp_relay::{handle_tcp_connect, relay_tcp, RelayStats};
use super::types::{ProtocolVersion, SocksCommand, SocksRequest};
use super::SocksContext;
use crate::error::{Result, SocksError};
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// A completed handshake
///
/// Owns the secondary connection: the outbound stream for CONNECT, the
/// accepted inbound stream for BIND. Dropping the session closes it.
#[derive(Debug)]
pub struct Session {
    /// Version selected by the client
    pub version: ProtocolVersion,
    /// The request that was served
    pub request: SocksRequest,
    /// Secondary connection to relay with
    pub peer: TcpStream,
}

/// Run the handshake up to and including the command
///
/// # Protocol Flow
///
/// 1. Version byte
/// 2. SOCKS5: method negotiation, sub-negotiation, then the version byte
///    again; SOCKS4: refused unless enabled
/// 3. Request parsing
/// 4. Command execution (CONNECT or BIND; UDP ASSOCIATE is refused)
///
/// Every failure after the version is known is answered with the
/// version's reply frame when the stream still allows it.
///
/// # Arguments
///
/// * `stream` - The client stream
/// * `ctx` - Shared server state
/// * `bind_ip` - Local IP the client reached us on, used for BIND listeners
pub async fn negotiate<S>(stream: &mut S, ctx: &SocksContext, bind_ip: IpAddr) -> Result<Session>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let version = read_version(stream).await?;
    debug!("Client speaks {}", version);

    match version {
        ProtocolVersion::Socks5 => {
            let method = authenticate(stream, &ctx.auth_methods).await?;
            debug!("Authentication completed with method: {:#04x}", method);

            let restated = stream.read_u8().await?;
            if restated != SOCKS5_VERSION {
                send_reply_best_effort(stream, version, version.failure_code()).await;
                return Err(SocksError::InconsistentVersion {
                    expected: SOCKS5_VERSION,
                    actual: restated,
                });
            }
        }
        ProtocolVersion::Socks4 => {
            if !ctx.allow_socks4 {
                warn!("SOCKS4 client refused by configuration");
                send_reply_best_effort(stream, version, version.failure_code()).await;
                return Err(SocksError::Socks4NotAllowed);
            }
        }
    }

    let request = match read_request(stream, version).await {
        Ok(request) => request,
        Err(e) => {
            if let Some(code) = request_error_reply(version, &e) {
                send_reply_best_effort(stream, version, code).await;
            }
            return Err(e);
        }
    };

    info!("{} {} request to {}", version, request.command, request.target);

    let peer = match request.command {
        SocksCommand::Connect => handle_tcp_connect(stream, version, &request.target, ctx).await?,
        SocksCommand::Bind => {
            handle_tcp_bind(stream, version, &request.target, ctx, bind_ip).await?
        }
        SocksCommand::UdpAssociate => {
            warn!("UDP ASSOCIATE not supported");
            send_reply_best_effort(stream, version, version.command_not_supported_code()).await;
            return Err(SocksError::CommandNotSupported("UDP ASSOCIATE"));
        }
    };

    Ok(Session {
        version,
        request,
        peer,
    })
}

/// Reply code for a request that failed to parse
///
/// `None` when the client stream itself failed and nothing can be sent.
pub fn request_error_reply(version: ProtocolVersion, err: &SocksError) -> Option<u8> {
    match err {
        SocksError::Io(_) => None,
        SocksError::InvalidAddressType(_) => Some(version.address_type_not_supported_code()),
        SocksError::InvalidCommand(_) => Some(version.command_not_supported_code()),
        _ => Some(version.failure_code()),
    }
}

/// Handle SOCKS protocol on a client stream
///
/// Negotiates, then relays until both directions are finished. The client
/// stream and the secondary connection are closed on return.
pub async fn handle_socks_on_stream<S>(
    mut stream: S,
    ctx: &SocksContext,
    bind_ip: IpAddr,
) -> Result<RelayStats>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let session = negotiate(&mut stream, ctx, bind_ip).await?;
    let target = session.request.target;

    let stats = relay_tcp(stream, session.peer).await;
    info!(
        "Relay to {} finished: {} bytes up, {} bytes down",
        target, stats.client_to_target, stats.target_to_client
    );

    Ok(stats)
}
