//! SOCKS reply builder
//!
//! Constructs SOCKS4 and SOCKS5 reply frames.

use crate::socks::consts::*;
use crate::socks::types::{ProtocolVersion, TargetAddr};
use bytes::{BufMut, BytesMut};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Address reported when there is no meaningful bound address
const UNSPECIFIED_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// Build a reply frame
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// # SOCKS4 Reply Format
///
/// ```text
/// +----+-----+----------+---------+
/// | VN | REP | BND.PORT | BND.IP  |
/// +----+-----+----------+---------+
/// | 1  |  1  |    2     |    4    |
/// +----+-----+----------+---------+
/// ```
///
/// SOCKS4 cannot carry IPv6, so an IPv6 bound address is written as `0.0.0.0`.
pub fn build_reply(version: ProtocolVersion, reply_code: u8, bind_addr: Option<SocketAddr>) -> BytesMut {
    let bind_addr = bind_addr.unwrap_or(UNSPECIFIED_ADDR);
    let mut reply = BytesMut::with_capacity(22);

    reply.put_u8(version.reply_version());
    reply.put_u8(reply_code);

    match version {
        ProtocolVersion::Socks5 => {
            reply.put_u8(SOCKS5_RESERVED);
            TargetAddr::from(bind_addr).write_to(&mut reply);
        }
        ProtocolVersion::Socks4 => {
            reply.put_u16(bind_addr.port());
            match bind_addr {
                SocketAddr::V4(addr) => reply.put_slice(&addr.ip().octets()),
                SocketAddr::V6(_) => reply.put_slice(&Ipv4Addr::UNSPECIFIED.octets()),
            }
        }
    }

    reply
}

/// Build and send a reply
pub async fn send_reply<S>(
    stream: &mut S,
    version: ProtocolVersion,
    reply_code: u8,
    bind_addr: Option<SocketAddr>,
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let reply = build_reply(version, reply_code, bind_addr);
    stream.write_all(&reply).await?;
    stream.flush().await
}

/// Send a failure reply, ignoring write errors
///
/// Used on error paths where the original error is what matters; the
/// stream may already be broken.
pub async fn send_reply_best_effort<S>(stream: &mut S, version: ProtocolVersion, reply_code: u8)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = send_reply(stream, version, reply_code, None).await {
        debug!("Failed to send {} reply {}: {}", version, reply_code, e);
    }
}
