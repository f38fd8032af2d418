//! SOCKS request parser
//!
//! Decodes version bytes, request headers, addresses and ports from the
//! client stream.

use crate::error::{Result, SocksError};
use crate::socks::consts::*;
use crate::socks::types::{AddressKind, Host, ProtocolVersion, SocksCommand, SocksRequest};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read one version byte
///
/// No reply is sent for an unknown version: the peer may not speak SOCKS.
pub async fn read_version<S>(stream: &mut S) -> Result<ProtocolVersion>
where
    S: AsyncRead + Unpin,
{
    let byte = stream.read_u8().await?;
    ProtocolVersion::from_byte(byte).ok_or(SocksError::InvalidVersion(byte))
}

/// Parse a request from the stream, after the version byte
///
/// # SOCKS5 Request Format
///
/// ```text
/// +-----+-------+------+----------+----------+
/// | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +-----+-------+------+----------+----------+
/// |  1  | X'00' |  1   | Variable |    2     |
/// +-----+-------+------+----------+----------+
/// ```
///
/// # SOCKS4 Request Format
///
/// ```text
/// +-----+----------+--------+--------+------+
/// | CMD | DST.PORT | DST.IP | USERID | NULL |
/// +-----+----------+--------+--------+------+
/// |  1  |    2     |   4    | var    |  1   |
/// +-----+----------+--------+--------+------+
/// ```
pub async fn read_request<S>(stream: &mut S, version: ProtocolVersion) -> Result<SocksRequest>
where
    S: AsyncRead + Unpin,
{
    let command = read_command(stream, version).await?;

    let target = match version {
        ProtocolVersion::Socks5 => {
            let _reserved = stream.read_u8().await?;
            let atyp = stream.read_u8().await?;
            let kind = AddressKind::from_byte(atyp).ok_or(SocksError::InvalidAddressType(atyp))?;
            let host = read_host(stream, kind).await?;
            let port = read_port(stream).await?;
            host.with_port(port)
        }
        ProtocolVersion::Socks4 => {
            let port = read_port(stream).await?;
            let host = read_host(stream, AddressKind::Ipv4).await?;
            skip_userid(stream).await?;
            host.with_port(port)
        }
    };

    tracing::debug!("Parsed {} command: {} to {}", version, command, target);

    Ok(SocksRequest { command, target })
}

async fn read_command<S>(stream: &mut S, version: ProtocolVersion) -> Result<SocksCommand>
where
    S: AsyncRead + Unpin,
{
    let byte = stream.read_u8().await?;
    match SocksCommand::from_byte(byte) {
        Some(SocksCommand::UdpAssociate) if version == ProtocolVersion::Socks4 => {
            Err(SocksError::InvalidCommand(byte))
        }
        Some(command) => Ok(command),
        None => Err(SocksError::InvalidCommand(byte)),
    }
}

/// Decode a host of the given kind
///
/// IPv4 and IPv6 hosts come back numeric; domains come back unresolved.
pub async fn read_host<S>(stream: &mut S, kind: AddressKind) -> Result<Host>
where
    S: AsyncRead + Unpin,
{
    match kind {
        AddressKind::Ipv4 => {
            let mut addr = [0u8; 4];
            read_address_bytes(stream, &mut addr).await?;
            Ok(Host::Ip(IpAddr::V4(Ipv4Addr::from(addr))))
        }
        AddressKind::Ipv6 => {
            let mut addr = [0u8; 16];
            read_address_bytes(stream, &mut addr).await?;
            Ok(Host::Ip(IpAddr::V6(Ipv6Addr::from(addr))))
        }
        AddressKind::Domain => {
            let len = stream.read_u8().await? as usize;
            if len == 0 {
                return Err(SocksError::InvalidAddress("empty domain name".to_string()));
            }

            let mut domain = vec![0u8; len];
            read_address_bytes(stream, &mut domain).await?;
            let domain = String::from_utf8(domain)
                .map_err(|_| SocksError::InvalidAddress("domain is not UTF-8".to_string()))?;
            Ok(Host::Domain(domain))
        }
    }
}

/// Decode a big-endian port
pub async fn read_port<S>(stream: &mut S) -> Result<u16>
where
    S: AsyncRead + Unpin,
{
    Ok(stream.read_u16().await?)
}

/// Fill `buf` or fail with an invalid-address error if the stream ends early
async fn read_address_bytes<S>(stream: &mut S, buf: &mut [u8]) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(SocksError::InvalidAddress(
            format!("expected {} address bytes", buf.len()),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Discard the NUL-terminated SOCKS4 user id
async fn skip_userid<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    for _ in 0..=MAX_SOCKS4_USERID_LEN {
        if stream.read_u8().await? == 0 {
            return Ok(());
        }
    }
    Err(SocksError::Protocol("SOCKS4 user id too long".to_string()))
}
