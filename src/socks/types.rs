//! SOCKS type definitions
//!
//! Defines the core types used in SOCKS4/SOCKS5 protocol handling.

use super::consts::*;
use crate::dns::Resolver;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Protocol version selected at the start of a handshake
///
/// Each version carries the reply constants used for the rest of the
/// connection. SOCKS4 has a single failure code, so every failure maps to 91.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// SOCKS4
    Socks4,
    /// SOCKS5
    Socks5,
}

impl ProtocolVersion {
    /// Parse the version byte sent by the client
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS4_VERSION => Some(ProtocolVersion::Socks4),
            SOCKS5_VERSION => Some(ProtocolVersion::Socks5),
            _ => None,
        }
    }

    /// Version byte on the wire
    pub fn code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_VERSION,
            ProtocolVersion::Socks5 => SOCKS5_VERSION,
        }
    }

    /// Version byte written at the start of every reply
    pub fn reply_version(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_VERSION,
            ProtocolVersion::Socks5 => SOCKS5_VERSION,
        }
    }

    /// Reply code for a granted request
    pub fn success_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_GRANTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_SUCCEEDED,
        }
    }

    /// Reply code for a generic failure
    pub fn failure_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_REJECTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_GENERAL_FAILURE,
        }
    }

    /// Reply code for an unreachable target
    pub fn host_unreachable_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_REJECTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_HOST_UNREACHABLE,
        }
    }

    /// Reply code for a refused connection
    pub fn connection_refused_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_REJECTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_CONNECTION_REFUSED,
        }
    }

    /// Reply code for an unknown or unsupported command
    pub fn command_not_supported_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_REJECTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_COMMAND_NOT_SUPPORTED,
        }
    }

    /// Reply code for an unknown address type
    pub fn address_type_not_supported_code(self) -> u8 {
        match self {
            ProtocolVersion::Socks4 => SOCKS4_REPLY_REJECTED,
            ProtocolVersion::Socks5 => SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Socks4 => write!(f, "SOCKS4"),
            ProtocolVersion::Socks5 => write!(f, "SOCKS5"),
        }
    }
}

/// SOCKS command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for one incoming connection
    Bind,
    /// UDP ASSOCIATE - always rejected
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// SOCKS5 address type (ATYP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// 4 raw bytes
    Ipv4,
    /// Length-prefixed domain name
    Domain,
    /// 16 raw bytes
    Ipv6,
}

impl AddressKind {
    /// Parse an ATYP byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddressKind::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddressKind::Domain),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddressKind::Ipv6),
            _ => None,
        }
    }

    /// ATYP byte on the wire
    pub fn to_byte(self) -> u8 {
        match self {
            AddressKind::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddressKind::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
            AddressKind::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Host part of a request address, before the port is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// Numeric address
    Ip(IpAddr),
    /// Unresolved domain name
    Domain(String),
}

impl Host {
    /// Attach a port to this host
    pub fn with_port(self, port: u16) -> TargetAddr {
        match self {
            Host::Ip(ip) => TargetAddr::Ip(SocketAddr::new(ip, port)),
            Host::Domain(domain) => TargetAddr::Domain(domain, port),
        }
    }
}

/// Target address for SOCKS requests
///
/// Represents the destination address in a SOCKS request.
/// Can be an IP address (v4 or v6) or a domain name; domains stay
/// unresolved until a connection attempt needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the SOCKS5 address type
    pub fn kind(&self) -> AddressKind {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => AddressKind::Ipv4,
            TargetAddr::Ip(SocketAddr::V6(_)) => AddressKind::Ipv6,
            TargetAddr::Domain(_, _) => AddressKind::Domain,
        }
    }

    /// Whether the address is already numeric
    pub fn is_resolved(&self) -> bool {
        matches!(self, TargetAddr::Ip(_))
    }

    /// Resolve the address to a SocketAddr
    ///
    /// IP addresses return immediately. Domain names go through the
    /// configured resolver, which only yields IPv4 answers.
    pub async fn resolve(&self, resolver: &Resolver) -> Option<SocketAddr> {
        match self {
            TargetAddr::Ip(addr) => Some(*addr),
            TargetAddr::Domain(domain, port) => resolver
                .resolve(domain)
                .await
                .map(|ip| SocketAddr::new(IpAddr::V4(ip), *port)),
        }
    }

    /// Append the SOCKS5 encoding (ATYP, address, port) to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind().to_byte());
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => buf.put_slice(&addr.ip().octets()),
            TargetAddr::Ip(SocketAddr::V6(addr)) => buf.put_slice(&addr.ip().octets()),
            TargetAddr::Domain(domain, _) => {
                // The length octet caps the name at MAX_DOMAIN_LEN bytes
                let name = &domain.as_bytes()[..domain.len().min(MAX_DOMAIN_LEN)];
                buf.put_u8(name.len() as u8);
                buf.put_slice(name);
            }
        }
        buf.put_u16(self.port());
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksRequest {
    /// Requested command
    pub command: SocksCommand,
    /// Requested target
    pub target: TargetAddr,
}
