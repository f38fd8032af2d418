//! Error types for Socksrelay
//!
//! This module defines the per-connection error taxonomy used by the SOCKS
//! handshake, the BIND flow and the name resolver.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Coarse classification of a [`SocksError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unexpected bytes from the client
    Protocol,
    /// Method negotiation or credential check failed
    Authentication,
    /// Outbound CONNECT failed
    Connect,
    /// BIND listener, accept or peer check failed
    Bind,
    /// A domain name could not be resolved
    Resolution,
    /// The client stream itself failed
    Io,
}

/// Errors raised while serving a single SOCKS connection
#[derive(Error, Debug)]
pub enum SocksError {
    /// First byte is not a known SOCKS version
    #[error("Invalid SOCKS version: {0}")]
    InvalidVersion(u8),

    /// Version restated after authentication differs from the first one
    #[error("Inconsistent version: expected {expected}, got {actual}")]
    InconsistentVersion {
        /// Version selected at the start of the handshake
        expected: u8,
        /// Version byte received after authentication
        actual: u8,
    },

    /// Unknown command code
    #[error("Invalid command: {0}")]
    InvalidCommand(u8),

    /// Address type byte not in {1, 3, 4}
    #[error("Invalid address type: {0}")]
    InvalidAddressType(u8),

    /// Address bytes are truncated or malformed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Any other framing violation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// SOCKS4 is disabled by configuration
    #[error("SOCKS4 connections are not allowed")]
    Socks4NotAllowed,

    /// Command recognised but deliberately unimplemented
    #[error("Command not supported: {0}")]
    CommandNotSupported(&'static str),

    /// Client offered no method the server supports
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Credential sub-negotiation failed
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Outbound connection could not be opened
    #[error("Failed to connect to {target}: {source}")]
    Connect {
        /// Resolved target address
        target: SocketAddr,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// BIND listener could not be opened or accept failed
    #[error("Bind error: {0}")]
    Bind(String),

    /// No inbound connection arrived before the BIND deadline
    #[error("Timed out waiting for BIND connection after {0:?}")]
    BindTimeout(std::time::Duration),

    /// Accepted BIND peer is not the host the client announced
    #[error("Host address mismatch: requested {requested}, actual {actual}")]
    AddressMismatch {
        /// Address from the client's BIND request
        requested: String,
        /// Address of the peer that connected
        actual: SocketAddr,
    },

    /// Domain name did not resolve
    #[error("Failed to resolve {0}")]
    Resolution(String),

    /// IO error on the client stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SocksError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocksError::InvalidVersion(_)
            | SocksError::InconsistentVersion { .. }
            | SocksError::InvalidCommand(_)
            | SocksError::InvalidAddressType(_)
            | SocksError::InvalidAddress(_)
            | SocksError::Protocol(_)
            | SocksError::Socks4NotAllowed
            | SocksError::CommandNotSupported(_) => ErrorKind::Protocol,
            SocksError::NoAcceptableMethod | SocksError::AuthFailed(_) => {
                ErrorKind::Authentication
            }
            SocksError::Connect { .. } => ErrorKind::Connect,
            SocksError::Bind(_) | SocksError::BindTimeout(_) | SocksError::AddressMismatch { .. } => {
                ErrorKind::Bind
            }
            SocksError::Resolution(_) => ErrorKind::Resolution,
            SocksError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result alias for SOCKS connection handling
pub type Result<T> = std::result::Result<T, SocksError>;
