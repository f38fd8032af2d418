//! SOCKS5 authentication module
//!
//! Handles method selection and the per-method sub-negotiation.

mod none;
mod password;

pub use none::NoAuth;
pub use password::{CredentialVerifier, PasswordAuth, StaticCredentials};

use super::consts::*;
use crate::error::{Result, SocksError};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Authentication methods the server can offer
#[derive(Clone)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication checked by a verifier
    Password(Arc<dyn CredentialVerifier>),
}

impl AuthMethod {
    /// SOCKS5 method code
    pub fn code(&self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password(_) => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Run this method's sub-negotiation on the stream
    pub async fn negotiate<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            AuthMethod::None => NoAuth::negotiate(stream).await,
            AuthMethod::Password(verifier) => {
                PasswordAuth::negotiate(stream, verifier.as_ref()).await
            }
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => write!(f, "None"),
            AuthMethod::Password(_) => write!(f, "Password"),
        }
    }
}

/// Pick the first server-supported method that the client offered
///
/// Server preference order wins over the order of the client's list.
pub fn select_auth_method<'a>(supported: &'a [AuthMethod], offered: &[u8]) -> Option<&'a AuthMethod> {
    supported.iter().find(|method| offered.contains(&method.code()))
}

/// Perform method negotiation and authentication
///
/// The version byte has already been consumed. This function:
/// 1. Reads the client's offered methods
/// 2. Replies with the selected method, or `0xFF` if none match
/// 3. Runs the selected method's sub-negotiation
///
/// # Returns
///
/// The code of the negotiated method
pub async fn authenticate<S>(stream: &mut S, supported: &[AuthMethod]) -> Result<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let num_methods = stream.read_u8().await?;
    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;

    let selected = select_auth_method(supported, &methods);

    stream
        .write_all(&[
            SOCKS5_VERSION,
            selected
                .map(|m| m.code())
                .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE),
        ])
        .await?;
    stream.flush().await?;

    let method = selected.ok_or(SocksError::NoAcceptableMethod)?;
    debug!("Selected authentication method: {:?}", method);

    method.negotiate(stream).await?;
    Ok(method.code())
}
