//! Username/password authentication handler
//!
//! Implements RFC 1929 username/password authentication for SOCKS5. The
//! credential check itself is delegated to a [`CredentialVerifier`].

use crate::error::{Result, SocksError};
use crate::socks::consts::SOCKS5_AUTH_VERSION;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Authentication result codes
const AUTH_SUCCESS: u8 = 0x00;
const AUTH_FAILURE: u8 = 0x01;

/// Hook deciding whether a username/password pair is accepted
#[async_trait]
pub trait CredentialVerifier: Send + Sync + Debug {
    /// Return `true` if the credentials are valid
    async fn verify(&self, username: &str, password: &str) -> bool;
}

/// Verifier accepting exactly one configured username/password pair
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    /// Create a verifier for a single credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        StaticCredentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

/// Username/password authentication handler
pub struct PasswordAuth;

impl PasswordAuth {
    /// Perform username/password authentication
    ///
    /// # Protocol
    ///
    /// Client sends:
    /// ```text
    /// +----+------+----------+------+----------+
    /// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    /// +----+------+----------+------+----------+
    /// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    /// +----+------+----------+------+----------+
    /// ```
    ///
    /// Server responds:
    /// ```text
    /// +----+--------+
    /// |VER | STATUS |
    /// +----+--------+
    /// | 1  |   1    |
    /// +----+--------+
    /// ```
    ///
    /// The failure status is flushed before the error is returned.
    pub async fn negotiate<S>(stream: &mut S, verifier: &dyn CredentialVerifier) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let version = stream.read_u8().await?;
        if version != SOCKS5_AUTH_VERSION {
            send_auth_result(stream, AUTH_FAILURE).await?;
            return Err(SocksError::AuthFailed(format!(
                "Invalid auth version: {}",
                version
            )));
        }

        let username = match read_field(stream).await? {
            Some(username) => username,
            None => {
                send_auth_result(stream, AUTH_FAILURE).await?;
                return Err(SocksError::AuthFailed("Invalid username".to_string()));
            }
        };

        let password = match read_field(stream).await? {
            Some(password) => password,
            None => {
                send_auth_result(stream, AUTH_FAILURE).await?;
                return Err(SocksError::AuthFailed("Invalid password".to_string()));
            }
        };

        if verifier.verify(&username, &password).await {
            send_auth_result(stream, AUTH_SUCCESS).await?;
            tracing::debug!("Authentication successful for user: {}", username);
            Ok(())
        } else {
            send_auth_result(stream, AUTH_FAILURE).await?;
            Err(SocksError::AuthFailed(format!(
                "Authentication failed for user: {}",
                username
            )))
        }
    }
}

/// Read a length-prefixed UTF-8 field; `None` if empty or not UTF-8
async fn read_field<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Option<String>> {
    let len = stream.read_u8().await? as usize;
    let mut field = vec![0u8; len];
    stream.read_exact(&mut field).await?;

    if len == 0 {
        return Ok(None);
    }
    Ok(String::from_utf8(field).ok())
}

/// Send authentication result to client
async fn send_auth_result<S: AsyncWrite + Unpin>(stream: &mut S, status: u8) -> Result<()> {
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await?;
    Ok(())
}
