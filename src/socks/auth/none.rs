//! No authentication handler
//!
//! Handles the case when no authentication is required.

use crate::error::Result;
use tokio::io::{AsyncRead, AsyncWrite};

/// No authentication handler
///
/// This is a marker type for the no-authentication method.
/// The method has no sub-negotiation, so nothing is read or written.
pub struct NoAuth;

impl NoAuth {
    /// Perform "authentication" (which does nothing)
    pub async fn negotiate<S>(_stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Ok(())
    }
}
