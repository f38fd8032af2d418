//! Connection supervisor
//!
//! Accepts client connections and runs each one in its own task.

use crate::error::ErrorKind;
use crate::socks::{handle_socks_on_stream, SocksContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

/// Pause after a failed accept, so fd exhaustion does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Main SOCKS server
pub struct Server {
    /// Bound listening socket
    listener: TcpListener,
    /// Shared, read-only connection state
    ctx: Arc<SocksContext>,
}

impl Server {
    /// Create a server on an already bound listener
    pub fn new(listener: TcpListener, ctx: Arc<SocksContext>) -> Self {
        Server { listener, ctx }
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown
    ///
    /// Connection failures are logged inside their own task and never stop
    /// the loop. Connections already running are left to finish.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) {
        match self.local_addr() {
            Ok(addr) => info!("SOCKS server listening on {}", addr),
            Err(e) => warn!("SOCKS server started, local address unknown: {}", e),
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let ctx = self.ctx.clone();
                            tokio::spawn(
                                handle_connection(stream, peer, ctx)
                                    .instrument(info_span!("conn", %peer)),
                            );
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!("Server stopped");
    }
}

/// Serve one client connection to completion
async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<SocksContext>) {
    debug!("Accepted connection from {}", peer);
    ctx.socket_opts.hint(&stream);

    let bind_ip = match stream.local_addr() {
        Ok(addr) => addr.ip(),
        Err(e) => {
            warn!("Dropping connection, local address unknown: {}", e);
            return;
        }
    };

    match handle_socks_on_stream(stream, &ctx, bind_ip).await {
        Ok(_) => debug!("Connection closed"),
        Err(e) => match e.kind() {
            ErrorKind::Io => debug!(kind = ?e.kind(), "Connection aborted: {}", e),
            kind => warn!(?kind, "Connection failed: {}", e),
        },
    }
}
