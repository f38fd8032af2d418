//! Server module for Socksrelay
//!
//! Binds the listening socket and supervises client connections.

#[allow(clippy::module_inception)]
mod server;

pub use server::Server;

use crate::config::Config;
use crate::socks::SocksContext;
use crate::transport::bind_listener;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Run the server with the given configuration
///
/// Fails only if the configuration is invalid or the listening socket
/// cannot be bound; per-connection failures never surface here.
pub async fn run_server(config: Config, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let ctx = SocksContext::from_config(&config)?;
    let listener = bind_listener(&config.server).await?;

    let server = Server::new(listener, Arc::new(ctx));
    server.run(shutdown_rx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_server_stops_on_shutdown() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_server(config, shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_server_fails_when_port_taken() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: taken.local_addr().unwrap().port(),
                ..Default::default()
            },
            ..Default::default()
        };
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        assert!(run_server(config, shutdown_rx).await.is_err());
    }
}
