//! # Socksrelay - SOCKS4/SOCKS5 Proxy Server
//!
//! Socksrelay accepts client connections, negotiates the SOCKS4 or SOCKS5
//! handshake, opens the requested secondary connection and relays bytes
//! between the two until either side is done.
//!
//! ## Features
//!
//! - **SOCKS5 and optional SOCKS4**: version detected from the first byte
//! - **Pluggable Authentication**: no-auth and username/password with a custom verifier
//! - **CONNECT and BIND**: BIND waits a bounded time for one inbound peer
//! - **Half-Close Relay**: each direction closes independently
//! - **Built-in Resolver**: domain targets resolved over UDP against one DNS server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksrelay::config::load_config;
//! use socksrelay::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! One accept loop spawns one task per client. Inside a task the handshake
//! runs to completion, then the relay splits into one copy loop per
//! direction.
//!
//! ```text
//! SOCKS Client -> Socksrelay -> Target (CONNECT)
//! SOCKS Client -> Socksrelay <- Peer   (BIND)
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod dns;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ErrorKind, SocksError};
pub use server::{run_server, Server};
pub use socks::{CredentialVerifier, SocksContext};

/// Version of the Socksrelay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
