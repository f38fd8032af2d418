//! Test utilities for Socksrelay
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksrelay::dns::{Resolver, DNS_HEADER_LEN};
use socksrelay::server::Server;
use socksrelay::socks::SocksContext;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a SOCKS server on an ephemeral loopback port
///
/// The server stops when the returned sender is dropped or fired.
pub async fn start_server(ctx: SocksContext) -> (SocketAddr, broadcast::Sender<bool>) {
    let (listener, addr) = create_test_listener().await;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(Server::new(listener, Arc::new(ctx)).run(shutdown_rx));
    (addr, shutdown_tx)
}

/// Start a TCP server that echoes everything back, one task per connection
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });
    addr
}

/// Start a DNS server that answers every query once
///
/// With `Some(ip)` the answer carries `ip` after a name pointer; with `None`
/// the response has no answer section.
pub async fn spawn_fake_dns(answer: Option<[u8; 4]>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
            let mut response = buf[..len].to_vec();
            response[2] = 0x81;
            response[3] = 0x80;
            if let Some(ip) = answer {
                response[7] = 1; // ancount
                response.extend_from_slice(&[0xC0, DNS_HEADER_LEN as u8]);
                response.extend_from_slice(&ip);
            }
            let _ = socket.send_to(&response, peer).await;
        }
    });

    addr
}

/// Context with a resolver pointed at `dns`
pub fn context_with_dns(dns: SocketAddr) -> SocksContext {
    SocksContext {
        resolver: Resolver::new(dns, Duration::from_millis(500)),
        ..SocksContext::default()
    }
}

/// Send a no-auth greeting and check the method selection
pub async fn greet_no_auth(stream: &mut TcpStream) {
    stream.write_all(&[5, 1, 0]).await.unwrap();
    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 0]);
}

/// SOCKS5 request for an IPv4 target
pub fn ipv4_request(cmd: u8, addr: SocketAddr) -> Vec<u8> {
    let mut request = vec![5, cmd, 0, 1];
    match addr {
        SocketAddr::V4(v4) => request.extend_from_slice(&v4.ip().octets()),
        SocketAddr::V6(_) => panic!("IPv4 address expected"),
    }
    request.extend_from_slice(&addr.port().to_be_bytes());
    request
}

/// Read a SOCKS5 reply with an IPv4 address, returning (code, address)
pub async fn read_ipv4_reply(stream: &mut TcpStream) -> (u8, SocketAddr) {
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 5);
    assert_eq!(reply[2], 0);
    assert_eq!(reply[3], 1);
    let ip = std::net::Ipv4Addr::new(reply[4], reply[5], reply[6], reply[7]);
    let port = u16::from_be_bytes([reply[8], reply[9]]);
    (reply[1], SocketAddr::from((ip, port)))
}
