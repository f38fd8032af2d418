//! End-to-end tests against a running server on loopback

mod common;

use common::*;
use socksrelay::socks::{SocksContext, StaticCredentials};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_connect_ipv4_relays_bytes_both_ways() {
    let echo = spawn_echo_server().await;
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;

    client.write_all(&ipv4_request(1, echo)).await.unwrap();
    let (code, bound) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);
    assert!(bound.ip().is_loopback());
    assert_ne!(bound.port(), 0);

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    client.write_all(&payload).await.unwrap();
    let mut echoed = vec![0u8; payload.len()];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(echoed, payload);
}

#[tokio::test]
async fn test_connect_half_close_delivers_remaining_data() {
    let echo = spawn_echo_server().await;
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;
    client.write_all(&ipv4_request(1, echo)).await.unwrap();
    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);

    client.write_all(b"last words").await.unwrap();
    client.shutdown().await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, b"last words");
}

#[tokio::test]
async fn test_connect_refused_target() {
    let (listener, dead) = create_test_listener().await;
    drop(listener);
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;
    client.write_all(&ipv4_request(1, dead)).await.unwrap();

    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 4);
}

#[tokio::test]
async fn test_connect_domain_resolved_by_dns() {
    let echo = spawn_echo_server().await;
    let dns = spawn_fake_dns(Some([127, 0, 0, 1])).await;
    let (proxy, _shutdown) = start_server(context_with_dns(dns)).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;

    let domain = b"echo.test";
    let mut request = vec![5, 1, 0, 3, domain.len() as u8];
    request.extend_from_slice(domain);
    request.extend_from_slice(&echo.port().to_be_bytes());
    client.write_all(&request).await.unwrap();

    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);

    client.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test]
async fn test_connect_domain_not_found() {
    let dns = spawn_fake_dns(None).await;
    let (proxy, _shutdown) = start_server(context_with_dns(dns)).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;

    let domain = b"missing.test";
    let mut request = vec![5, 1, 0, 3, domain.len() as u8];
    request.extend_from_slice(domain);
    request.extend_from_slice(&80u16.to_be_bytes());
    client.write_all(&request).await.unwrap();

    let mut reply = [0u8; 2];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 4]);
}

#[tokio::test]
async fn test_password_authentication() {
    let echo = spawn_echo_server().await;
    let ctx = SocksContext {
        auth_methods: Vec::new(),
        ..SocksContext::default()
    }
    .with_verifier(Arc::new(StaticCredentials::new("alice", "wonderland")));
    let (proxy, _shutdown) = start_server(ctx).await;

    // Accepted credentials
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(&[5, 2, 0, 2]).await.unwrap();
    let mut reply = [0u8; 2];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 2]);

    let mut auth = vec![1, 5];
    auth.extend_from_slice(b"alice");
    auth.push(10);
    auth.extend_from_slice(b"wonderland");
    client.write_all(&auth).await.unwrap();
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [1, 0]);

    client.write_all(&ipv4_request(1, echo)).await.unwrap();
    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);

    // Rejected credentials
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(&[5, 1, 2]).await.unwrap();
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 2]);

    let mut auth = vec![1, 5];
    auth.extend_from_slice(b"alice");
    auth.push(5);
    auth.extend_from_slice(b"wrong");
    client.write_all(&auth).await.unwrap();
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 1);
    assert_ne!(reply[1], 0);

    let mut rest = Vec::new();
    let _ = client.read_to_end(&mut rest).await;
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_no_acceptable_method() {
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(&[5, 1, 2]).await.unwrap();
    let mut reply = [0u8; 2];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [5, 0xFF]);
}

#[tokio::test]
async fn test_socks4_connect() {
    let echo = spawn_echo_server().await;
    let ctx = SocksContext {
        allow_socks4: true,
        ..SocksContext::default()
    };
    let (proxy, _shutdown) = start_server(ctx).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    let mut request = vec![4, 1];
    request.extend_from_slice(&echo.port().to_be_bytes());
    request.extend_from_slice(&[127, 0, 0, 1]);
    request.extend_from_slice(b"bob\0");
    client.write_all(&request).await.unwrap();

    let mut reply = [0u8; 8];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply[..2], &[0, 90]);
    assert_eq!(&reply[4..], &[127, 0, 0, 1]);

    client.write_all(b"v4").await.unwrap();
    let mut buf = [0u8; 2];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"v4");
}

#[tokio::test]
async fn test_socks4_refused_by_default() {
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    // Refused right after the version byte
    client.write_all(&[4]).await.unwrap();

    let mut reply = [0u8; 8];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply[..2], &[0, 91]);
}

#[tokio::test]
async fn test_udp_associate_not_supported() {
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;
    client
        .write_all(&ipv4_request(3, "0.0.0.0:0".parse().unwrap()))
        .await
        .unwrap();

    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 7);
}

#[tokio::test]
async fn test_bind_end_to_end() {
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;
    let requested: SocketAddr = "127.0.0.1:0".parse().unwrap();
    client.write_all(&ipv4_request(2, requested)).await.unwrap();

    let (code, listen_addr) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);
    assert!(listen_addr.ip().is_loopback());

    let mut peer = TcpStream::connect(listen_addr).await.unwrap();
    let (code, peer_addr) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);
    assert_eq!(peer_addr, peer.local_addr().unwrap());

    peer.write_all(b"from peer").await.unwrap();
    let mut buf = [0u8; 9];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"from peer");

    client.write_all(b"from client").await.unwrap();
    let mut buf = [0u8; 11];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"from client");
}

#[tokio::test]
async fn test_bad_client_does_not_affect_others() {
    let echo = spawn_echo_server().await;
    let (proxy, _shutdown) = start_server(SocksContext::default()).await;

    // Stalls mid-handshake and never finishes
    let mut stalled = TcpStream::connect(proxy).await.unwrap();
    stalled.write_all(&[5, 1]).await.unwrap();

    // Sends garbage
    let mut garbage = TcpStream::connect(proxy).await.unwrap();
    garbage.write_all(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();

    let mut client = TcpStream::connect(proxy).await.unwrap();
    greet_no_auth(&mut client).await;
    client.write_all(&ipv4_request(1, echo)).await.unwrap();
    let (code, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(code, 0);

    client.write_all(b"still here").await.unwrap();
    let mut buf = [0u8; 10];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"still here");

    drop(stalled);
}
