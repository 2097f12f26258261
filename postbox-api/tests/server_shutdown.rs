//! Shutdown behaviour of the real server over TCP

use std::sync::Arc;
use std::time::{Duration, Instant};

use postbox_api::ApiServer;
use postbox_core::shutdown::{ShutdownCoordinator, ShutdownState};
use postbox_core::test_utils::test_service;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_shutdown_ends_open_streams_before_the_deadline() {
    let service = Arc::new(test_service());
    let shutdown = Arc::new(ShutdownCoordinator::new(DRAIN_TIMEOUT));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server =
        tokio::spawn(ApiServer::new(service.clone(), addr).serve(listener, shutdown.clone()));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /subscriptions/newMessage HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut head = vec![0u8; 1024];
    let n = timeout(Duration::from_secs(2), client.read(&mut head))
        .await
        .expect("response head within timeout")
        .unwrap();
    let head = String::from_utf8_lossy(&head[..n]);
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    assert!(head.contains("text/event-stream"), "{head}");
    assert_eq!(service.broker().subscriber_count(), 1);

    let started = Instant::now();
    shutdown.shutdown().await;

    timeout(Duration::from_secs(5), server)
        .await
        .expect("serve returns once streams are closed")
        .unwrap()
        .unwrap();
    assert!(started.elapsed() < DRAIN_TIMEOUT);
    assert_eq!(shutdown.state().await, ShutdownState::Shutdown);
    assert_eq!(service.broker().subscriber_count(), 0);

    // The client sees its stream terminate rather than hang.
    let mut rest = Vec::new();
    timeout(Duration::from_secs(2), client.read_to_end(&mut rest))
        .await
        .expect("connection closed")
        .unwrap();
}

#[tokio::test]
async fn test_run_binds_and_stops_on_request() {
    let shutdown = Arc::new(ShutdownCoordinator::new(DRAIN_TIMEOUT));
    let server = ApiServer::new(Arc::new(test_service()), "127.0.0.1:0".parse().unwrap());
    let running = tokio::spawn(server.run(shutdown.clone()));

    tokio::task::yield_now().await;
    shutdown.shutdown().await;

    timeout(Duration::from_secs(5), running)
        .await
        .expect("run returns after shutdown")
        .unwrap()
        .unwrap();
    assert_eq!(shutdown.state().await, ShutdownState::Shutdown);
}
