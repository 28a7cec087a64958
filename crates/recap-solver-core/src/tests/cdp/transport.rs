use crate::{CdpTransport, SolverError, WsTransport};

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use serde_json::json;

/// WHAT: A command with no reply fails at its deadline instead of hanging
/// WHY: A wedged browser must not wedge the whole solve
#[tokio::test]
async fn given_silent_endpoint_when_sending_command_then_times_out() {
    // Given: A WebSocket server that accepts frames and never replies
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        while let Some(Ok(_)) = socket.next().await {}
    });

    let transport = WsTransport::connect(&format!("ws://{}", addr), Duration::from_millis(200))
        .await
        .unwrap();

    // When: Sending a command
    let started = Instant::now();
    let result = transport
        .send_command(None, "Browser.getVersion", json!({}))
        .await;

    // Then: It times out within the deadline and leaves nothing pending
    assert!(matches!(result, Err(SolverError::CommandTimeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.pending_len().await, 0);
}
