//! WebSocket provider against a local server

#![cfg(feature = "websocket")]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use greenhouse_connectors::{
    wire, BackoffPolicy, DataProvider, EventSink, ProviderEvent, WebSocketConfig,
    WebSocketProvider, WireMessage,
};
use greenhouse_core::{ConnectionState, Sample};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

async fn next_event(rx: &mut UnboundedReceiver<ProviderEvent>) -> ProviderEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for provider event")
        .expect("provider channel closed")
}

fn batch(start: u64, n: u64) -> Vec<Sample> {
    (0..n)
        .map(|i| Sample::new(22.0 + i as f64, 55.0, 700.0, start + i * 100))
        .collect()
}

#[tokio::test]
async fn streams_reconnects_and_disconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First session: a snapshot, a delta, one bad frame, then close
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let snapshot = wire::encode(&WireMessage::Snapshot(batch(1_000, 3))).unwrap();
        let delta = wire::encode(&WireMessage::Delta(vec![
            Sample::new(23.0, 54.0, 710.0, 1_300).with_event("Vent opened"),
        ]))
        .unwrap();
        ws.send(Message::Text(snapshot)).await.unwrap();
        ws.send(Message::Text("{not json".into())).await.unwrap();
        ws.send(Message::Text(delta)).await.unwrap();
        ws.close(None).await.unwrap();

        // Second session stays open until the client leaves
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }
    });

    let config = WebSocketConfig::new(format!("ws://{}", addr))
        .path("/telemetry")
        .backoff(BackoffPolicy::default().initial_ms(10).max_ms(50));
    let mut provider = WebSocketProvider::new(config).unwrap();
    let (sink, mut rx) = EventSink::channel();
    provider.connect(sink).unwrap();

    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Reconnecting));
    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Live));
    assert_eq!(next_event(&mut rx).await, ProviderEvent::Snapshot(batch(1_000, 3)));
    match next_event(&mut rx).await {
        ProviderEvent::Delta(samples) => {
            assert_eq!(samples.len(), 1);
            assert_eq!(samples[0].event_label, "Vent opened");
        }
        other => panic!("expected delta, got {:?}", other),
    }
    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Offline));
    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Reconnecting));
    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Live));

    provider.disconnect();
    provider.closed().await;
    assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Offline));
    assert!(rx.try_recv().is_err());

    let stats = provider.stats();
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.messages_received, 2);
    assert_eq!(stats.samples_received, 4);
    assert_eq!(stats.messages_malformed, 1);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn refused_connection_keeps_retrying() {
    // Reserve a port, then free it so nothing listens there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = WebSocketConfig::new(format!("ws://{}", addr))
        .backoff(BackoffPolicy::default().initial_ms(5).max_ms(5));
    let mut provider = WebSocketProvider::new(config).unwrap();
    let (sink, mut rx) = EventSink::channel();
    provider.connect(sink).unwrap();

    for _ in 0..3 {
        assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Reconnecting));
        assert_eq!(next_event(&mut rx).await, ProviderEvent::State(ConnectionState::Offline));
    }

    provider.disconnect();
    provider.closed().await;

    let stats = provider.stats();
    assert!(stats.attempts >= 3);
    assert_eq!(stats.connections, 0);
    assert!(stats.last_error.is_some());
}
