//! End-to-end tests for the WebSocket notification endpoint.
//!
//! Each test serves the real router on an ephemeral port and drives it with
//! a `tokio-tungstenite` client. Notifications are pushed straight into the
//! hub, the same way a worker does after a job.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cuedeck_core::notification::{FileNotification, NotificationOutcome};
use cuedeck_core::types::DbId;
use cuedeck_events::NotificationHub;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (SocketAddr, Arc<NotificationHub>) {
    let app = common::build_test_app(common::unreachable_pool());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.router).await.unwrap();
    });
    (addr, app.hub)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/ws"))
        .await
        .unwrap();
    client
}

async fn subscribe(client: &mut Client, file_id: DbId) {
    let frame = json!({ "fileID": file_id }).to_string();
    client.send(Message::Text(frame.into())).await.unwrap();
}

/// Poll until the hub holds `count` registrations.
async fn wait_for_registrations(hub: &NotificationHub, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.registration_count().await != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("hub registrations did not settle");
}

/// Read until the server closes, failing on any data frame.
async fn expect_closed(client: &mut Client) {
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(Message::Text(text))) => panic!("unexpected data frame: {text}"),
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server did not close the socket");
}

// ---------------------------------------------------------------------------
// Test: a subscribed client receives exactly one result and is closed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribed_client_receives_result_then_close() {
    let (addr, hub) = serve().await;
    let file_id = DbId::new_v4();
    let mut client = connect(addr).await;

    subscribe(&mut client, file_id).await;
    wait_for_registrations(&hub, 1).await;

    hub.notify(&file_id.to_string(), "notes.txt", NotificationOutcome::Ready)
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    let notification: FileNotification = serde_json::from_str(&text).unwrap();
    assert_eq!(notification.status, NotificationOutcome::Ready);
    assert_eq!(notification.file_id, file_id.to_string());
    assert_eq!(notification.file_name, "notes.txt");

    expect_closed(&mut client).await;
    assert_eq!(hub.registration_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: failure outcomes travel the same path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failure_notification_is_delivered() {
    let (addr, hub) = serve().await;
    let file_id = DbId::new_v4();
    let mut client = connect(addr).await;

    subscribe(&mut client, file_id).await;
    wait_for_registrations(&hub, 1).await;
    hub.notify(&file_id.to_string(), "slides.pptx", NotificationOutcome::Failed)
        .await
        .unwrap();

    let Some(Ok(Message::Text(text))) = client.next().await else {
        panic!("expected a text frame");
    };
    let notification: FileNotification = serde_json::from_str(&text).unwrap();
    assert_eq!(notification.status, NotificationOutcome::Failed);
}

// ---------------------------------------------------------------------------
// Test: an invalid first frame closes the socket without registering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_subscription_closes_socket() {
    let (addr, hub) = serve().await;
    let mut client = connect(addr).await;

    client
        .send(Message::Text(r#"{"fileID":"not-a-uuid"}"#.to_string().into()))
        .await
        .unwrap();

    expect_closed(&mut client).await;
    assert_eq!(hub.registration_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: a silent client is closed after the handshake timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn silent_client_is_closed_after_handshake_timeout() {
    let (addr, hub) = serve().await;
    let mut client = connect(addr).await;

    expect_closed(&mut client).await;
    assert_eq!(hub.registration_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: a disconnecting client removes its own registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_unregisters() {
    let (addr, hub) = serve().await;
    let mut client = connect(addr).await;

    subscribe(&mut client, DbId::new_v4()).await;
    wait_for_registrations(&hub, 1).await;

    client.close(None).await.unwrap();
    wait_for_registrations(&hub, 0).await;
}

// ---------------------------------------------------------------------------
// Test: the newest socket for a file id wins
// ---------------------------------------------------------------------------

#[tokio::test]
async fn later_subscription_replaces_earlier() {
    let (addr, hub) = serve().await;
    let file_id = DbId::new_v4();

    let mut first = connect(addr).await;
    subscribe(&mut first, file_id).await;
    wait_for_registrations(&hub, 1).await;

    let mut second = connect(addr).await;
    subscribe(&mut second, file_id).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Closing the older socket must not drop the newer registration.
    first.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hub.registration_count().await, 1);

    hub.notify(&file_id.to_string(), "notes.txt", NotificationOutcome::Ready)
        .await
        .unwrap();
    assert!(matches!(second.next().await, Some(Ok(Message::Text(_)))));
}
