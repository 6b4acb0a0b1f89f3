mod common;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use common::{Harness, MemoryWiki};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;
use wiki_client::EventBusBridge;
use wiki_core::{EditorEvent, PageId};

async fn upgrade(ws: WebSocketUpgrade, State(script): State<Vec<String>>) -> Response {
    ws.on_upgrade(move |socket| replay(socket, script))
}

async fn replay(mut socket: WebSocket, script: Vec<String>) {
    // Wait for the registration before delivering anything
    let _ = socket.recv().await;
    for frame in script {
        if socket.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn spawn_bus(script: Vec<String>) -> Url {
    let router = Router::new()
        .route("/eventbus/websocket", get(upgrade))
        .with_state(script);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("ws://{}/eventbus/websocket", addr)).unwrap()
}

fn page_saved(id: i64, client: &str) -> String {
    serde_json::json!({
        "type": "rec",
        "address": "page.saved",
        "body": { "id": id, "client": client },
    })
    .to_string()
}

async fn next_matching<F>(h: &mut Harness, mut accept: F) -> EditorEvent
where
    F: FnMut(&EditorEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = h.events.recv().await.unwrap();
            if accept(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_bridge_notifications_drive_conflict_flag() {
    let wiki = MemoryWiki::with_pages(&[("Home", "# Home"), ("Other", "# Other")]);
    let mut h = Harness::new(wiki).await;
    h.controller.load_page(PageId(0)).await.unwrap();
    let own = h.controller.client_id().to_string();

    let url = spawn_bus(vec![
        page_saved(0, &own),
        page_saved(1, "someone-else"),
        page_saved(0, "someone-else"),
    ])
    .await;
    h.controller
        .connect_event_bus(&EventBusBridge::new(url, Duration::from_secs(60)))
        .await
        .unwrap();

    let conflict = next_matching(&mut h, |e| {
        matches!(e, EditorEvent::ConflictDetected { .. })
    })
    .await;
    match conflict {
        EditorEvent::ConflictDetected { id, client, .. } => {
            assert_eq!(id, PageId(0));
            assert_eq!(client.as_deref(), Some("someone-else"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(h.controller.is_modified_elsewhere().await);

    next_matching(&mut h, |e| {
        matches!(e, EditorEvent::EventBusDisconnected { .. })
    })
    .await;
    h.controller.shutdown();
}

#[tokio::test]
async fn test_own_notifications_over_bridge_are_ignored() {
    let wiki = MemoryWiki::with_pages(&[("Home", "# Home")]);
    let mut h = Harness::new(wiki).await;
    h.controller.load_page(PageId(0)).await.unwrap();
    let own = h.controller.client_id().to_string();

    let url = spawn_bus(vec![page_saved(0, &own), page_saved(0, &own)]).await;
    h.controller
        .connect_event_bus(&EventBusBridge::new(url, Duration::from_secs(60)))
        .await
        .unwrap();

    let mut seen = Vec::new();
    let closed = next_matching(&mut h, |e| {
        seen.push(e.event_type().to_string());
        matches!(e, EditorEvent::EventBusDisconnected { .. })
    })
    .await;
    assert!(matches!(closed, EditorEvent::EventBusDisconnected { .. }));
    assert!(!seen.iter().any(|t| t == "conflict_detected"));
    assert!(!h.controller.is_modified_elsewhere().await);
}
