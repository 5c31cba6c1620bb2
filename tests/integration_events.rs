mod common;

use common::TestApp;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

const MARKER: &str = "🔒 Dados de contato são ocultados. Use o chat seguro da plataforma.";

#[tokio::test]
async fn test_subscriber_receives_redacted_insert() {
    let app = TestApp::spawn().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let buyer_token = app.token_for(buyer);
    let seller_token = app.token_for(seller);

    let conversation = app.open_conversation(&buyer_token, Uuid::new_v4(), seller).await;
    let conversation_id: Uuid = conversation["id"].as_str().unwrap().parse().unwrap();

    let (mut ws, _) = connect_async(app.ws_events_url(conversation_id, &seller_token))
        .await
        .expect("WebSocket handshake");

    app.send_message(&buyer_token, conversation_id, "me chama no zap (11) 98888-7777").await;

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for insert")
        .expect("stream ended")
        .expect("ws error");

    let WsMessage::Text(text) = frame else {
        panic!("expected text frame, got {frame:?}");
    };
    let event: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(event["type"], "message");
    let message_text = event["message"]["text"].as_str().unwrap();
    assert!(message_text.contains(MARKER));
    assert!(!message_text.contains("98888-7777"));
    assert_eq!(event["message"]["isFiltered"], true);
}

#[tokio::test]
async fn test_events_are_scoped_to_the_conversation() {
    let app = TestApp::spawn().await;
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let buyer_token = app.token_for(buyer);

    let watched = app.open_conversation(&buyer_token, Uuid::new_v4(), seller).await;
    let watched_id: Uuid = watched["id"].as_str().unwrap().parse().unwrap();

    let other = app.open_conversation(&buyer_token, Uuid::new_v4(), seller).await;
    let other_id: Uuid = other["id"].as_str().unwrap().parse().unwrap();
    assert_ne!(watched_id, other_id);

    let (mut ws, _) = connect_async(app.ws_events_url(watched_id, &buyer_token))
        .await
        .expect("WebSocket handshake");

    app.send_message(&buyer_token, other_id, "mensagem em outra conversa").await;

    let result = tokio::time::timeout(Duration::from_millis(500), ws.next()).await;
    assert!(result.is_err(), "received an event for an unrelated conversation");
}

#[tokio::test]
async fn test_invalid_token_fails_handshake() {
    let app = TestApp::spawn().await;
    let buyer_token = app.token_for(Uuid::new_v4());

    let conversation = app.open_conversation(&buyer_token, Uuid::new_v4(), Uuid::new_v4()).await;
    let conversation_id: Uuid = conversation["id"].as_str().unwrap().parse().unwrap();

    let result = connect_async(app.ws_events_url(conversation_id, "not-a-token")).await;
    assert!(result.is_err(), "handshake should be rejected");
}

#[tokio::test]
async fn test_non_participant_cannot_subscribe() {
    let app = TestApp::spawn().await;
    let buyer_token = app.token_for(Uuid::new_v4());
    let outsider_token = app.token_for(Uuid::new_v4());

    let conversation = app.open_conversation(&buyer_token, Uuid::new_v4(), Uuid::new_v4()).await;
    let conversation_id: Uuid = conversation["id"].as_str().unwrap().parse().unwrap();

    let result = connect_async(app.ws_events_url(conversation_id, &outsider_token)).await;
    assert!(result.is_err(), "handshake should be rejected");
}
