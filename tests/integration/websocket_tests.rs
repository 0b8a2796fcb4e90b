#[path = "../common/mod.rs"]
mod common;

use futures_util::{SinkExt, StreamExt};
use roomcast::HubConfig;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

use common::{connect, expect_closed, next_json, spawn_server, wait_for_members};

#[tokio::test]
async fn test_join_announces_to_room_including_self() {
    let server = spawn_server(HubConfig::default()).await;

    let mut alice = connect(server.addr, "r1", "alice").await;
    assert_eq!(
        next_json(&mut alice).await,
        json!({ "type": "notification", "event": "user_joined", "data": { "user_id": "alice" } })
    );

    let mut bob = connect(server.addr, "r1", "bob").await;
    let joined_bob =
        json!({ "type": "notification", "event": "user_joined", "data": { "user_id": "bob" } });
    assert_eq!(next_json(&mut bob).await, joined_bob);
    assert_eq!(next_json(&mut alice).await, joined_bob);

    assert_eq!(server.state.registry.member_count("r1").await, 2);
}

#[tokio::test]
async fn test_message_is_relayed_then_announced() {
    let server = spawn_server(HubConfig::default()).await;

    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;
    let mut bob = connect(server.addr, "r1", "bob").await;
    next_json(&mut bob).await;
    next_json(&mut alice).await;

    alice
        .send(Message::text(r#"{"message":"hi"}"#))
        .await
        .unwrap();

    for client in [&mut bob, &mut alice] {
        let relay = next_json(client).await;
        assert_eq!(relay["user_id"], "alice");
        assert_eq!(relay["room_id"], "r1");
        assert_eq!(relay["message"], "hi");
        assert!(relay["created_at"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(relay.get("type").is_none());

        assert_eq!(
            next_json(client).await,
            json!({
                "type": "notification",
                "event": "new_message",
                "data": { "message": "hi", "user_id": "alice" }
            })
        );
    }
}

#[tokio::test]
async fn test_client_fields_are_relayed_unmodified() {
    let server = spawn_server(HubConfig::default()).await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;

    let sent = json!({
        "user_id": "alice",
        "room_id": "r1",
        "message": "hello",
        "created_at": "2024-05-01T10:00:00Z"
    });
    alice.send(Message::text(sent.to_string())).await.unwrap();

    assert_eq!(next_json(&mut alice).await, sent);
    assert_eq!(next_json(&mut alice).await["event"], "new_message");
}

#[tokio::test]
async fn test_rooms_do_not_leak() {
    let server = spawn_server(HubConfig::default()).await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;
    let mut carol = connect(server.addr, "r2", "carol").await;
    next_json(&mut carol).await;

    carol
        .send(Message::text(r#"{"message":"only r2"}"#))
        .await
        .unwrap();
    assert_eq!(next_json(&mut carol).await["message"], "only r2");
    assert_eq!(next_json(&mut carol).await["event"], "new_message");

    alice
        .send(Message::text(r#"{"message":"only r1"}"#))
        .await
        .unwrap();
    // Alice's first frame after her own join is her own relay, not carol's.
    assert_eq!(next_json(&mut alice).await["message"], "only r1");
}

#[tokio::test]
async fn test_malformed_frame_reports_to_sender_and_keeps_connection() {
    let server = spawn_server(HubConfig::default()).await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;
    let mut bob = connect(server.addr, "r1", "bob").await;
    next_json(&mut bob).await;
    next_json(&mut alice).await;

    alice.send(Message::text("not json")).await.unwrap();
    let error = next_json(&mut alice).await;
    assert_eq!(error["type"], "notification");
    assert_eq!(error["event"], "error");
    assert!(error["data"]["message"].as_str().is_some());

    alice
        .send(Message::text(r#"{"message":"still here"}"#))
        .await
        .unwrap();
    // Bob never saw the error; his next frame is the relay.
    assert_eq!(next_json(&mut bob).await["message"], "still here");
    assert_eq!(next_json(&mut alice).await["message"], "still here");
    assert_eq!(server.state.registry.member_count("r1").await, 2);
}

#[tokio::test]
async fn test_disconnect_deregisters_without_departure_notice() {
    let server = spawn_server(HubConfig::default()).await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;
    let mut bob = connect(server.addr, "r1", "bob").await;
    next_json(&mut bob).await;
    next_json(&mut alice).await;

    drop(bob);
    wait_for_members(&server.state, "r1", 1).await;

    alice
        .send(Message::text(r#"{"message":"anyone?"}"#))
        .await
        .unwrap();
    assert_eq!(next_json(&mut alice).await["message"], "anyone?");
    assert_eq!(next_json(&mut alice).await["event"], "new_message");
}

#[tokio::test]
async fn test_graceful_close_deregisters() {
    let server = spawn_server(HubConfig::default()).await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;

    alice.close(None).await.unwrap();
    wait_for_members(&server.state, "r1", 0).await;
    assert!(server.state.registry.rooms().await.is_empty());
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    // Heartbeat left at its default so no ping reaches the client before the
    // idle timeout; `serve` does not validate hand-built configs.
    let server = spawn_server(HubConfig {
        idle_timeout: Duration::from_millis(300),
        ..HubConfig::default()
    })
    .await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;

    expect_closed(&mut alice).await;
    wait_for_members(&server.state, "r1", 0).await;
}

#[tokio::test]
async fn test_heartbeat_keeps_quiet_connection_joined() {
    let server = spawn_server(HubConfig {
        heartbeat_interval: Duration::from_millis(100),
        idle_timeout: Duration::from_millis(300),
        ..HubConfig::default()
    })
    .await;
    let mut alice = connect(server.addr, "r1", "alice").await;
    next_json(&mut alice).await;

    // Only read; tungstenite answers each ping with a pong while polled.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    let mut pings = 0;
    loop {
        match tokio::time::timeout_at(deadline, alice.next()).await {
            Err(_) => break,
            Ok(Some(Ok(Message::Ping(_)))) => pings += 1,
            Ok(Some(Ok(Message::Pong(_)))) => {}
            Ok(other) => panic!("connection ended while quiet: {other:?}"),
        }
    }

    assert!(pings >= 2, "expected repeated heartbeats, saw {pings}");
    assert_eq!(server.state.registry.member_count("r1").await, 1);

    alice
        .send(Message::text(r#"{"message":"still joined"}"#))
        .await
        .unwrap();
    assert_eq!(next_json(&mut alice).await["message"], "still joined");
}

#[tokio::test]
async fn test_configured_param_names() {
    let server = spawn_server(HubConfig {
        room_param: "room".into(),
        user_param: "uid".into(),
        ..HubConfig::default()
    })
    .await;

    let url = format!("ws://{}/ws?room=lobby&uid=dana", server.addr);
    let (mut dana, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(next_json(&mut dana).await["data"]["user_id"], "dana");
    assert_eq!(server.state.registry.member_count("lobby").await, 1);
}

#[tokio::test]
async fn test_missing_params_rejected_before_upgrade() {
    let server = spawn_server(HubConfig::default()).await;

    let url = format!("ws://{}/ws?room_id=r1", server.addr);
    let err = tokio_tungstenite::connect_async(url).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 400);
        }
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
    assert!(server.state.registry.rooms().await.is_empty());
}
