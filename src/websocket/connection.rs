use axum::{
    body::Bytes,
    extract::ws::{Message as WsMessage, WebSocket},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, interval_at, timeout};
use tracing::Instrument;

use crate::{
    hub::{ConnectionHandle, Outbox},
    models::message::{ChatMessage, Notification, Outbound},
    state::AppState,
    websocket::handler::JoinRequest,
};

/// How long the writer gets to flush and send a close frame after the read
/// side has finished.
const WRITER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum CloseReason {
    ClientClosed,
    StreamEnded,
    ReadError(axum::Error),
    IdleTimeout,
    /// Closed from elsewhere: a failed delivery or the writer hitting an error.
    Dropped,
}

pub async fn handle_socket(socket: WebSocket, join: JoinRequest, state: Arc<AppState>) {
    let (conn, outbox) =
        ConnectionHandle::new(join.user_id, join.room_id, state.config.outbound_queue);
    let span = tracing::info_span!(
        "connection",
        conn = %conn.id(),
        room = %conn.room_id(),
        user = conn.user_id()
    );
    run(socket, conn, outbox, state).instrument(span).await;
}

async fn run(socket: WebSocket, conn: ConnectionHandle, outbox: Outbox, state: Arc<AppState>) {
    let (ws_sender, ws_receiver) = socket.split();

    if !register(&state, &conn).await {
        conn.close();
        return;
    }

    let mut send_task = tokio::spawn(
        write_loop(
            ws_sender,
            outbox,
            conn.clone(),
            state.config.heartbeat_interval,
        )
        .in_current_span(),
    );

    let joined = Outbound::from(Notification::user_joined(conn.user_id()));
    if let Err(err) = state.dispatcher.broadcast(conn.room_id(), &joined).await {
        tracing::warn!(error = %err, "failed to announce join");
    }

    let reason = read_loop(ws_receiver, &conn, &state).await;

    conn.close();
    state.registry.leave(conn.room_id(), conn.id()).await;
    if timeout(WRITER_SHUTDOWN_GRACE, &mut send_task).await.is_err() {
        send_task.abort();
    }

    tracing::info!(reason = ?reason, "connection closed");
}

/// Joins the connection to its room. A connection whose id is already
/// registered is refused, so its later `leave` cannot remove the other one.
async fn register(state: &AppState, conn: &ConnectionHandle) -> bool {
    if !state.registry.join(conn.room_id(), conn.clone()).await {
        tracing::warn!("connection id already registered, refusing connection");
        return false;
    }
    let members = state.registry.member_count(conn.room_id()).await;
    tracing::info!(members, "connection joined");
    true
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    conn: &ConnectionHandle,
    state: &AppState,
) -> CloseReason {
    let idle_timeout = state.config.idle_timeout;
    loop {
        let next = tokio::select! {
            _ = conn.closed() => return CloseReason::Dropped,
            next = timeout(idle_timeout, receiver.next()) => next,
        };

        let frame = match next {
            Err(_) => return CloseReason::IdleTimeout,
            Ok(None) => return CloseReason::StreamEnded,
            Ok(Some(Err(err))) => return CloseReason::ReadError(err),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            WsMessage::Text(text) => handle_payload(text.as_str().as_bytes(), conn, state).await,
            WsMessage::Binary(bytes) => handle_payload(&bytes, conn, state).await,
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            WsMessage::Close(_) => return CloseReason::ClientClosed,
        }
    }
}

/// Relays one inbound chat message, then announces it. A frame that does not
/// parse is answered with an `error` notification to the sender only.
async fn handle_payload(raw: &[u8], conn: &ConnectionHandle, state: &AppState) {
    let msg = match ChatMessage::parse(raw) {
        Ok(msg) => msg.with_defaults(conn.user_id(), conn.room_id()),
        Err(err) => {
            tracing::debug!(error = %err, "malformed payload");
            let reply = Outbound::from(Notification::error(format!("invalid message: {err}")));
            if let Err(err) = state.dispatcher.send_to(conn, &reply).await {
                tracing::warn!(error = %err, "failed to report malformed payload");
            }
            return;
        }
    };

    let room = conn.room_id();
    if let Err(err) = state.dispatcher.relay(room, &msg).await {
        tracing::warn!(error = %err, "failed to relay message");
        return;
    }
    let announce = Outbound::from(Notification::new_message(&msg));
    if let Err(err) = state.dispatcher.broadcast(room, &announce).await {
        tracing::warn!(error = %err, "failed to announce message");
    }
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, WsMessage>,
    mut outbox: Outbox,
    conn: ConnectionHandle,
    heartbeat: Duration,
) {
    let mut heartbeat = interval_at(Instant::now() + heartbeat, heartbeat);

    loop {
        tokio::select! {
            frame = outbox.recv() => {
                let Some(frame) = frame else { break };
                if let Err(err) = sender.send(WsMessage::Text(frame)).await {
                    tracing::debug!(error = %err, "write failed");
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if let Err(err) = sender.send(WsMessage::Ping(Bytes::new())).await {
                    tracing::debug!(error = %err, "heartbeat failed");
                    break;
                }
            }
            _ = conn.closed() => break,
        }
    }

    // Wakes the read side if the socket failed on this end.
    conn.close();
    let _ = sender.close().await;
}
