use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    models::room::{BroadcastRequest, ConnectionStats, RoomStats},
    state::AppState,
};

#[derive(serde::Serialize)]
struct Stats {
    rooms: Vec<RoomStats>,
    connections: usize,
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let mut rooms: Vec<RoomStats> = state
        .registry
        .rooms()
        .await
        .into_iter()
        .map(|(room_id, members)| RoomStats {
            room_id,
            connections: members.len(),
            members: members
                .iter()
                .map(|conn| ConnectionStats {
                    id: conn.id().clone(),
                    user_id: conn.user_id().to_string(),
                    connected_at: conn.connected_at(),
                })
                .collect(),
        })
        .collect();
    rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
    let connections = rooms.iter().map(|r| r.connections).sum();

    (
        StatusCode::OK,
        Json(serde_json::json!(Stats { rooms, connections })),
    )
}

/// Pushes a notification into a room from outside the socket endpoint.
pub async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(payload)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "BAD_REQUEST" })),
        );
    };
    if payload.event.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "event is required" })),
        );
    }

    match state
        .dispatcher
        .notify(&room_id, &payload.event, payload.data)
        .await
    {
        Ok(report) => {
            tracing::info!(
                room = %room_id,
                event = %payload.event,
                delivered = report.delivered,
                "admin broadcast"
            );
            (StatusCode::OK, Json(serde_json::json!(report)))
        }
        Err(err) => {
            tracing::error!(room = %room_id, error = %err, "admin broadcast failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
        }
    }
}
