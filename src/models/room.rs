use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RoomStats {
    pub room_id: Arc<str>,
    pub connections: usize,
    pub members: Vec<ConnectionStats>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    pub id: Arc<str>,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
}

/// Body of an admin broadcast request.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub event: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}
