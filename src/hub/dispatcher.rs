use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{connection::ConnectionHandle, registry::RoomRegistry};
use crate::{
    error::HubError,
    models::message::{ChatMessage, Notification, Outbound},
};

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// Fans payloads out to every member of a room.
///
/// Delivery only enqueues onto each member's outbound queue, so a slow
/// reader never holds up the rest of the room. A member whose queue is full or
/// closed is closed and dropped from the registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<RoomRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn broadcast(
        &self,
        room: &str,
        payload: &Outbound,
    ) -> Result<BroadcastReport, HubError> {
        let frame = Utf8Bytes::from(serde_json::to_string(payload)?);
        let members = self.registry.members_of(room).await;

        let mut report = BroadcastReport::default();
        for member in members {
            match member.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        room,
                        conn = %member.id(),
                        user = member.user_id(),
                        error = %err,
                        "delivery failed, dropping connection"
                    );
                    self.prune(room, &member).await;
                    report.pruned += 1;
                }
            }
        }

        tracing::trace!(room, delivered = report.delivered, pruned = report.pruned, "broadcast");
        Ok(report)
    }

    /// Relays a chat message to the whole room, sender included.
    pub async fn relay(&self, room: &str, msg: &ChatMessage) -> Result<BroadcastReport, HubError> {
        self.broadcast(room, &Outbound::Chat(msg.clone())).await
    }

    /// Sends a notification; `data` is forwarded as-is.
    pub async fn notify(
        &self,
        room: &str,
        event: &str,
        data: Map<String, Value>,
    ) -> Result<BroadcastReport, HubError> {
        self.broadcast(room, &Outbound::Notification(Notification::new(event, data)))
            .await
    }

    /// Queues a payload for a single connection, pruning it on failure.
    pub async fn send_to(
        &self,
        conn: &ConnectionHandle,
        payload: &Outbound,
    ) -> Result<bool, HubError> {
        let frame = Utf8Bytes::from(serde_json::to_string(payload)?);
        match conn.try_send(frame) {
            Ok(()) => Ok(true),
            Err(err) => {
                tracing::warn!(conn = %conn.id(), error = %err, "direct delivery failed");
                self.prune(conn.room_id(), conn).await;
                Ok(false)
            }
        }
    }

    async fn prune(&self, room: &str, conn: &ConnectionHandle) {
        conn.close();
        self.registry.leave(room, conn.id()).await;
    }
}
