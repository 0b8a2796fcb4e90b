use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use super::connection::ConnectionHandle;

type Members = HashMap<Arc<str>, ConnectionHandle>;

/// Tracks which connections are joined to which room.
///
/// One lock guards the whole map. It is only held while the map is mutated or
/// copied, never while a frame is written to a socket.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<Arc<str>, Members>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to `room`. Returns `false` if it was already a member.
    pub async fn join(&self, room: &Arc<str>, conn: ConnectionHandle) -> bool {
        let mut rooms = self.rooms.lock().await;
        let members = rooms.entry(room.clone()).or_default();
        if members.contains_key(conn.id()) {
            return false;
        }
        members.insert(conn.id().clone(), conn);

        tracing::debug!(room = %room, members = members.len(), "connection joined room");
        true
    }

    /// Removes a connection from `room`. Unknown rooms and connections are
    /// ignored, so concurrent callers may race on the same removal. Returns
    /// whether this call removed it.
    pub async fn leave(&self, room: &str, conn_id: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(conn_id).is_some();

        if members.is_empty() {
            rooms.remove(room);
            tracing::debug!(room, "removed empty room");
        } else if removed {
            tracing::debug!(room, remaining = members.len(), "connection left room");
        }
        removed
    }

    /// Snapshot of the room's members at the time of the call.
    pub async fn members_of(&self, room: &str) -> Vec<ConnectionHandle> {
        self.rooms
            .lock()
            .await
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn member_count(&self, room: &str) -> usize {
        self.rooms.lock().await.get(room).map_or(0, HashMap::len)
    }

    /// Snapshot of every non-empty room with its members.
    pub async fn rooms(&self) -> Vec<(Arc<str>, Vec<ConnectionHandle>)> {
        self.rooms
            .lock()
            .await
            .iter()
            .map(|(room, members)| (room.clone(), members.values().cloned().collect()))
            .collect()
    }
}
