use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::utils::id_generator::connection_id;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

/// Shared handle to one client connection.
///
/// Cloning is cheap; the registry keeps one clone per member while the
/// lifecycle task that created the connection keeps the socket itself.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Inner>,
}

struct Inner {
    id: Arc<str>,
    user_id: Arc<str>,
    room_id: Arc<str>,
    connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Utf8Bytes>,
    closed: watch::Sender<bool>,
}

/// Receiving end of a connection's outbound queue, drained by its writer task.
pub struct Outbox {
    rx: mpsc::Receiver<Utf8Bytes>,
}

impl Outbox {
    pub async fn recv(&mut self) -> Option<Utf8Bytes> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<Utf8Bytes> {
        self.rx.try_recv().ok()
    }
}

impl ConnectionHandle {
    pub fn new(
        user_id: impl Into<Arc<str>>,
        room_id: impl Into<Arc<str>>,
        capacity: usize,
    ) -> (Self, Outbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(Inner {
                id: connection_id(),
                user_id: user_id.into(),
                room_id: room_id.into(),
                connected_at: Utc::now(),
                tx,
                closed,
            }),
        };
        (handle, Outbox { rx })
    }

    pub fn id(&self) -> &Arc<str> {
        &self.inner.id
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn room_id(&self) -> &Arc<str> {
        &self.inner.room_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.inner.connected_at
    }

    /// Queues a frame without waiting. A full queue means the peer is not
    /// keeping up.
    pub fn try_send(&self, frame: Utf8Bytes) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.inner.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Marks the connection closed. Safe to call any number of times from any
    /// task; returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        !self.inner.closed.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("user_id", &self.inner.user_id)
            .field("room_id", &self.inner.room_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
