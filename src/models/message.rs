use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EVENT_USER_JOINED: &str = "user_joined";
pub const EVENT_NEW_MESSAGE: &str = "new_message";
pub const EVENT_ERROR: &str = "error";

/// A chat line as sent by a client and relayed to the room.
///
/// Only `message` is required inbound; the identity fields are filled in from
/// the sending connection when the client leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room_id: String,
    pub message: String,
    #[serde(default)]
    pub created_at: String,
}

impl ChatMessage {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Fills blank identity and timestamp fields. Fields the client did send
    /// are left untouched.
    pub fn with_defaults(mut self, user_id: &str, room_id: &str) -> Self {
        if self.user_id.is_empty() {
            self.user_id = user_id.to_string();
        }
        if self.room_id.is_empty() {
            self.room_id = room_id.to_string();
        }
        if self.created_at.is_empty() {
            self.created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        }
        self
    }
}

/// A typed room event, serialized as
/// `{"type":"notification","event":..,"data":{..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "notification")]
pub struct Notification {
    pub event: String,
    pub data: Map<String, Value>,
}

impl Notification {
    pub fn new(event: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn user_joined(user_id: &str) -> Self {
        let mut data = Map::new();
        data.insert("user_id".into(), Value::from(user_id));
        Self::new(EVENT_USER_JOINED, data)
    }

    pub fn new_message(msg: &ChatMessage) -> Self {
        let mut data = Map::new();
        data.insert("message".into(), Value::from(msg.message.as_str()));
        data.insert("user_id".into(), Value::from(msg.user_id.as_str()));
        Self::new(EVENT_NEW_MESSAGE, data)
    }

    pub fn error(reason: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("message".into(), Value::String(reason.into()));
        Self::new(EVENT_ERROR, data)
    }
}

/// Everything the hub writes to a socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Chat(ChatMessage),
    Notification(Notification),
}

impl From<ChatMessage> for Outbound {
    fn from(msg: ChatMessage) -> Self {
        Self::Chat(msg)
    }
}

impl From<Notification> for Outbound {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}
