use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

/// Failures inside the hub itself. Delivery failures to a single member are
/// not errors; they are pruned and reported through `BroadcastReport`.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons an upgrade request is refused before the socket is accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpgradeError {
    #[error("query parameter `{0}` is required")]
    MissingParam(String),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),
}

impl IntoResponse for UpgradeError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error(
        "heartbeat interval ({heartbeat:?}) must be shorter than the idle timeout ({idle:?})"
    )]
    HeartbeatNotBelowIdle { heartbeat: Duration, idle: Duration },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
