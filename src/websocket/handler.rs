use axum::{
    extract::{
        Query, State,
        rejection::QueryRejection,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, sync::Arc};

use crate::{config::HubConfig, error::UpgradeError, state::AppState, websocket::connection};

/// Room and user a connection asked to join, validated before the upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: Arc<str>,
    pub user_id: Arc<str>,
}

impl JoinRequest {
    pub fn from_params(
        config: &HubConfig,
        params: &HashMap<String, String>,
    ) -> Result<Self, UpgradeError> {
        let room_id = required(params, &config.room_param)?;
        let user_id = required(params, &config.user_param)?;
        Ok(Self { room_id, user_id })
    }
}

fn required(params: &HashMap<String, String>, name: &str) -> Result<Arc<str>, UpgradeError> {
    params
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .map(|v| Arc::from(v.as_str()))
        .ok_or_else(|| UpgradeError::MissingParam(name.to_string()))
}

/// `GET /ws`: validates the room and user parameters, then hands the socket to
/// the connection lifecycle. Parameters are checked before the upgrade so a
/// bad request never touches the registry.
pub async fn ws_handler(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return UpgradeError::InvalidQuery(rejection.body_text()).into_response();
        }
    };

    let join = match JoinRequest::from_params(&state.config, &params) {
        Ok(join) => join,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting upgrade");
            return err.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "not a websocket upgrade");
            return rejection.into_response();
        }
    };

    tracing::debug!(room = %join.room_id, user = %join.user_id, "upgrading connection");
    ws.on_failed_upgrade(|err| tracing::warn!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| connection::handle_socket(socket, join, state))
}
