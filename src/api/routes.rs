use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use super::{handlers, middleware::admin_auth};
use crate::state::AppState;

/// Admin routes, all behind the `authorization` token check.
pub fn configure_admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(handlers::stats_handler))
        .route("/broadcast/{room_id}", post(handlers::broadcast_handler))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}
