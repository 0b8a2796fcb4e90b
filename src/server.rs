use axum::{Json, Router, http::StatusCode, middleware, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api::{middleware::request_trace, routes};
use crate::config::HubConfig;
use crate::error::ServerError;
use crate::state::AppState;
use crate::websocket::handler;

pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        let mut app = Router::new().route("/ws", get(handler::ws_handler));
        if self.state.config.admin_token.is_some() {
            app = app.nest(
                "/admin",
                routes::configure_admin_routes(self.state.clone()),
            );
        }

        app.fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "NOT_FOUND" })),
            )
        })
        .layer(middleware::from_fn(request_trace))
        .with_state(self.state.clone())
    }

    /// Validates the config, binds `0.0.0.0:<port>` and serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.state.config.validate()?;
        let addr = format!("0.0.0.0:{}", self.state.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "listening");
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
