use std::sync::Arc;

use crate::{
    config::HubConfig,
    hub::{Dispatcher, RoomRegistry},
};

/// Shared state handed to every handler. Each instance owns its own registry,
/// so separate servers (or tests) never see each other's rooms.
pub struct AppState {
    pub config: HubConfig,
    pub registry: Arc<RoomRegistry>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: HubConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        Self {
            config,
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
        }
    }
}
