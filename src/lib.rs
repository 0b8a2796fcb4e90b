pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod models;
pub mod server;
pub mod state;
pub mod utils;
pub mod websocket;

pub use config::HubConfig;
pub use error::{ConfigError, HubError, ServerError, UpgradeError};
pub use hub::{BroadcastReport, ConnectionHandle, Dispatcher, RoomRegistry};
pub use server::Server;
