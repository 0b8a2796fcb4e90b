pub mod connection;
pub mod dispatcher;
pub mod registry;

pub use connection::{ConnectionHandle, Outbox, SendError};
pub use dispatcher::{BroadcastReport, Dispatcher};
pub use registry::RoomRegistry;
