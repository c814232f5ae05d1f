pub mod connection;
pub mod gateway;
pub mod handler;
pub mod msg_edit_handler;
pub mod msg_join_handler;
pub mod msg_ping_handler;

pub use connection::{ConnCtx, ConnState, Outbox};
pub use gateway::{Registry, SyncGateway};
pub use handler::websocket_handler;
