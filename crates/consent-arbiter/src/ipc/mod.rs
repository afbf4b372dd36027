//! IPC layer for the consent service.

pub mod handler;
pub mod messages;

pub use handler::ConsentIpcHandler;
pub use messages::{ConsentCall, IpcRequest, IpcResponse};
