//! Local Unix-socket request/response server with fan-out event streaming
//! for attached clients. Grounded on spec.md §4.N.

pub mod codec;
pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use error::IpcError;
pub use handler::{AttachResult, CommandHandler, HandlerOutcome};
pub use server::IpcServer;
pub use types::{Command, IpcRequest, IpcResponse, ResponseStatus, StreamEvent, StreamEventType};
