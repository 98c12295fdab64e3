//! MCP protocol implementation over JSON-RPC 2.0.

pub mod codec;
pub mod dispatcher;
pub mod http;
pub mod server;
pub mod transport;
pub mod types;

pub use codec::{DecodeError, decode, encode};
pub use dispatcher::{DispatchOptions, Dispatcher};
pub use server::{McpServer, McpServerBuilder};
pub use transport::{LineTransport, StdioTransport, Transport};
pub use types::*;
