//! Embeddable MCP server: register tools, resources and prompts, then serve
//! them over stdio or HTTP as JSON-RPC 2.0.
//!
//! # Example
//!
//! ```no_run
//! use mcpr::{McpServer, registry::FnTool};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = McpServer::builder().name("calculator").build()?;
//!
//!     server.register_tool(
//!         "double",
//!         "Double a number",
//!         json!({"type": "object", "properties": {"x": {"type": "number"}}}),
//!         FnTool::new(|args| {
//!             let x = args.get("x").and_then(Value::as_f64).unwrap_or(0.0);
//!             Ok(json!(x * 2.0))
//!         }),
//!     );
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod coerce;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;

pub use config::{HttpConfig, LogDestination, LoggingConfig, ServerConfig, TransportKind};
pub use error::{McpError, Result};
pub use protocol::{Dispatcher, McpServer, McpServerBuilder};
pub use registry::CapabilityRegistry;
