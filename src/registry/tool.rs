//! Tool handlers.

use crate::error::{ToolError, ToolResult};
use crate::protocol::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// A callable tool. Failures are reported back to the client as text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> ToolResult<Value>;
}

/// Registered tool: its advertised definition plus the handler.
pub struct ToolEntry {
    pub definition: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

/// Adapts a blocking closure. Each call runs on the blocking thread pool.
pub struct FnTool<F> {
    f: Arc<F>,
}

impl<F> FnTool<F>
where
    F: Fn(Map<String, Value>) -> ToolResult<Value> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(Map<String, Value>) -> ToolResult<Value> + Send + Sync + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> ToolResult<Value> {
        let f = Arc::clone(&self.f);
        tokio::task::spawn_blocking(move || f(arguments))
            .await
            .map_err(|e| ToolError::Panicked(super::join_error_message(e)))?
    }
}

/// Adapts a closure returning a future.
pub struct AsyncFnTool<F> {
    f: F,
}

impl<F, Fut> AsyncFnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for AsyncFnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> ToolResult<Value> {
        (self.f)(arguments).await
    }
}
