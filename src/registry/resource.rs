//! Resource handlers.

use crate::error::{ToolError, ToolResult};
use crate::protocol::{Resource, ResourceContent};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

/// Payload produced by reading a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl ResourceBody {
    /// Wire form. Bytes travel base64-encoded in `blob`.
    pub fn into_content(self, uri: &str, mime_type: &str) -> ResourceContent {
        let (text, blob) = match self {
            Self::Text(text) => (Some(text), None),
            Self::Bytes(bytes) => (None, Some(STANDARD.encode(bytes))),
        };
        ResourceContent {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
            text,
            blob,
        }
    }
}

impl From<String> for ResourceBody {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ResourceBody {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for ResourceBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A readable resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self) -> ToolResult<ResourceBody>;
}

/// Registered resource: its advertised definition plus the handler.
pub struct ResourceEntry {
    pub definition: Resource,
    pub handler: Arc<dyn ResourceHandler>,
}

/// Adapts a blocking closure. Each read runs on the blocking thread pool.
pub struct FnResource<F> {
    f: Arc<F>,
}

impl<F> FnResource<F>
where
    F: Fn() -> ToolResult<ResourceBody> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> ResourceHandler for FnResource<F>
where
    F: Fn() -> ToolResult<ResourceBody> + Send + Sync + 'static,
{
    async fn read(&self) -> ToolResult<ResourceBody> {
        let f = Arc::clone(&self.f);
        tokio::task::spawn_blocking(move || f())
            .await
            .map_err(|e| ToolError::Panicked(super::join_error_message(e)))?
    }
}
