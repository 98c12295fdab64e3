//! MCP server: owns the capability registry and runs a transport.

use crate::config::{ServerConfig, TransportKind};
use crate::error::Result;
use crate::protocol::dispatcher::{DispatchOptions, Dispatcher};
use crate::protocol::http;
use crate::protocol::transport::{self, StdioTransport};
use crate::protocol::types::ServerInfo;
use crate::registry::{CapabilityRegistry, ResourceHandler, ToolHandler};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// MCP Server.
pub struct McpServer {
    config: ServerConfig,
    registry: Arc<CapabilityRegistry>,
}

impl McpServer {
    /// Create a server with an empty registry.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(CapabilityRegistry::new()),
        }
    }

    pub fn builder() -> McpServerBuilder {
        McpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.config.name.to_string(),
            version: self.config.version.to_string(),
        }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn register_tool<H: ToolHandler + 'static>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: H,
    ) -> &Self {
        self.registry
            .register_tool(name, description, input_schema, handler);
        self
    }

    pub fn register_resource<H: ResourceHandler + 'static>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        handler: H,
    ) -> &Self {
        self.registry
            .register_resource(name, description, mime_type, handler);
        self
    }

    pub fn register_prompt<I, K, D>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
        parameters: I,
    ) -> &Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<String>,
    {
        self.registry
            .register_prompt(name, description, template, parameters);
        self
    }

    /// Dispatcher sharing this server's registry.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(
            Arc::clone(&self.registry),
            self.info(),
            DispatchOptions {
                debug: self.config.debug,
                handler_timeout: self.config.handler_timeout,
            },
        ))
    }

    /// Run on the configured transport until it closes.
    #[instrument(skip(self), fields(server = %self.config.name))]
    pub async fn run(self) -> Result<()> {
        info!(
            "Starting MCP server: {} v{} ({} tools, {} resources, {} prompts)",
            self.config.name,
            self.config.version,
            self.registry.tool_count(),
            self.registry.resource_count(),
            self.registry.prompt_count()
        );

        match self.config.transport {
            TransportKind::Stdio => self.run_stdio().await,
            TransportKind::Http => self.run_http().await,
        }?;

        info!("Server stopped");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout.
    pub async fn run_stdio(&self) -> Result<()> {
        let dispatcher = self.dispatcher();
        let mut stdio = StdioTransport::stdio();
        transport::serve(&dispatcher, &mut stdio).await
    }

    /// Serve JSON-RPC over HTTP on the configured address.
    pub async fn run_http(&self) -> Result<()> {
        http::serve(self.dispatcher(), &self.config.http).await
    }
}

/// Builder for MCP Server.
pub struct McpServerBuilder {
    config: Option<ServerConfig>,
    name: Option<Cow<'static, str>>,
    version: Option<Cow<'static, str>>,
    transport: Option<TransportKind>,
    debug: Option<bool>,
    handler_timeout: Option<Duration>,
}

impl McpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            name: None,
            version: None,
            transport: None,
            debug: None,
            handler_timeout: None,
        }
    }

    /// Start from a full configuration; the other setters override it.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<McpServer> {
        let base = self.config.unwrap_or_default();
        let mut builder = ServerConfig::builder()
            .name(self.name.unwrap_or(base.name))
            .version(self.version.unwrap_or(base.version))
            .transport(self.transport.unwrap_or(base.transport))
            .http(base.http)
            .debug(self.debug.unwrap_or(base.debug))
            .logging(base.logging);
        if let Some(timeout) = self.handler_timeout.or(base.handler_timeout) {
            builder = builder.handler_timeout(timeout);
        }
        Ok(McpServer::new(builder.build()?))
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::JsonRpcRequest;
    use crate::registry::FnTool;
    use serde_json::json;

    #[test]
    fn test_server_builder() {
        let server = McpServerBuilder::new()
            .name("test-server")
            .version("0.1.0")
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(server.info().name, "test-server");
        assert_eq!(server.info().version, "0.1.0");
        assert!(server.config().debug);
        assert_eq!(server.config().transport, TransportKind::Stdio);
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        assert!(McpServer::builder().name("").build().is_err());
    }

    #[test]
    fn test_builder_overrides_config() {
        let config = ServerConfig::builder()
            .name("from-config")
            .transport(TransportKind::Http)
            .build()
            .unwrap();
        let server = McpServer::builder()
            .config(config)
            .version("9.9.9")
            .build()
            .unwrap();

        assert_eq!(server.info().name, "from-config");
        assert_eq!(server.info().version, "9.9.9");
        assert_eq!(server.config().transport, TransportKind::Http);
    }

    #[tokio::test]
    async fn test_registration_visible_to_dispatcher() {
        let server = McpServer::builder().name("reg").build().unwrap();
        let dispatcher = server.dispatcher();

        // Registered after the dispatcher exists: the registry is shared.
        server.register_tool("now", "", json!({}), FnTool::new(|_| Ok(json!("ok"))));

        let response = dispatcher
            .dispatch(JsonRpcRequest::new("tools/list").with_id(1))
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["result"]["tools"][0]["name"], "now");
    }
}
