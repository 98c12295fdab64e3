//! Demo capabilities: add, echo, server_info, greeting.

use crate::coerce;
use crate::error::{ToolError, ToolResult};
use crate::protocol::{MCP_VERSION, McpServer, ServerInfo};
use crate::registry::{CapabilityRegistry, ResourceBody, ResourceHandler, ToolHandler};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct AddArgs {
    pub a: f64,
    pub b: f64,
}

pub struct AddTool;

#[async_trait]
impl ToolHandler for AddTool {
    #[instrument(skip_all, name = "tool_add")]
    async fn call(&self, arguments: Map<String, Value>) -> ToolResult<Value> {
        let args: AddArgs = coerce::parse_arguments(arguments)?;
        let sum = args.a + args.b;
        if !sum.is_finite() {
            return Err(ToolError::failed("Sum is not a finite number"));
        }
        // Whole sums render as integers ("5", not "5.0").
        if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
            Ok(json!(sum as i64))
        } else {
            Ok(json!(sum))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EchoArgs {
    pub message: Value,
}

pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, arguments: Map<String, Value>) -> ToolResult<Value> {
        let args: EchoArgs = coerce::parse_arguments(arguments)?;
        Ok(args.message)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoDocument<'a> {
    name: &'a str,
    version: &'a str,
    protocol_version: &'static str,
    tools: Vec<String>,
    resources: Vec<String>,
    prompts: Vec<String>,
}

/// Describes the running server and what it currently exposes.
pub struct ServerInfoResource {
    info: ServerInfo,
    registry: Arc<CapabilityRegistry>,
}

impl ServerInfoResource {
    pub fn new(info: ServerInfo, registry: Arc<CapabilityRegistry>) -> Self {
        Self { info, registry }
    }
}

#[async_trait]
impl ResourceHandler for ServerInfoResource {
    async fn read(&self) -> ToolResult<ResourceBody> {
        let document = ServerInfoDocument {
            name: &self.info.name,
            version: &self.info.version,
            protocol_version: MCP_VERSION,
            tools: self.registry.list_tools().into_iter().map(|t| t.name).collect(),
            resources: self
                .registry
                .list_resources()
                .into_iter()
                .map(|r| r.uri)
                .collect(),
            prompts: self
                .registry
                .list_prompts()
                .into_iter()
                .map(|p| p.name)
                .collect(),
        };
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| ToolError::failed(e.to_string()))?;
        Ok(ResourceBody::Text(text))
    }
}

/// Register the demo tools, resource and prompt on `server`.
pub fn register(server: &McpServer) {
    server
        .register_tool(
            "add",
            "Add two numbers and return the sum",
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "number", "description": "First operand"},
                    "b": {"type": "number", "description": "Second operand"}
                },
                "required": ["a", "b"]
            }),
            AddTool,
        )
        .register_tool(
            "echo",
            "Return the given message unchanged",
            json!({
                "type": "object",
                "properties": {
                    "message": {"description": "Value to echo back"}
                },
                "required": ["message"]
            }),
            EchoTool,
        )
        .register_resource(
            "server_info",
            "Name, version and capabilities of this server",
            "application/json",
            ServerInfoResource::new(server.info(), Arc::clone(server.registry())),
        )
        .register_prompt(
            "greeting",
            "Greet someone and introduce a topic",
            "Hello {name}! Let's talk about {topic}.",
            [
                ("name", "Who to greet"),
                ("topic", "Subject of the conversation"),
            ],
        );
}
