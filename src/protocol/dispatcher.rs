//! Method dispatcher that routes requests to their handlers.
//!
//! The method set is fixed and held in a table built once per dispatcher.
//! Handler failures are contained here: tool and resource failures become
//! successful responses carrying error text, everything else becomes a
//! JSON-RPC error object. Notifications never produce a response.

use crate::coerce;
use crate::error::{ProtocolError, ProtocolResult, ToolError, ToolResult};
use crate::protocol::codec;
use crate::protocol::types::*;
use crate::registry::{CapabilityRegistry, ResourceBody, join_error_message};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

type MethodFuture<'a> = Pin<Box<dyn Future<Output = ProtocolResult<Value>> + Send + 'a>>;
type MethodFn = for<'a> fn(&'a Dispatcher, Option<Value>) -> MethodFuture<'a>;

#[derive(Clone, Copy)]
enum Route {
    /// Produces a result for requests that carry an id.
    Request(MethodFn),
    /// Never answered, whether or not the envelope carries an id.
    Notification,
}

fn method_table() -> HashMap<&'static str, Route> {
    HashMap::from([
        (
            "initialize",
            Route::Request(|d, p| Box::pin(d.handle_initialize(p))),
        ),
        ("initialized", Route::Notification),
        ("notifications/initialized", Route::Notification),
        (
            "tools/list",
            Route::Request(|d, p| Box::pin(d.handle_list_tools(p))),
        ),
        (
            "tools/call",
            Route::Request(|d, p| Box::pin(d.handle_call_tool(p))),
        ),
        (
            "resources/list",
            Route::Request(|d, p| Box::pin(d.handle_list_resources(p))),
        ),
        (
            "resources/read",
            Route::Request(|d, p| Box::pin(d.handle_read_resource(p))),
        ),
        (
            "prompts/list",
            Route::Request(|d, p| Box::pin(d.handle_list_prompts(p))),
        ),
        (
            "prompts/get",
            Route::Request(|d, p| Box::pin(d.handle_get_prompt(p))),
        ),
    ])
}

/// Behaviour switches for a dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Attach internal error detail to `-32603` responses.
    pub debug: bool,
    /// Upper bound on a single tool or resource handler call.
    pub handler_timeout: Option<Duration>,
}

pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    info: ServerInfo,
    options: DispatchOptions,
    routes: HashMap<&'static str, Route>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>, info: ServerInfo, options: DispatchOptions) -> Self {
        Self {
            registry,
            info,
            options,
            routes: method_table(),
        }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    /// Decode one raw message and dispatch it.
    ///
    /// Undecodable input always yields an error response; a well-formed
    /// notification never yields one.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<JsonRpcResponse> {
        match codec::decode(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Rejected message: {}", e);
                Some(e.into_response())
            }
        }
    }

    /// Dispatch a request to the appropriate handler method.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Dispatching request: {}", request.method);
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let result = match self.routes.get(method.as_str()) {
            Some(Route::Notification) => {
                debug!("Notification received: {}", method);
                return None;
            }
            Some(Route::Request(handler)) => handler(self, params).await,
            None => {
                warn!("Unknown method: {}", method);
                Err(ProtocolError::MethodNotFound(method))
            }
        };

        if id.is_none() {
            if let Err(e) = &result {
                debug!("Suppressing error for notification: {}", e);
            }
            return None;
        }

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                warn!("Request failed: {}", e);
                JsonRpcResponse::error(id, JsonRpcError::from_protocol(&e, self.options.debug))
            }
        })
    }

    async fn handle_initialize(&self, _params: Option<Value>) -> ProtocolResult<Value> {
        let registry = &self.registry;
        let instructions = format!(
            "{} exposes {} tool(s), {} resource(s) and {} prompt(s).",
            self.info.name,
            registry.tool_count(),
            registry.resource_count(),
            registry.prompt_count()
        );

        to_json(&InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: registry.capabilities(),
            server_info: self.info.clone(),
            instructions: Some(instructions),
        })
    }

    async fn handle_list_tools(&self, _params: Option<Value>) -> ProtocolResult<Value> {
        let tools = self.registry.list_tools();
        debug!("Listing {} tools", tools.len());
        to_json(&ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: CallToolParams = parse_params(params)?;
        debug!("Tool call: {}", params.name);

        let result = match self.call_tool(params).await {
            Ok(value) => CallToolResult::text(coerce::to_text(&value)),
            Err(e) => {
                warn!("Tool execution error: {}", e);
                CallToolResult::error(e.to_string())
            }
        };
        to_json(&result)
    }

    async fn call_tool(&self, params: CallToolParams) -> ToolResult<Value> {
        let entry = self.registry.get_tool(&params.name)?;
        let arguments = match params.arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected an object, got {}",
                    other
                )));
            }
        };
        self.run_guarded(async move { entry.handler.call(arguments).await })
            .await
    }

    async fn handle_list_resources(&self, _params: Option<Value>) -> ProtocolResult<Value> {
        to_json(&ListResourcesResult {
            resources: self.registry.list_resources(),
        })
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let ReadResourceParams { uri } = parse_params(params)?;
        debug!("Resource read: {}", uri);

        let result = match self.read_resource(&uri).await {
            Ok((mime_type, body)) => ReadResourceResult {
                contents: vec![body.into_content(&uri, &mime_type)],
                is_error: None,
            },
            Err(e) => {
                warn!("Resource read error: {}", e);
                ReadResourceResult {
                    contents: vec![ResourceContent {
                        uri,
                        mime_type: "text/plain".into(),
                        text: Some(format!("Error reading resource: {}", e)),
                        blob: None,
                    }],
                    is_error: Some(true),
                }
            }
        };
        to_json(&result)
    }

    async fn read_resource(&self, uri: &str) -> ToolResult<(String, ResourceBody)> {
        let entry = self.registry.get_resource(uri)?;
        let mime_type = entry.definition.mime_type.clone();
        let body = self
            .run_guarded(async move { entry.handler.read().await })
            .await?;
        Ok((mime_type, body))
    }

    async fn handle_list_prompts(&self, _params: Option<Value>) -> ProtocolResult<Value> {
        to_json(&ListPromptsResult {
            prompts: self.registry.list_prompts(),
        })
    }

    async fn handle_get_prompt(&self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: GetPromptParams = parse_params(params)?;
        let prompt = self.registry.get_prompt(&params.name)?;
        let arguments = params.arguments.unwrap_or_default();
        to_json(&prompt.render(&arguments))
    }

    /// Run user code on its own task so a panic cannot unwind into the
    /// transport loop, bounded by the configured timeout.
    async fn run_guarded<T, F>(&self, fut: F) -> ToolResult<T>
    where
        T: Send + 'static,
        F: Future<Output = ToolResult<T>> + Send + 'static,
    {
        let mut task = tokio::spawn(fut);
        let joined = match self.options.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(ToolError::Timeout(limit));
                }
            },
            None => task.await,
        };
        joined.map_err(|e| ToolError::Panicked(join_error_message(e)))?
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> ProtocolResult<T> {
    let params = params.ok_or_else(|| ProtocolError::InvalidParams("Missing params".into()))?;
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))
}

fn to_json<T: Serialize>(value: &T) -> ProtocolResult<Value> {
    serde_json::to_value(value).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}
