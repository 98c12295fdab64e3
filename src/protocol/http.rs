//! HTTP transport: one JSON-RPC envelope per POST.
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `POST /mcp` | JSON-RPC endpoint |
//! | `GET /health` | liveness probe |
//! | `GET /` | server summary |
//!
//! JSON-RPC errors travel in a 200 body. Bodies that cannot be decoded into
//! a request get 400 with the error envelope, and notifications get 202 with
//! no body. Each request runs on its own task; the only shared state is the
//! capability registry.

use crate::config::HttpConfig;
use crate::error::Result;
use crate::protocol::codec;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::types::{JsonRpcResponse, MCP_VERSION};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

/// Liveness probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server: String,
    pub version: String,
    pub transport: &'static str,
}

/// Server summary returned by `GET /`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub name: String,
    pub version: String,
    pub protocol_version: &'static str,
    pub capabilities: CapabilityCounts,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct CapabilityCounts {
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub mcp: &'static str,
    pub health: &'static str,
}

/// Build the router serving `dispatcher`.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc))
        .route("/health", get(health))
        .route("/", get(summary))
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState { dispatcher })
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: &HttpConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %config.address(), "starting MCP HTTP server");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn handle_rpc(State(st): State<HttpState>, body: Bytes) -> Response {
    let request = match codec::decode(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected HTTP body: {}", e);
            return envelope(StatusCode::BAD_REQUEST, &e.into_response());
        }
    };

    match st.dispatcher.dispatch(request).await {
        Some(response) => envelope(StatusCode::OK, &response),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn envelope(status: StatusCode, response: &JsonRpcResponse) -> Response {
    match codec::encode(response) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health(State(st): State<HttpState>) -> Json<HealthResponse> {
    let info = st.dispatcher.server_info();
    Json(HealthResponse {
        status: "healthy",
        server: info.name.clone(),
        version: info.version.clone(),
        transport: "http",
    })
}

async fn summary(State(st): State<HttpState>) -> Json<ServerSummary> {
    let info = st.dispatcher.server_info();
    let registry = st.dispatcher.registry();
    Json(ServerSummary {
        name: info.name.clone(),
        version: info.version.clone(),
        protocol_version: MCP_VERSION,
        capabilities: CapabilityCounts {
            tools: registry.tool_count(),
            resources: registry.resource_count(),
            prompts: registry.prompt_count(),
        },
        endpoints: Endpoints {
            mcp: "/mcp",
            health: "/health",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dispatcher::DispatchOptions;
    use crate::protocol::types::ServerInfo;
    use crate::registry::{CapabilityRegistry, FnTool};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let registry = CapabilityRegistry::new();
        registry.register_tool(
            "add",
            "Adds two numbers",
            json!({"type": "object"}),
            FnTool::new(|args| {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(a + b))
            }),
        );
        registry.register_tool("noop", "Does nothing", json!({"type": "object"}), FnTool::new(|_| Ok(Value::Null)));
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            ServerInfo {
                name: "http-test".into(),
                version: "2.0.0".into(),
            },
            DispatchOptions::default(),
        );
        router(Arc::new(dispatcher))
    }

    fn post_mcp(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = app()
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(json["result"]["serverInfo"]["name"], "http-test");
    }

    #[tokio::test]
    async fn test_tool_call() {
        let resp = app()
            .oneshot(post_mcp(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["result"]["content"][0]["text"], "5");
    }

    #[tokio::test]
    async fn test_protocol_error_is_200() {
        let resp = app()
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","id":1,"method":"nope"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let resp = app().oneshot(post_mcp("{broken")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_invalid_envelope_is_400() {
        let resp = app()
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","id":4}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["id"], 4);
        assert_eq!(json["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_notification_is_202_without_body() {
        let resp = app()
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({"status": "healthy", "server": "http-test", "version": "2.0.0", "transport": "http"})
        );
    }

    #[tokio::test]
    async fn test_summary() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "http-test");
        assert_eq!(json["capabilities"]["tools"], 2);
        assert_eq!(json["capabilities"]["prompts"], 0);
    }

    #[tokio::test]
    async fn test_get_on_mcp_not_allowed() {
        let req = Request::builder().uri("/mcp").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tool_lists_agree() {
        let app = app();
        let mut tasks = Vec::new();
        for id in 0..50 {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                let body = format!(r#"{{"jsonrpc":"2.0","id":{},"method":"tools/list"}}"#, id);
                let resp = app.oneshot(post_mcp(body)).await.unwrap();
                assert_eq!(resp.status(), StatusCode::OK);
                body_json(resp).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        for (id, json) in results.iter().enumerate() {
            assert_eq!(json["id"], id);
            assert!(json.get("error").is_none());
            assert_eq!(json["result"], results[0]["result"]);
        }
        assert_eq!(results[0]["result"]["tools"].as_array().unwrap().len(), 2);
    }
}
