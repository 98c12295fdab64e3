//! Newline-delimited JSON-RPC transport (stdio).
//!
//! Messages are processed strictly one at a time: a line is read, dispatched
//! and answered before the next read, so responses leave in request order.
//! Only protocol frames are written to the output stream.

use crate::error::Result;
use crate::protocol::codec;
use crate::protocol::dispatcher::Dispatcher;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tracing::{debug, info, trace};

/// Transport trait for line-framed MCP communication.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Next raw line without its terminator. `None` at end of stream.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>>;
    /// Write one line and flush it.
    async fn write_line(&mut self, content: &str) -> Result<()>;
}

/// Transport over any buffered reader and writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Stdio-based transport for MCP.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait::async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    async fn write_line(&mut self, content: &str) -> Result<()> {
        trace!("Sending line: {}", content);
        self.writer.write_all(content.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Serve messages from `transport` until end of stream.
///
/// Malformed lines are answered with an error and the loop continues; only
/// I/O failures end it early.
pub async fn serve<T: Transport>(dispatcher: &Dispatcher, transport: &mut T) -> Result<()> {
    info!("Serving MCP over stdio");
    while let Some(line) = transport.read_line().await? {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        trace!("Received line: {}", String::from_utf8_lossy(line));

        let Some(response) = dispatcher.handle_message(line).await else {
            continue;
        };
        let encoded = codec::encode(&response)?;
        transport.write_line(&encoded).await?;
    }
    debug!("EOF received, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dispatcher::DispatchOptions;
    use crate::protocol::types::ServerInfo;
    use crate::registry::{CapabilityRegistry, FnTool};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        let registry = CapabilityRegistry::new();
        registry.register_tool(
            "echo",
            "Echoes its message",
            json!({"type": "object", "properties": {"message": {"type": "string"}}}),
            FnTool::new(|args| Ok(args.get("message").cloned().unwrap_or(Value::Null))),
        );
        Dispatcher::new(
            Arc::new(registry),
            ServerInfo {
                name: "stdio-test".into(),
                version: "0.0.1".into(),
            },
            DispatchOptions::default(),
        )
    }

    async fn run(input: &str) -> Vec<Value> {
        let mut transport = LineTransport::new(input.as_bytes(), Vec::new());
        serve(&dispatcher(), &mut transport).await.unwrap();
        let (_, output) = transport.into_inner();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_request_response() {
        let out = run("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(out[0]["result"]["serverInfo"]["name"], "stdio-test");
    }

    #[tokio::test]
    async fn test_empty_lines_skipped_and_order_kept() {
        let input = concat!(
            "\n",
            "   \n",
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
            "\r\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"echo\",\"arguments\":{\"message\":\"hi\"}}}\n",
        );
        let out = run(input).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], 1);
        assert_eq!(out[1]["id"], 2);
        assert_eq!(out[1]["result"]["content"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_notifications_write_nothing() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"bogus\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"initialized\"}\n",
        );
        assert!(run(input).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_loop() {
        let input = concat!(
            "this is not json\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/list\"}\n",
        );
        let out = run(input).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], Value::Null);
        assert_eq!(out[0]["error"]["code"], -32700);
        assert_eq!(out[1]["id"], 3);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let out = run("{\"jsonrpc\":\"2.0\",\"id\":\"x\",\"method\":\"prompts/list\"}").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "x");
        assert_eq!(out[0]["result"]["prompts"], json!([]));
    }

    #[tokio::test]
    async fn test_empty_input_terminates_cleanly() {
        assert!(run("").await.is_empty());
    }
}
