//! Message codec: raw bytes to JSON-RPC envelopes and back.
//!
//! Decoding validates the envelope shape. Anything that is not JSON fails
//! with `-32700`; JSON that is not a usable request object fails with
//! `-32600`. Both failures carry whatever request id could be recovered, so
//! the caller can always answer them.

use crate::error::{ProtocolError, Result};
use crate::protocol::types::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// A message that could not be turned into a request.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct DecodeError {
    /// Id recovered from the envelope, if any.
    pub id: Option<RequestId>,
    pub error: ProtocolError,
}

impl DecodeError {
    fn new(id: Option<RequestId>, error: ProtocolError) -> Self {
        Self { id, error }
    }

    fn invalid(id: Option<RequestId>, detail: &'static str) -> Self {
        Self::new(id, ProtocolError::InvalidRequest(detail.into()))
    }

    pub fn code(&self) -> i32 {
        self.error.code()
    }

    /// Error envelope to send back. Always emitted, even without an id.
    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.id, JsonRpcError::from_protocol(&self.error, false))
    }
}

/// Decode one JSON-RPC request or notification.
pub fn decode(raw: impl AsRef<[u8]>) -> std::result::Result<JsonRpcRequest, DecodeError> {
    let value: Value = serde_json::from_slice(raw.as_ref()).map_err(|e| {
        debug!("Failed to parse message: {}", e);
        DecodeError::new(None, ProtocolError::ParseError)
    })?;

    // Batches are arrays and fall through here too; they are not supported.
    let Value::Object(mut object) = value else {
        return Err(DecodeError::invalid(None, "Request must be a JSON object"));
    };

    let id = match object.remove("id") {
        None => None,
        Some(raw_id) => match parse_id(raw_id) {
            Some(id) => Some(id),
            None => {
                return Err(DecodeError::invalid(
                    None,
                    "id must be a string, a number or null",
                ));
            }
        },
    };

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => return Err(DecodeError::invalid(id, "jsonrpc must be \"2.0\"")),
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => return Err(DecodeError::invalid(id, "method must be a string")),
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
        Some(_) => return Err(DecodeError::invalid(id, "params must be an object or array")),
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        method,
        params,
    })
}

/// Encode a response envelope as a single line of JSON.
pub fn encode(response: &JsonRpcResponse) -> Result<String> {
    Ok(serde_json::to_string(response)?)
}

fn parse_id(value: Value) -> Option<RequestId> {
    match value {
        Value::Null => Some(RequestId::Null),
        Value::String(s) => Some(RequestId::String(s)),
        Value::Number(n) => Some(RequestId::Number(n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_request() {
        let request =
            decode(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).unwrap();
        assert_eq!(request.method, "initialize");
        assert_eq!(request.id, Some(RequestId::from(1)));
        assert_eq!(request.params, Some(json!({})));
    }

    #[test]
    fn test_decode_notification() {
        let request = decode(r#"{"jsonrpc":"2.0","method":"initialized"}"#).unwrap();
        assert!(request.is_notification());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_decode_explicit_null_id_is_not_a_notification() {
        let request = decode(r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_decode_string_id() {
        let request = decode(r#"{"jsonrpc":"2.0","id":"abc","method":"tools/list"}"#).unwrap();
        assert_eq!(request.id, Some(RequestId::from("abc")));
    }

    #[test]
    fn test_decode_fractional_id() {
        let request = decode(r#"{"jsonrpc":"2.0","id":1.5,"method":"tools/list"}"#).unwrap();
        let response = JsonRpcResponse::success(request.id, json!({}));
        assert!(encode(&response).unwrap().contains(r#""id":1.5"#));

        let request = decode(r#"{"jsonrpc":"2.0","id":2.0,"method":"tools/list"}"#).unwrap();
        let response = JsonRpcResponse::success(request.id, json!({}));
        assert!(encode(&response).unwrap().contains(r#""id":2.0"#));
    }

    #[test]
    fn test_decode_large_unsigned_id() {
        let request =
            decode(r#"{"jsonrpc":"2.0","id":18446744073709551615,"method":"tools/list"}"#)
                .unwrap();
        assert_eq!(request.id, Some(RequestId::Number(u64::MAX.into())));

        let response = JsonRpcResponse::success(request.id, json!({}));
        assert!(encode(&response).unwrap().contains(r#""id":18446744073709551615"#));
    }

    #[test]
    fn test_decode_rejects_non_scalar_id() {
        let err = decode(r#"{"jsonrpc":"2.0","id":[1],"method":"tools/list"}"#).unwrap_err();
        assert_eq!(err.code(), -32600);
        assert!(err.id.is_none());
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode("{not json").unwrap_err();
        assert_eq!(err.code(), -32700);
        assert!(err.id.is_none());
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode([0xff, 0xfe, b'{']).unwrap_err();
        assert_eq!(err.code(), -32700);
    }

    #[test]
    fn test_decode_wrong_version_keeps_id() {
        let err = decode(r#"{"jsonrpc":"1.0","id":7,"method":"tools/list"}"#).unwrap_err();
        assert_eq!(err.code(), -32600);
        assert_eq!(err.id, Some(RequestId::from(7)));
    }

    #[test]
    fn test_decode_missing_method() {
        let err = decode(r#"{"jsonrpc":"2.0","id":2}"#).unwrap_err();
        assert_eq!(err.code(), -32600);
    }

    #[test]
    fn test_decode_rejects_batches_and_scalars() {
        assert_eq!(decode("[]").unwrap_err().code(), -32600);
        assert_eq!(decode("42").unwrap_err().code(), -32600);
    }

    #[test]
    fn test_decode_rejects_scalar_params() {
        let err = decode(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list","params":3}"#)
            .unwrap_err();
        assert_eq!(err.code(), -32600);
    }

    #[test]
    fn test_decode_error_response_shape() {
        let response = decode("garbage").unwrap_err().into_response();
        let value: Value = serde_json::from_str(&encode(&response).unwrap()).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["error"]["message"], "Parse error");
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_encode_is_single_line() {
        let response = JsonRpcResponse::success(Some(1.into()), json!({"text": "a\nb"}));
        let encoded = encode(&response).unwrap();
        assert!(!encoded.contains('\n'));
    }
}
