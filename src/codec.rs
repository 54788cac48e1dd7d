//! # Codec and Message Model
//!
//! Bidirectional mapping between the request/response records and the bytes
//! the transport frames. Serialization is `serde_json` over the wire structs
//! below, the reference codebase's own serialization choice applied to a
//! self-describing textual format (any byte-preserving codec would satisfy
//! the spec; JSON is what this crate ships).
//!
//! Byte-strings have no native JSON representation, so [`Value::Bytes`] is
//! escaped through the `bytes_wire` convention: `{"$bytes": "<base64>"}`.
//! Unknown fields on the `Request`/`Response` wire structs are rejected on
//! decode via `#[serde(deny_unknown_fields)]`.

use crate::error::RpcError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A request record: a correlation id, a method name, and named parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub request_id: String,
    pub method: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// A response record. Exactly one of `result`/`error` is meaningful:
/// `error.is_some()` implies the call failed remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Response {
    pub request_id: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(request_id: String, result: Value) -> Self {
        Self {
            request_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(request_id: String, error: impl Into<String>) -> Self {
        Self {
            request_id,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Encode a request to bytes. The returned length is exactly what the
/// transport frames (`len(encode(x))`).
pub fn encode_request(request: &Request) -> Result<Vec<u8>, RpcError> {
    serde_json::to_vec(request).map_err(|e| RpcError::Serialization(e.to_string()))
}

/// Decode a request from bytes, rejecting unknown fields.
pub fn decode_request(bytes: &[u8]) -> Result<Request, RpcError> {
    serde_json::from_slice(bytes).map_err(|e| RpcError::Serialization(e.to_string()))
}

/// Encode a response to bytes.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, RpcError> {
    serde_json::to_vec(response).map_err(|e| RpcError::Serialization(e.to_string()))
}

/// Decode a response from bytes, rejecting unknown fields.
pub fn decode_response(bytes: &[u8]) -> Result<Response, RpcError> {
    serde_json::from_slice(bytes).map_err(|e| RpcError::Serialization(e.to_string()))
}

/// Serde helper escaping a byte-string through `{"$bytes": "<base64>"}`,
/// since JSON has no native binary type.
pub mod bytes_wire {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Wire {
        #[serde(rename = "$bytes")]
        bytes: String,
    }

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Wire {
            bytes: STANDARD.encode(data),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = Wire::deserialize(deserializer)?;
        STANDARD
            .decode(wire.bytes.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), Value::Int(5));
        params.insert("b".to_string(), Value::Float(3.5));
        params.insert("name".to_string(), Value::String("hi".to_string()));
        params.insert("raw".to_string(), Value::Bytes(vec![1, 2, 3, 255]));
        let req = Request {
            request_id: "abc-123".to_string(),
            method: "add".to_string(),
            params,
        };
        let bytes = encode_request(&req).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        assert_eq!(decoded.request_id, req.request_id);
        assert_eq!(decoded.method, req.method);
        assert_eq!(decoded.params.get("a").unwrap().as_i64(), Some(5));
        assert_eq!(decoded.params.get("raw").unwrap().as_bytes(), Some(&[1u8, 2, 3, 255][..]));
    }

    #[test]
    fn response_round_trip_result() {
        let resp = Response::ok("id-1".to_string(), Value::Int(8));
        let bytes = encode_response(&resp).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.request_id, "id-1");
        assert_eq!(decoded.result.unwrap().as_i64(), Some(8));
        assert!(decoded.error.is_none());
    }

    #[test]
    fn response_round_trip_error() {
        let resp = Response::failure("id-2".to_string(), "Division by zero");
        let bytes = encode_response(&resp).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.error.as_deref(), Some("Division by zero"));
        assert!(decoded.result.is_none());
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let bad = br#"{"request_id":"a","method":"m","params":{},"extra":1}"#;
        let err = decode_request(bad).unwrap_err();
        assert!(matches!(err, RpcError::Serialization(_)));
    }

    #[test]
    fn nested_list_and_map_round_trip() {
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), Value::Bool(true));
        let list = Value::List(vec![Value::Null, Value::Int(1), Value::Map(inner)]);
        let mut params = BTreeMap::new();
        params.insert("data".to_string(), list);
        let req = Request {
            request_id: "r".to_string(),
            method: "m".to_string(),
            params,
        };
        let bytes = encode_request(&req).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        let data = decoded.params.get("data").unwrap().as_list().unwrap();
        assert_eq!(data.len(), 3);
        assert!(data[0].is_null());
    }
}
