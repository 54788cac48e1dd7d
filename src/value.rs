//! # Codec Value Model
//!
//! Defines the small, recursive value sum type shared by request parameters
//! and response results. The original source binds arbitrary dynamically-typed
//! values; a strongly-typed core needs a closed set of kinds instead, so method
//! implementations extract what they expect from [`Value`] and fail with
//! `RpcError::Protocol` on a missing or ill-typed key (see [`Params`]).

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A codec-representable value.
///
/// Supported kinds: null, boolean, integer, floating-point, string,
/// byte-string, ordered sequence, and mapping with string keys. Recursion is
/// permitted through `List` and `Map`. Integers round-trip as `i64`; floats
/// round-trip in IEEE-754 double precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Byte-string. Encoded on the wire as `{"$bytes": "<base64>"}` since JSON
    /// has no native binary type; see [`crate::codec`] for the escaping.
    Bytes(#[serde(with = "crate::codec::bytes_wire")] Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Convenience wrapper over a request's `params` map.
///
/// Server method handlers use this to extract required keyword arguments by
/// name, the Rust stand-in for the source's keyword-argument dispatch. A
/// missing or wrongly-typed key surfaces as `RpcError::Protocol`, per §9 of
/// the design notes ("Keyword-argument dispatch").
pub struct Params<'a>(pub &'a BTreeMap<String, Value>);

impl<'a> Params<'a> {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn missing(key: &str) -> RpcError {
        RpcError::Protocol(format!("missing required parameter: {key}"))
    }

    fn wrong_type(key: &str, expected: &str) -> RpcError {
        RpcError::Protocol(format!("parameter {key} is not a {expected}"))
    }

    pub fn require_i64(&self, key: &str) -> Result<i64, RpcError> {
        self.get(key)
            .ok_or_else(|| Self::missing(key))?
            .as_i64()
            .ok_or_else(|| Self::wrong_type(key, "integer"))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, RpcError> {
        self.get(key)
            .ok_or_else(|| Self::missing(key))?
            .as_f64()
            .ok_or_else(|| Self::wrong_type(key, "number"))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, RpcError> {
        self.get(key)
            .ok_or_else(|| Self::missing(key))?
            .as_str()
            .ok_or_else(|| Self::wrong_type(key, "string"))
    }

    pub fn require_bool(&self, key: &str) -> Result<bool, RpcError> {
        self.get(key)
            .ok_or_else(|| Self::missing(key))?
            .as_bool()
            .ok_or_else(|| Self::wrong_type(key, "boolean"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_require_i64_missing() {
        let map = BTreeMap::new();
        let params = Params(&map);
        let err = params.require_i64("a").unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn params_require_i64_wrong_type() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::String("nope".to_string()));
        let params = Params(&map);
        let err = params.require_i64("a").unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn params_require_i64_from_float_with_no_fraction() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Float(5.0));
        let params = Params(&map);
        assert_eq!(params.require_i64("a").unwrap(), 5);
    }
}
