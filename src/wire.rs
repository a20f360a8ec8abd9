//! The `remote` wire contract.
//!
//! A remote call POSTs `{"args": [value, ...]}` to the validator's
//! identifier and expects a single JSON value back. The response is read as
//! untyped text would be: `"true"` is a boolean, `"12"` a number.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    convert::{json_to_value, value_to_json},
    value::Value,
};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed remote payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request body of a remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub args: Vec<serde_json::Value>,
}

impl RemoteRequest {
    pub fn new(args: &[Value]) -> Self {
        RemoteRequest {
            args: args.iter().map(value_to_json).collect(),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.args.iter().map(json_to_value).collect()
    }
}

pub fn encode_request(args: &[Value]) -> Result<String, WireError> {
    Ok(serde_json::to_string(&RemoteRequest::new(args))?)
}

pub fn decode_request(body: &str) -> Result<Vec<Value>, WireError> {
    let request: RemoteRequest = serde_json::from_str(body)?;
    Ok(request.values())
}

pub fn encode_response(result: &Value) -> Result<String, WireError> {
    Ok(serde_json::to_string(&value_to_json(result))?)
}

/// Read a response body, applying type inference to text.
pub fn decode_response(body: &str) -> Result<Value, WireError> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    Ok(response_value(&json))
}

/// Interpret an already-parsed response.
pub fn response_value(json: &serde_json::Value) -> Value {
    json_to_value(json).inferred()
}
