// RPC types for JSON-RPC 2.0 protocol
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::AccountError;

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const VALIDATION_FAILED: i32 = -32001;
pub const ACCOUNT_CONFLICT: i32 = -32002;
pub const AUTHENTICATION_FAILED: i32 = -32003;
pub const ACCOUNT_NOT_FOUND: i32 = -32004;

#[derive(Deserialize, Debug)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&AccountError> for RpcError {
    fn from(err: &AccountError) -> Self {
        let code = match err {
            AccountError::Validation(_) => VALIDATION_FAILED,
            AccountError::Conflict => ACCOUNT_CONFLICT,
            AccountError::Authentication => AUTHENTICATION_FAILED,
            AccountError::NotFound => ACCOUNT_NOT_FOUND,
            AccountError::Internal(_) => INTERNAL_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
            data: Some(serde_json::json!({ "kind": err.kind() })),
        }
    }
}

// Method-specific parameter types
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountParams {
    pub account_id: AccountId,
    #[serde(default = "empty_changes")]
    pub changes: serde_json::Value,
}

fn empty_changes() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}
