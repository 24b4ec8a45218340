use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::RpcError;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// MCP Tool definition
#[derive(Debug, Serialize)]
pub(crate) struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// `tools/call` parameters
#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    json!({})
}

/// Supported protocol methods
#[derive(Debug)]
pub(crate) enum Method {
    Initialize,
    /// Client acknowledgement of `initialize`
    Initialized,
    Ping,
    ToolsList,
    ToolsCall(ToolCallParams),
    Shutdown,
    /// Any other `notifications/*` message; accepted and ignored
    Notification,
}

impl Method {
    /// Resolve a method name and decode its parameters
    pub fn parse(method: &str, params: Value) -> Result<Self, RpcError> {
        match method {
            "initialize" => Ok(Method::Initialize),
            "initialized" | "notifications/initialized" => Ok(Method::Initialized),
            "ping" => Ok(Method::Ping),
            "tools/list" => Ok(Method::ToolsList),
            "tools/call" => serde_json::from_value(params)
                .map(Method::ToolsCall)
                .map_err(|e| RpcError::invalid_params(format!("Invalid tools/call params: {}", e))),
            "shutdown" => Ok(Method::Shutdown),
            _ if method.starts_with("notifications/") => Ok(Method::Notification),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    /// Whether the method is a one-way message
    pub fn is_notification(&self) -> bool {
        matches!(self, Method::Initialized | Method::Notification)
    }
}
