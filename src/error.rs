//! Error types for the bridge
//!
//! `BridgeError` covers everything that can go wrong while fulfilling a
//! request; `RpcErrorKind` is the only place JSON-RPC error codes live.

use thiserror::Error;

use crate::mcp::protocol::JsonRpcError;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{service} API error: {status}")]
    Api { service: &'static str, status: u16 },

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// JSON-RPC error kinds. There is no parse error: lines that are not JSON
/// carry no id to answer, so they are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// Valid JSON with an `id` that is not a well-formed request
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Generic server error, used for every failed handler or tool call
    ServerError,
}

impl RpcErrorKind {
    /// Wire-level numeric code
    pub fn code(self) -> i32 {
        match self {
            RpcErrorKind::InvalidRequest => -32600,
            RpcErrorKind::MethodNotFound => -32601,
            RpcErrorKind::InvalidParams => -32602,
            RpcErrorKind::InternalError => -32603,
            RpcErrorKind::ServerError => -32000,
        }
    }
}

/// A failed request, ready to be put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            RpcErrorKind::MethodNotFound,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::InvalidParams, message)
    }
}

impl From<BridgeError> for RpcError {
    fn from(err: BridgeError) -> Self {
        Self::new(RpcErrorKind::ServerError, err.to_string())
    }
}

impl From<RpcError> for JsonRpcError {
    fn from(err: RpcError) -> Self {
        JsonRpcError {
            code: err.kind.code(),
            message: err.message,
            data: None,
        }
    }
}
