use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use super::protocol::{Tool, ToolCallParams};
use crate::error::{BridgeError, RpcError};

pub(crate) const SEARCH_DOCS: &str = "search_docs";
pub(crate) const LIST_KBS: &str = "list_kbs";
pub(crate) const CHAT: &str = "chat";

/// Return all MCP tool definitions, in a fixed order
pub(crate) fn tool_definitions(default_limit: u64) -> Vec<Tool> {
    vec![
        Tool {
            name: SEARCH_DOCS.to_string(),
            description: "Search documents in RAGFlow knowledge base".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "kb_id": {
                        "type": "string",
                        "description": "Knowledge base ID (optional)"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of results",
                        "default": default_limit
                    }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: LIST_KBS.to_string(),
            description: "List all available knowledge bases".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: CHAT.to_string(),
            description: "Chat with RAGFlow using knowledge base".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Your message"
                    },
                    "kb_id": {
                        "type": "string",
                        "description": "Knowledge base ID"
                    },
                    "conversation_id": {
                        "type": "string",
                        "description": "Conversation ID to continue (optional)"
                    }
                },
                "required": ["message"]
            }),
        },
    ]
}

/// `search_docs` arguments
#[derive(Debug, Deserialize, PartialEq)]
pub(crate) struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub kb_id: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub limit: Option<u64>,
}

/// Accept any non-negative integral JSON number, including `3.0`
fn whole_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(de::Error::custom(format!(
            "limit must be a non-negative whole number, got {}",
            number
        ))),
    }
}

/// `chat` arguments
#[derive(Debug, Deserialize, PartialEq)]
pub(crate) struct ChatArgs {
    pub message: String,
    #[serde(default)]
    pub kb_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// A resolved tool invocation
#[derive(Debug, PartialEq)]
pub(crate) enum ToolCall {
    SearchDocs(SearchArgs),
    ListKbs,
    Chat(ChatArgs),
}

impl ToolCall {
    /// Match the tool name and decode its arguments
    pub fn parse(params: ToolCallParams) -> Result<Self, RpcError> {
        match params.name.as_str() {
            SEARCH_DOCS => Ok(ToolCall::SearchDocs(decode_args(
                &params.name,
                params.arguments,
            )?)),
            LIST_KBS => Ok(ToolCall::ListKbs),
            CHAT => Ok(ToolCall::Chat(decode_args(&params.name, params.arguments)?)),
            _ => Err(BridgeError::UnknownTool(params.name).into()),
        }
    }
}

fn decode_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, RpcError> {
    serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("Invalid arguments for {}: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcErrorKind;

    fn params(name: &str, arguments: Value) -> ToolCallParams {
        ToolCallParams {
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_definitions_order_and_shape() {
        let tools = tool_definitions(5);
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_DOCS, LIST_KBS, CHAT]);

        let value = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(value["inputSchema"]["required"], json!(["query"]));
        assert_eq!(value["inputSchema"]["properties"]["limit"]["default"], 5);
        assert_eq!(value["inputSchema"]["properties"]["limit"]["type"], "number");
    }

    #[test]
    fn test_parse_search() {
        let call = ToolCall::parse(params(
            SEARCH_DOCS,
            json!({ "query": "refund policy", "limit": 3 }),
        ))
        .unwrap();
        assert_eq!(
            call,
            ToolCall::SearchDocs(SearchArgs {
                query: "refund policy".to_string(),
                kb_id: None,
                limit: Some(3),
            })
        );
    }

    fn search_limit(limit: Value) -> Result<Option<u64>, RpcError> {
        match ToolCall::parse(params(SEARCH_DOCS, json!({ "query": "q", "limit": limit })))? {
            ToolCall::SearchDocs(args) => Ok(args.limit),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_search_limit_accepts_whole_floats() {
        assert_eq!(search_limit(json!(3.0)).unwrap(), Some(3));
        assert_eq!(search_limit(json!(0)).unwrap(), Some(0));
        assert_eq!(search_limit(Value::Null).unwrap(), None);
    }

    #[test]
    fn test_search_limit_rejects_fractions_and_negatives() {
        for bad in [json!(2.5), json!(-1), json!(-2.0), json!("3")] {
            let err = search_limit(bad.clone()).unwrap_err();
            assert_eq!(err.kind, RpcErrorKind::InvalidParams, "limit {}", bad);
            assert!(err.message.contains("search_docs"));
        }
    }

    #[test]
    fn test_parse_list_ignores_arguments() {
        let call = ToolCall::parse(params(LIST_KBS, json!({ "extra": true }))).unwrap();
        assert_eq!(call, ToolCall::ListKbs);
    }

    #[test]
    fn test_parse_chat_missing_message() {
        let err = ToolCall::parse(params(CHAT, json!({ "kb_id": "kb" }))).unwrap_err();
        assert_eq!(err.kind, RpcErrorKind::InvalidParams);
        assert!(err.message.contains("chat"));
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse(params("delete_everything", json!({}))).unwrap_err();
        assert_eq!(err.kind, RpcErrorKind::ServerError);
        assert_eq!(err.message, "Unknown tool: delete_everything");
    }
}
