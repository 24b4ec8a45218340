use serde_json::{Value, json};

use crate::error::Result;

/// Render a remote response body as tool output text
pub(crate) fn render_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Wrap tool output in the MCP `tools/call` result shape
pub(crate) fn text_content(text: String) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }]
    })
}
