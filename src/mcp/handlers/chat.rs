use crate::error::Result;
use crate::mcp::helpers::render_json;
use crate::mcp::tools::ChatArgs;
use crate::ragflow::KnowledgeBackend;

/// Chat against a knowledge base, optionally continuing a conversation
pub(crate) async fn handle(backend: &dyn KnowledgeBackend, args: ChatArgs) -> Result<String> {
    let data = backend
        .chat(
            &args.message,
            args.kb_id.as_deref(),
            args.conversation_id.as_deref(),
        )
        .await?;
    render_json(&data)
}
