use crate::error::Result;
use crate::mcp::helpers::render_json;
use crate::ragflow::KnowledgeBackend;

/// List knowledge bases
pub(crate) async fn handle(backend: &dyn KnowledgeBackend) -> Result<String> {
    let data = backend.list_knowledge_bases().await?;
    render_json(&data)
}
