use tracing::debug;

use crate::error::Result;
use crate::mcp::helpers::render_json;
use crate::mcp::tools::SearchArgs;
use crate::ragflow::KnowledgeBackend;

/// Search documents
pub(crate) async fn handle(
    backend: &dyn KnowledgeBackend,
    args: SearchArgs,
    default_limit: u64,
) -> Result<String> {
    let limit = args.limit.unwrap_or(default_limit);
    debug!("search_docs limit={} kb={:?}", limit, args.kb_id);

    let data = backend
        .search(&args.query, args.kb_id.as_deref(), limit)
        .await?;
    render_json(&data)
}
