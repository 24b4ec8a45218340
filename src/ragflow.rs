//! RAGFlow HTTP client
//!
//! Every tool call becomes exactly one request against the RAGFlow API.
//! Calls are fire-once: no retries and no backoff.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{AuthScheme, Config};
use crate::error::{BridgeError, Result};

const SERVICE: &str = "RAGFlow";

const RETRIEVAL_PATH: &str = "/api/v1/retrieval";
const KB_LIST_PATH: &str = "/api/v1/kb/list";
const CHAT_PATH: &str = "/api/v1/conversation/chat";

/// The operations the MCP tools need from a retrieval/chat service
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    /// Search documents, optionally scoped to one knowledge base
    async fn search(&self, query: &str, kb_id: Option<&str>, limit: u64) -> Result<Value>;

    /// List all knowledge bases visible to the credential
    async fn list_knowledge_bases(&self) -> Result<Value>;

    /// Ask a question, optionally continuing a conversation
    async fn chat(
        &self,
        message: &str,
        kb_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<Value>;
}

/// RAGFlow API client
pub struct RagflowClient {
    base_url: String,
    api_key: String,
    auth: AuthScheme,
    client: reqwest::Client,
}

/// Retrieval request body
#[derive(Debug, Serialize)]
struct RetrievalRequest<'a> {
    question: &'a str,
    kb_ids: Vec<&'a str>,
    top_k: u64,
}

/// Conversation request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    kb_ids: Vec<&'a str>,
    conversation_id: Option<&'a str>,
}

/// An empty knowledge base id means "all of them"
fn kb_ids(kb_id: Option<&str>) -> Vec<&str> {
    kb_id.filter(|id| !id.is_empty()).into_iter().collect()
}

impl RagflowClient {
    /// Create a client from configuration. Fails if no API key is set.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.credential()?.to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: config.base_url().to_string(),
            api_key,
            auth: config.ragflow.auth,
            client: builder.build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            AuthScheme::Bearer => request.bearer_auth(&self.api_key),
            AuthScheme::ApiKeyHeader => request.header("api_key", &self.api_key),
        }
    }

    /// Send the request and normalize the outcome
    async fn execute(&self, path: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        debug!("{} {}", SERVICE, path);

        let response = match self.authorize(request).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("{} request to {} failed: {}", SERVICE, path, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {} for {}", SERVICE, status, path);
            return Err(BridgeError::Api {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl KnowledgeBackend for RagflowClient {
    async fn search(&self, query: &str, kb_id: Option<&str>, limit: u64) -> Result<Value> {
        let body = RetrievalRequest {
            question: query,
            kb_ids: kb_ids(kb_id),
            top_k: limit,
        };
        let request = self.client.post(self.url(RETRIEVAL_PATH)).json(&body);
        self.execute(RETRIEVAL_PATH, request).await
    }

    async fn list_knowledge_bases(&self) -> Result<Value> {
        let request = self.client.get(self.url(KB_LIST_PATH));
        self.execute(KB_LIST_PATH, request).await
    }

    async fn chat(
        &self,
        message: &str,
        kb_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<Value> {
        let body = ChatRequest {
            question: message,
            kb_ids: kb_ids(kb_id),
            conversation_id,
        };
        let request = self.client.post(self.url(CHAT_PATH)).json(&body);
        self.execute(CHAT_PATH, request).await
    }
}
