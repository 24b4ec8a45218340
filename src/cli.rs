use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::config::Config;
use crate::mcp::tools;
use crate::ragflow::KnowledgeBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, PartialEq, Tabled)]
pub struct ChunkRow {
    #[tabled(rename = "Document")]
    pub document: String,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "Content")]
    pub content: String,
}

#[derive(Debug, PartialEq, Tabled)]
pub struct KbRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Docs")]
    pub documents: String,
    #[tabled(rename = "Chunks")]
    pub chunks: String,
}

/// Search documents
pub async fn search(
    backend: &dyn KnowledgeBackend,
    query: &str,
    kb: Option<&str>,
    limit: u64,
    format: OutputFormat,
) -> Result<()> {
    let data = backend.search(query, kb, limit).await?;

    match (format, search_rows(&data)) {
        (OutputFormat::Table, Some(rows)) if !rows.is_empty() => {
            println!("{}", format!("🔍 {} result(s) for \"{}\"", rows.len(), query).bold());
            println!();
            println!("{}", Table::new(rows));
        }
        (OutputFormat::Table, Some(_)) => println!("No matching documents."),
        _ => print_json(&data)?,
    }
    Ok(())
}

/// List knowledge bases
pub async fn list_kbs(backend: &dyn KnowledgeBackend, format: OutputFormat) -> Result<()> {
    let data = backend.list_knowledge_bases().await?;

    match (format, kb_rows(&data)) {
        (OutputFormat::Table, Some(rows)) if !rows.is_empty() => {
            println!("{}", "📚 Knowledge bases".bold());
            println!();
            println!("{}", Table::new(rows));
        }
        (OutputFormat::Table, Some(_)) => println!("No knowledge bases found."),
        _ => print_json(&data)?,
    }
    Ok(())
}

/// Ask a question
pub async fn chat(
    backend: &dyn KnowledgeBackend,
    message: &str,
    kb: Option<&str>,
    conversation: Option<&str>,
) -> Result<()> {
    let data = backend.chat(message, kb, conversation).await?;

    match chat_answer(&data) {
        Some(answer) => {
            println!("{}", answer);
            if let Some(id) = data["data"]["conversation_id"].as_str() {
                println!();
                println!("{} {}", "Conversation:".dimmed(), id.dimmed());
            }
        }
        None => print_json(&data)?,
    }
    Ok(())
}

/// Print the MCP tool definitions
pub fn print_tools(config: &Config) -> Result<()> {
    let definitions = tools::tool_definitions(config.server.default_limit);
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

/// Show the effective configuration with the key masked
pub fn show_config(config: &Config, path: &Path) -> Result<()> {
    println!("{} {}", "# Config file:".dimmed(), path.display());
    if config.ragflow.api_key.is_none() {
        println!("{}", "# No API key configured".yellow());
    }
    println!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Write the default config file
pub fn init(path: &Path) -> Result<()> {
    if Config::init(path)? {
        println!("✓ Created {}", path.display());
        println!("\nNext steps:");
        println!("  Set api_key in the config, or export RAGFLOW_API_KEY");
        println!("  ragflow-bridge kbs");
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Retrieval chunks as table rows, if the body has the expected shape
pub fn search_rows(data: &Value) -> Option<Vec<ChunkRow>> {
    let chunks = data["data"]["chunks"].as_array()?;
    Some(
        chunks
            .iter()
            .map(|chunk| ChunkRow {
                document: text_field(chunk, &["document_keyword", "docnm_kwd", "document_id"]),
                score: chunk["similarity"]
                    .as_f64()
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "-".to_string()),
                content: truncate(&text_field(chunk, &["content", "content_with_weight"]), 80),
            })
            .collect(),
    )
}

/// Knowledge bases as table rows; accepts `data: [...]` or `data: {kbs: [...]}`
pub fn kb_rows(data: &Value) -> Option<Vec<KbRow>> {
    let kbs = data["data"]
        .as_array()
        .or_else(|| data["data"]["kbs"].as_array())?;
    Some(
        kbs.iter()
            .map(|kb| KbRow {
                id: text_field(kb, &["id"]),
                name: text_field(kb, &["name"]),
                documents: count_field(kb, &["doc_num", "document_count"]),
                chunks: count_field(kb, &["chunk_num", "chunk_count"]),
            })
            .collect(),
    )
}

/// The answer text of a chat response
pub fn chat_answer(data: &Value) -> Option<&str> {
    data["data"]["answer"]
        .as_str()
        .or_else(|| data["answer"].as_str())
}

fn text_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| value[*k].as_str())
        .unwrap_or("")
        .to_string()
}

fn count_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| value[*k].as_u64())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars - 3).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
