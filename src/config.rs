use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BridgeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ragflow: RagflowConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagflowConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth: AuthScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RagflowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            auth: AuthScheme::default(),
            timeout_secs: None,
        }
    }
}

/// How the credential is presented to RAGFlow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `api_key: <key>`
    ApiKeyHeader,
}

impl std::str::FromStr for AuthScheme {
    type Err = BridgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "api-key-header" | "api_key" | "api-key" => Ok(AuthScheme::ApiKeyHeader),
            other => Err(BridgeError::Config(format!("unknown auth scheme '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            default_limit: default_limit(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:9380".to_string()
}

fn default_server_name() -> String {
    "ragflow-mcp-bridge".to_string()
}

fn default_limit() -> u64 {
    5
}

impl Config {
    /// Load configuration from `path` (or ~/.ragflow-bridge/config.toml)
    /// and apply environment overrides. Missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `RAGFLOW_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("RAGFLOW_BASE_URL").or_else(|| non_empty("RAGFLOW_URL")) {
            self.ragflow.base_url = url;
        }
        if let Some(key) = non_empty("RAGFLOW_API_KEY") {
            self.ragflow.api_key = Some(key);
        }
        if let Some(scheme) = non_empty("RAGFLOW_AUTH_SCHEME") {
            self.ragflow.auth = scheme.parse()?;
        }
        Ok(())
    }

    /// The configured API key; there is no built-in fallback
    pub fn credential(&self) -> Result<&str, BridgeError> {
        self.ragflow
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::Config(
                    "no RAGFlow API key configured (set RAGFLOW_API_KEY or ragflow.api_key)"
                        .to_string(),
                )
            })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.ragflow.timeout_secs.map(Duration::from_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.ragflow.base_url.trim_end_matches('/')
    }

    /// Write the commented default config to `path` unless it exists.
    /// Returns false if a file was already there.
    #[allow(dead_code)] // CLI only
    pub fn init(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, include_str!("../default_config.toml"))
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(true)
    }

    /// Copy with the API key masked, for display
    #[allow(dead_code)] // CLI only
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = copy.ragflow.api_key.as_mut() {
            let visible: String = key.chars().take(4).collect();
            *key = format!("{}****", visible);
        }
        copy
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// Get the bridge data directory (~/.ragflow-bridge)
    pub fn data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".ragflow-bridge"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ragflow.base_url, "http://localhost:9380");
        assert!(config.ragflow.api_key.is_none());
        assert_eq!(config.ragflow.auth, AuthScheme::Bearer);
        assert_eq!(config.server.default_limit, 5);
        assert_eq!(config.server.name, "ragflow-mcp-bridge");
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let config = Config::default();
        let err = config.credential().unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[
                ("RAGFLOW_BASE_URL", "http://rag.internal:9380/"),
                ("RAGFLOW_API_KEY", "ragflow-secret"),
                ("RAGFLOW_AUTH_SCHEME", "api-key-header"),
            ]))
            .unwrap();

        assert_eq!(config.base_url(), "http://rag.internal:9380");
        assert_eq!(config.credential().unwrap(), "ragflow-secret");
        assert_eq!(config.ragflow.auth, AuthScheme::ApiKeyHeader);
    }

    #[test]
    fn test_url_alias_and_precedence() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[("RAGFLOW_URL", "http://alias:1")]))
            .unwrap();
        assert_eq!(config.base_url(), "http://alias:1");

        config
            .apply_env_overrides(env(&[
                ("RAGFLOW_URL", "http://alias:1"),
                ("RAGFLOW_BASE_URL", "http://primary:2"),
            ]))
            .unwrap();
        assert_eq!(config.base_url(), "http://primary:2");
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut config = Config::default();
        config
            .apply_env_overrides(env(&[("RAGFLOW_API_KEY", "  ")]))
            .unwrap();
        assert!(config.ragflow.api_key.is_none());
    }

    #[test]
    fn test_bad_auth_scheme() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(env(&[("RAGFLOW_AUTH_SCHEME", "basic")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[ragflow]
base_url = "http://kb.example:9380"
api_key = "from-file"
auth = "api-key-header"
timeout_secs = 30

[server]
default_limit = 8
"#,
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.base_url(), "http://kb.example:9380");
        assert_eq!(config.credential().unwrap(), "from-file");
        assert_eq!(config.ragflow.auth, AuthScheme::ApiKeyHeader);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.server.default_limit, 8);
        assert_eq!(config.server.name, "ragflow-mcp-bridge");
    }

    #[test]
    fn test_init_writes_parseable_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        assert!(Config::init(&path).unwrap());
        assert!(!Config::init(&path).unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert!(config.ragflow.api_key.is_none());
        assert_eq!(config.server.default_limit, 5);
    }

    #[test]
    fn test_redacted() {
        let mut config = Config::default();
        config.ragflow.api_key = Some("ragflow-abcdef".to_string());
        assert_eq!(
            config.redacted().ragflow.api_key.as_deref(),
            Some("ragf****")
        );
    }
}
