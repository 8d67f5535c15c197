//! Retrieval tools the model may call mid-response.
//!
//! Two tools are exposed under fixed names: `webSearch` (public web) and
//! `vectorDatabaseSearch` (the curated document index). Each backend is an
//! enum so the model layer needs no trait objects; `Fixed` variants serve
//! canned hits for offline runs and tests.

#[cfg(feature = "tool-vector-search")]
pub mod vector_search;
#[cfg(feature = "tool-web-search")]
pub mod web_search;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Secrets, ToolsConfig};

pub const WEB_SEARCH_TOOL: &str = "webSearch";
pub const VECTOR_SEARCH_TOOL: &str = "vectorDatabaseSearch";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
    #[error("tool not configured: {0}")]
    NotConfigured(String),
    #[error("tool request failed: {0}")]
    Request(String),
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Name, description and JSON-schema parameters advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    fn query_tool(name: &str, description: &str, query_description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": query_description }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    pub fn web_search() -> Self {
        Self::query_tool(
            WEB_SEARCH_TOOL,
            "Search the public web for up-to-date information.",
            "Search query, including the college name, parameter and year where relevant.",
        )
    }

    pub fn vector_search() -> Self {
        Self::query_tool(
            VECTOR_SEARCH_TOOL,
            "Search the curated document index (placement reports, brochures) for relevant passages.",
            "Natural-language query to match against indexed documents.",
        )
    }
}

// ── Backends ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WebSearch {
    Disabled,
    #[cfg(feature = "tool-web-search")]
    Exa(web_search::ExaSearch),
    Fixed(Vec<SearchHit>),
}

impl WebSearch {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WebSearch::Disabled)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        match self {
            WebSearch::Disabled => Err(ToolError::NotConfigured(WEB_SEARCH_TOOL.into())),
            #[cfg(feature = "tool-web-search")]
            WebSearch::Exa(client) => client.search(query).await,
            WebSearch::Fixed(hits) => Ok(hits.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum VectorSearch {
    Disabled,
    #[cfg(feature = "tool-vector-search")]
    Pinecone(vector_search::PineconeSearch),
    Fixed(Vec<SearchHit>),
}

impl VectorSearch {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, VectorSearch::Disabled)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        match self {
            VectorSearch::Disabled => Err(ToolError::NotConfigured(VECTOR_SEARCH_TOOL.into())),
            #[cfg(feature = "tool-vector-search")]
            VectorSearch::Pinecone(client) => client.search(query).await,
            VectorSearch::Fixed(hits) => Ok(hits.clone()),
        }
    }
}

// ── Tool set ──────────────────────────────────────────────────────────────────

/// The tools available to one deployment. Immutable after startup.
#[derive(Debug, Clone)]
pub struct ToolSet {
    web: WebSearch,
    vector: VectorSearch,
}

impl ToolSet {
    pub fn new(web: WebSearch, vector: VectorSearch) -> Self {
        Self { web, vector }
    }

    /// No tools at all; the model answers from the prompt alone.
    pub fn disabled() -> Self {
        Self::new(WebSearch::Disabled, VectorSearch::Disabled)
    }

    /// Build the configured backends. API keys come from `secrets`.
    pub fn build(config: &ToolsConfig, secrets: &Secrets) -> Result<Self, ToolError> {
        let web = match config.web_search.provider.as_str() {
            "none" | "disabled" => WebSearch::Disabled,
            #[cfg(feature = "tool-web-search")]
            "exa" => {
                let key = secrets
                    .web_search_api_key
                    .clone()
                    .ok_or_else(|| ToolError::NotConfigured("WEB_SEARCH_API_KEY is not set".into()))?;
                WebSearch::Exa(web_search::ExaSearch::new(&config.web_search, key)?)
            }
            other => {
                return Err(ToolError::NotConfigured(format!("unknown web search provider: {other}")));
            }
        };

        let vector = match config.vector_search.provider.as_str() {
            "none" | "disabled" => VectorSearch::Disabled,
            #[cfg(feature = "tool-vector-search")]
            "pinecone" => {
                let key = secrets.vector_search_api_key.clone().ok_or_else(|| {
                    ToolError::NotConfigured("VECTOR_SEARCH_API_KEY is not set".into())
                })?;
                VectorSearch::Pinecone(vector_search::PineconeSearch::new(&config.vector_search, key)?)
            }
            other => {
                return Err(ToolError::NotConfigured(format!(
                    "unknown vector search provider: {other}"
                )));
            }
        };

        let set = Self::new(web, vector);
        info!(tools = ?set.enabled_names(), "tools ready");
        Ok(set)
    }

    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.web.is_enabled() {
            names.push(WEB_SEARCH_TOOL);
        }
        if self.vector.is_enabled() {
            names.push(VECTOR_SEARCH_TOOL);
        }
        names
    }

    /// Schemas for the enabled tools, in a stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = Vec::new();
        if self.web.is_enabled() {
            defs.push(ToolDefinition::web_search());
        }
        if self.vector.is_enabled() {
            defs.push(ToolDefinition::vector_search());
        }
        defs
    }

    /// Run one tool call. The output is the JSON array of hits handed back to the model.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<Value, ToolError> {
        let query = query_from(input)?;
        let hits = match name {
            WEB_SEARCH_TOOL => self.web.search(query).await?,
            VECTOR_SEARCH_TOOL => self.vector.search(query).await?,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        debug!(tool = name, query, hits = hits.len(), "tool call complete");
        serde_json::to_value(hits).map_err(|e| ToolError::Request(e.to_string()))
    }
}

fn query_from(input: &Value) -> Result<&str, ToolError> {
    input
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("expected {{\"query\": <text>}}, got {input}")))
}

#[cfg(feature = "tool-web-search")]
/// Cut `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            title: title.into(),
            url: format!("https://example.org/{title}"),
            snippet: "snippet".into(),
            score: Some(0.5),
        }
    }

    #[test]
    fn definitions_only_list_enabled_tools() {
        let set = ToolSet::new(WebSearch::Fixed(vec![]), VectorSearch::Disabled);
        let names: Vec<_> = set.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![WEB_SEARCH_TOOL]);
        assert!(ToolSet::disabled().definitions().is_empty());
    }

    #[tokio::test]
    async fn execute_routes_by_name() {
        let set = ToolSet::new(WebSearch::Fixed(vec![hit("web")]), VectorSearch::Fixed(vec![hit("doc")]));
        let web = set.execute(WEB_SEARCH_TOOL, &json!({"query": "iim"})).await.unwrap();
        let doc = set.execute(VECTOR_SEARCH_TOOL, &json!({"query": "iim"})).await.unwrap();
        assert_eq!(web[0]["title"], "web");
        assert_eq!(doc[0]["title"], "doc");
        assert_eq!(doc[0]["score"], 0.5);
    }

    #[tokio::test]
    async fn execute_rejects_bad_input() {
        let set = ToolSet::new(WebSearch::Fixed(vec![]), VectorSearch::Disabled);
        let err = set.execute(WEB_SEARCH_TOOL, &json!({"q": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        let err = set.execute(WEB_SEARCH_TOOL, &json!("{oops")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn disabled_and_unknown_tools_error() {
        let set = ToolSet::disabled();
        let err = set.execute(VECTOR_SEARCH_TOOL, &json!({"query": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
        let err = set.execute("knowledgeBaseSearch", &json!({"query": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[test]
    fn build_from_default_config_has_no_tools() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::test_default(dir.path());
        let set = ToolSet::build(&cfg.tools, &cfg.secrets).unwrap();
        assert!(set.enabled_names().is_empty());
    }

    #[cfg(feature = "tool-web-search")]
    #[test]
    fn build_requires_key_for_hosted_search() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = Config::test_default(dir.path());
        cfg.tools.web_search.provider = "exa".into();
        assert!(matches!(ToolSet::build(&cfg.tools, &cfg.secrets), Err(ToolError::NotConfigured(_))));
        cfg.secrets.web_search_api_key = Some("k".into());
        assert_eq!(ToolSet::build(&cfg.tools, &cfg.secrets).unwrap().enabled_names(), vec![WEB_SEARCH_TOOL]);
    }

    #[cfg(feature = "tool-web-search")]
    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("₹30 LPA", 3), "₹30");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
