//! Pinecone-style integrated-embedding search client.
//!
//! Queries `POST {index_host}/records/namespaces/{namespace}/search` with the
//! raw query text; the index embeds it server-side.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::VectorSearchConfig;

use super::{SearchHit, ToolError};

const API_VERSION: &str = "2025-04";

#[derive(Debug, Clone)]
pub struct PineconeSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    top_k: usize,
}

impl PineconeSearch {
    pub fn new(config: &VectorSearchConfig, api_key: String) -> Result<Self, ToolError> {
        if config.index_host.trim().is_empty() {
            return Err(ToolError::NotConfigured("tools.vector_search.index_host is empty".into()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ToolError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: search_endpoint(&config.index_host, &config.namespace),
            api_key,
            top_k: config.top_k,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let body = SearchRequest { query: Query { inputs: Inputs { text: query }, top_k: self.top_k } };
        debug!(query, top_k = self.top_k, "vector search request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, body = %text, "vector search returned HTTP error");
            return Err(ToolError::Request(format!("HTTP {status}: {text}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Request(format!("failed to parse response body: {e}")))?;
        Ok(parsed.result.hits.into_iter().map(Hit::into_search_hit).collect())
    }
}

fn search_endpoint(host: &str, namespace: &str) -> String {
    let host = host.trim_end_matches('/');
    let host = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    format!("{host}/records/namespaces/{namespace}/search")
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: Query<'a>,
}

#[derive(Debug, Serialize)]
struct Query<'a> {
    inputs: Inputs<'a>,
    top_k: usize,
}

#[derive(Debug, Serialize)]
struct Inputs<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Hit {
    fn field(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|n| self.fields.get(*n).and_then(Value::as_str))
            .map(str::to_string)
    }

    fn into_search_hit(self) -> SearchHit {
        SearchHit {
            title: self.field(&["title", "source", "file_name"]).unwrap_or_else(|| self.id.clone()),
            url: self.field(&["url", "source_url"]).unwrap_or_default(),
            snippet: self.field(&["chunk_text", "text", "content"]).unwrap_or_default(),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_adds_scheme_and_namespace() {
        assert_eq!(
            search_endpoint("my-ai-abc.svc.pinecone.io/", "__default__"),
            "https://my-ai-abc.svc.pinecone.io/records/namespaces/__default__/search"
        );
        assert_eq!(
            search_endpoint("http://localhost:5080", "docs"),
            "http://localhost:5080/records/namespaces/docs/search"
        );
    }

    #[test]
    fn request_shape() {
        let body = SearchRequest { query: Query { inputs: Inputs { text: "fees" }, top_k: 40 } };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["query"]["inputs"]["text"], "fees");
        assert_eq!(v["query"]["top_k"], 40);
    }

    #[test]
    fn hits_map_known_fields() {
        let raw = r#"{"result":{"hits":[
            {"_id":"doc-1#3","_score":0.82,"fields":{"chunk_text":"Batch size 400","source":"iima-report.pdf"}},
            {"_id":"doc-2","fields":{}}
        ]}}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let hits: Vec<_> = parsed.result.hits.into_iter().map(Hit::into_search_hit).collect();
        assert_eq!(hits[0].title, "iima-report.pdf");
        assert_eq!(hits[0].snippet, "Batch size 400");
        assert_eq!(hits[0].score, Some(0.82));
        assert_eq!(hits[1].title, "doc-2");
        assert!(hits[1].url.is_empty());
    }

    #[test]
    fn empty_index_host_rejected() {
        let config = VectorSearchConfig {
            provider: "pinecone".into(),
            index_host: " ".into(),
            namespace: "__default__".into(),
            top_k: 5,
            timeout_seconds: 1,
        };
        assert!(matches!(PineconeSearch::new(&config, "k".into()), Err(ToolError::NotConfigured(_))));
    }
}
