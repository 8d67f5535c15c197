//! Exa-style web search client (`POST /search`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WebSearchConfig;

use super::{SearchHit, ToolError, truncate_chars};

#[derive(Debug, Clone)]
pub struct ExaSearch {
    client: Client,
    api_base_url: String,
    api_key: String,
    num_results: usize,
    max_characters: usize,
}

impl ExaSearch {
    pub fn new(config: &WebSearchConfig, api_key: String) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ToolError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            api_key,
            num_results: config.num_results,
            max_characters: config.max_characters,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let body = SearchRequest {
            query,
            num_results: self.num_results,
            contents: Contents { text: TextOptions { max_characters: self.max_characters } },
        };
        debug!(query, num_results = self.num_results, "web search request");

        let response = self
            .client
            .post(&self.api_base_url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, body = %text, "web search returned HTTP error");
            return Err(ToolError::Request(format!("HTTP {status}: {text}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Request(format!("failed to parse response body: {e}")))?;
        Ok(parsed.into_hits(self.max_characters))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: Contents,
}

#[derive(Debug, Serialize)]
struct Contents {
    text: TextOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl SearchResponse {
    fn into_hits(self, max_characters: usize) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title.filter(|t| !t.is_empty()).unwrap_or_else(|| r.url.clone()),
                snippet: truncate_chars(r.text.as_deref().unwrap_or_default(), max_characters),
                url: r.url,
                score: r.score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let body = SearchRequest {
            query: "iim fees",
            num_results: 3,
            contents: Contents { text: TextOptions { max_characters: 100 } },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["numResults"], 3);
        assert_eq!(v["contents"]["text"]["maxCharacters"], 100);
    }

    #[test]
    fn response_maps_to_hits() {
        let raw = r#"{"results":[
            {"title":"IIM A placements","url":"https://iima.ac.in/p","text":"Median CTC 32 LPA","score":0.9},
            {"url":"https://example.org","text":null}
        ]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let hits = parsed.into_hits(6);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].snippet, "Median");
        assert_eq!(hits[0].score, Some(0.9));
        assert_eq!(hits[1].title, "https://example.org");
        assert_eq!(hits[1].snippet, "");
    }
}
