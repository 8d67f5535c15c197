//! OpenAI moderation client (`POST /v1/moderations`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, trace};

use crate::config::OpenAiModerationConfig;

use super::{ModerationCategory, ModerationError, ModerationResult, pick_category};

#[derive(Debug, Clone)]
pub struct OpenAiModerator {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiModerator {
    pub fn new(config: &OpenAiModerationConfig, api_key: String) -> Result<Self, ModerationError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ModerationError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub async fn classify(&self, text: &str) -> Result<ModerationResult, ModerationError> {
        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&ModerationRequest { model: &self.model, input: text })
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "moderation request failed (transport)");
                ModerationError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "moderation request returned HTTP error");
            return Err(ModerationError::Request(format!("HTTP {status}: {body}")));
        }

        let parsed: ModerationResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::Request(format!("failed to parse response body: {e}")))?;
        trace!(?parsed, "moderation response");
        parsed.into_result()
    }
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationEntry>,
}

#[derive(Debug, Deserialize)]
struct ModerationEntry {
    flagged: bool,
    #[serde(default)]
    categories: HashMap<String, bool>,
}

impl ModerationResponse {
    fn into_result(self) -> Result<ModerationResult, ModerationError> {
        let entry = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ModerationError::Request("empty moderation results".into()))?;
        if !entry.flagged {
            return Ok(ModerationResult::clear());
        }
        let flagged: Vec<ModerationCategory> = entry
            .categories
            .iter()
            .filter(|(_, on)| **on)
            .filter_map(|(name, _)| ModerationCategory::from_api(name))
            .collect();
        Ok(ModerationResult::flagged(pick_category(&flagged)))
    }
}
