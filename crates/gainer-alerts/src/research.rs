//! Perplexity research client
//!
//! Base URL: https://api.perplexity.ai
//!
//! # Endpoints
//! - POST /chat/completions - Single-turn completion, bearer token auth
//!
//! Deep research runs for minutes, so this client uses a long timeout.

use reqwest::Client;
use tracing::{debug, info};

use crate::error::{AlertError, Result};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::PERPLEXITY_API_BASE;

/// Long-form research model
pub const DEEP_RESEARCH_MODEL: &str = "sonar-deep-research";

/// Perplexity REST client
#[derive(Clone)]
pub struct PerplexityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PerplexityClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(PERPLEXITY_API_BASE, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(std::time::Duration::from_secs(600)).build()?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string() })
    }

    /// Completions endpoint, as named in errors
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// POST /chat/completions - Returns the first choice's content
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        debug!("POST {} (model={})", url, model);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
        };

        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::from_status(&url, status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AlertError::Parse { url: url.clone(), message: e.to_string() })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AlertError::Parse { url, message: "response contained no content".into() })?;

        Ok(content)
    }

    /// Run the deep research model on a prompt
    pub async fn deep_research(&self, prompt: &str) -> Result<String> {
        info!("Requesting deep research ({} chars prompt)", prompt.len());
        let content = self.complete(DEEP_RESEARCH_MODEL, prompt).await?;
        info!("Deep research returned {} chars", content.len());
        Ok(content)
    }
}
