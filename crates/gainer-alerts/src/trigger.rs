//! Remote research trigger via GitHub Actions
//!
//! Base URL: https://api.github.com
//!
//! # Endpoints
//! - POST /repos/{owner}/{repo}/actions/workflows/{workflow_id}/dispatches
//!
//! GitHub answers 204 No Content on success; the workflow itself runs
//! asynchronously and is outside this process's control.
//!
//! # Source
//! - https://docs.github.com/en/rest/actions/workflows#create-a-workflow-dispatch-event

use reqwest::Client;
use tracing::{debug, info};

use crate::config::TriggerConfig;
use crate::error::{AlertError, Result};
use crate::types::WorkflowDispatch;
use crate::GITHUB_API_BASE;

/// GitHub workflow dispatch client
#[derive(Clone)]
pub struct WorkflowTrigger {
    client: Client,
    base_url: String,
    config: TriggerConfig,
}

impl WorkflowTrigger {
    pub fn new(config: TriggerConfig) -> Result<Self> {
        Self::with_base_url(GITHUB_API_BASE, config)
    }

    pub fn with_base_url(base_url: &str, config: TriggerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("StockAlertsBot/1.0")
            .build()?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), config })
    }

    fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            self.base_url, self.config.owner, self.config.repo, self.config.workflow
        )
    }

    /// Start the research workflow for one symbol
    pub async fn trigger_research(&self, symbol: &str, company_name: Option<&str>) -> Result<()> {
        let url = self.dispatch_url();
        let payload = WorkflowDispatch::research(&self.config.git_ref, symbol, company_name);
        debug!("POST {}", url);
        info!("Triggering deep research for {}...", symbol);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::from_status(&url, status, body));
        }

        info!("Deep research workflow triggered (HTTP {})", status.as_u16());
        info!("Check progress at: {}", self.config.actions_url());
        Ok(())
    }
}
