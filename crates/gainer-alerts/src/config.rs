//! Environment configuration
//!
//! Values come from the process environment. A `.env` file in the working
//! directory is loaded first; variables already set in the environment win.
//!
//! # Required (run, deep research)
//! - FMP_API_KEY
//! - EMAIL_SENDER, EMAIL_PASSWORD, EMAIL_RECIPIENT
//!
//! # Optional
//! - SMTP_SERVER (default smtp.gmail.com), SMTP_PORT (default 587)
//! - GAIN_THRESHOLD (default 10), MIN_MARKET_CAP
//! - PERPLEXITY_API_KEY (required for deep research)
//! - GITHUB_TOKEN, GITHUB_REPOSITORY, RESEARCH_WORKFLOW, RESEARCH_WORKFLOW_REF

use tracing::debug;

use crate::error::{AlertError, Result};
use crate::DEFAULT_GAIN_THRESHOLD;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_REPOSITORY: &str = "Shredderman555/daily_top_gainers";
pub const DEFAULT_WORKFLOW: &str = "deep-research.yml";
pub const DEFAULT_WORKFLOW_REF: &str = "main";

/// Load `.env` into the process environment. Missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => debug!("Ignoring unreadable .env: {}", e),
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_optional<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match non_empty(lookup, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AlertError::Config(format!("Invalid {} value: '{}'", key, raw))),
    }
}

/// SMTP relay settings and sender credentials
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Sender address, also the SMTP username
    pub sender: String,
    /// App password
    pub password: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Settings for `run` and `deep-research`, loaded once at startup
#[derive(Clone)]
pub struct RunConfig {
    pub fmp_api_key: String,
    pub smtp: SmtpConfig,
    pub recipient: String,
    pub gain_threshold: f64,
    /// Drop gainers below this market cap (USD). Disabled when None.
    pub min_market_cap: Option<f64>,
    pub perplexity_api_key: Option<String>,
}

impl RunConfig {
    /// Load `.env`, then read the process environment
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Every missing required
    /// variable is reported at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = ["FMP_API_KEY", "EMAIL_SENDER", "EMAIL_PASSWORD", "EMAIL_RECIPIENT"];
        let missing: Vec<&str> =
            required.iter().copied().filter(|key| non_empty(&lookup, key).is_none()).collect();
        if !missing.is_empty() {
            return Err(AlertError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let gain_threshold =
            parse_optional::<f64>(&lookup, "GAIN_THRESHOLD")?.unwrap_or(DEFAULT_GAIN_THRESHOLD);
        if !gain_threshold.is_finite() {
            return Err(AlertError::Config(format!("Invalid GAIN_THRESHOLD value: {}", gain_threshold)));
        }

        let smtp = SmtpConfig {
            host: non_empty(&lookup, "SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            port: parse_optional::<u16>(&lookup, "SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT),
            sender: non_empty(&lookup, "EMAIL_SENDER").unwrap_or_default(),
            password: non_empty(&lookup, "EMAIL_PASSWORD").unwrap_or_default(),
        };

        Ok(Self {
            fmp_api_key: non_empty(&lookup, "FMP_API_KEY").unwrap_or_default(),
            smtp,
            recipient: non_empty(&lookup, "EMAIL_RECIPIENT").unwrap_or_default(),
            gain_threshold,
            min_market_cap: parse_optional::<f64>(&lookup, "MIN_MARKET_CAP")?,
            perplexity_api_key: non_empty(&lookup, "PERPLEXITY_API_KEY"),
        })
    }

    /// Perplexity key, required only by the deep research path
    pub fn perplexity_key(&self) -> Result<&str> {
        self.perplexity_api_key
            .as_deref()
            .ok_or_else(|| AlertError::Config("Missing required environment variables: PERPLEXITY_API_KEY".into()))
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("fmp_api_key", &redact_prefix(&self.fmp_api_key))
            .field("smtp", &self.smtp)
            .field("recipient", &self.recipient)
            .field("gain_threshold", &self.gain_threshold)
            .field("min_market_cap", &self.min_market_cap)
            .field("perplexity_configured", &self.perplexity_api_key.is_some())
            .finish()
    }
}

/// Settings for `trigger-research`
#[derive(Clone)]
pub struct TriggerConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    pub git_ref: String,
}

impl TriggerConfig {
    /// Load `.env`, then read the process environment. An explicit token
    /// (from `--token`) takes precedence over GITHUB_TOKEN.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        load_dotenv();
        Self::from_lookup(token, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(token: Option<String>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| non_empty(&lookup, "GITHUB_TOKEN"))
            .ok_or_else(|| {
                AlertError::Config("GitHub token required. Set GITHUB_TOKEN or pass --token".into())
            })?;

        let repository =
            non_empty(&lookup, "GITHUB_REPOSITORY").unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
        let (owner, repo) = match repository.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                (owner.to_string(), repo.to_string())
            }
            _ => {
                return Err(AlertError::Config(format!(
                    "Invalid GITHUB_REPOSITORY value: '{}' (expected owner/repo)",
                    repository
                )))
            }
        };

        Ok(Self {
            token,
            owner,
            repo,
            workflow: non_empty(&lookup, "RESEARCH_WORKFLOW").unwrap_or_else(|| DEFAULT_WORKFLOW.to_string()),
            git_ref: non_empty(&lookup, "RESEARCH_WORKFLOW_REF")
                .unwrap_or_else(|| DEFAULT_WORKFLOW_REF.to_string()),
        })
    }

    /// Browser URL of the repository's Actions page
    pub fn actions_url(&self) -> String {
        format!("https://github.com/{}/{}/actions", self.owner, self.repo)
    }
}

impl std::fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("workflow", &self.workflow)
            .field("git_ref", &self.git_ref)
            .finish()
    }
}

fn redact_prefix(secret: &str) -> String {
    format!("{}...", secret.chars().take(4).collect::<String>())
}
