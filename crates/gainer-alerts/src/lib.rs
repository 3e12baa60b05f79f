//! Daily Stock Gainer Alerts
//!
//! Pipeline:
//! - `market`: Financial Modeling Prep client (daily gainers, company profiles)
//! - `filter`: threshold + market-cap filters, stable descending sort
//! - `report`: HTML email rendering (gainer table, deep research report)
//! - `email`: SMTP delivery
//! - `research`: Perplexity deep research client
//! - `trigger`: GitHub Actions workflow dispatch for remote research runs
//!
//! # Official Documentation
//! - FMP Market Gainers: https://site.financialmodelingprep.com/developer/docs#market-biggest-gainers
//! - FMP Company Profile: https://site.financialmodelingprep.com/developer/docs#company-profile
//! - Perplexity Chat Completions: https://docs.perplexity.ai/api-reference/chat-completions
//! - GitHub Workflow Dispatch: https://docs.github.com/en/rest/actions/workflows#create-a-workflow-dispatch-event

pub mod config;
pub mod email;
pub mod error;
pub mod filter;
pub mod market;
pub mod pipeline;
pub mod report;
pub mod research;
pub mod trigger;
pub mod types;

pub use error::{AlertError, Result};
pub use types::*;

/// Financial Modeling Prep REST API base URL
pub const FMP_API_BASE: &str = "https://financialmodelingprep.com/api/v3";

/// Perplexity API base URL
pub const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Minimum daily gain (percent) for a stock to be reported
pub const DEFAULT_GAIN_THRESHOLD: f64 = 10.0;
