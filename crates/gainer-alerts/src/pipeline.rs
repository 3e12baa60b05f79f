//! End-to-end runs
//!
//! # Daily alert
//! 1. Fetch today's gainers (one GET)
//! 2. Filter by threshold, sort by gain descending
//! 3. Optional: enrich with market cap (one GET) and apply the floor
//! 4. Render the email
//! 5. Send, unless dry-run
//!
//! # Deep research
//! 1. Resolve the company name (skipped when given)
//! 2. Ask the research service for the report
//! 3. Split into sections (none left after dropping reasoning is an error)
//! 4. Render, send unless dry-run
//!
//! Any failure before the send step aborts the run; nothing is sent.

use chrono::NaiveDateTime;
use tracing::info;

use crate::config::RunConfig;
use crate::email::{Mailer, OutgoingEmail};
use crate::error::{AlertError, Result};
use crate::filter::{filter_by_market_cap, filter_gainers};
use crate::market::FmpClient;
use crate::report::{format_gainer_email, format_research_email, format_research_prompt};
use crate::research::PerplexityClient;
use crate::types::{EmailContent, GainerRecord, ResearchReport};

/// Number of gainers echoed to the log in a run summary
const SUMMARY_LIMIT: usize = 5;

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Manual run outside the schedule. Only changes logging.
    pub test: bool,
    /// Render without sending. Wins over `test`.
    pub dry_run: bool,
    /// Timestamp printed in the email footer
    pub generated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct ResearchRequest {
    pub symbol: String,
    /// Skips the profile lookup when set
    pub company_name: Option<String>,
    pub dry_run: bool,
    pub generated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct AlertRun {
    pub gainers: Vec<GainerRecord>,
    pub email: EmailContent,
    pub sent: bool,
}

#[derive(Clone, Debug)]
pub struct ResearchRun {
    pub report: ResearchReport,
    pub email: EmailContent,
    pub sent: bool,
}

fn log_summary(gainers: &[GainerRecord]) {
    if gainers.is_empty() {
        return;
    }
    info!("Top {} gainers after all filters:", SUMMARY_LIMIT.min(gainers.len()));
    for (i, g) in gainers.iter().take(SUMMARY_LIMIT).enumerate() {
        info!("  {}. {}: {:.2}%", i + 1, g.symbol, g.percent_gain);
    }
    if gainers.len() > SUMMARY_LIMIT {
        info!("  ... and {} more", gainers.len() - SUMMARY_LIMIT);
    }
}

fn deliver(config: &RunConfig, mailer: &dyn Mailer, content: &EmailContent, dry_run: bool) -> Result<bool> {
    if dry_run {
        info!("DRY RUN MODE - email not sent");
        info!("To: {}", config.recipient);
        info!("Subject: {}", content.subject);
        return Ok(false);
    }

    info!("Sending email to {}...", config.recipient);
    let email = OutgoingEmail::new(&config.smtp.sender, &config.recipient, content.clone());
    mailer.send(&email)?;
    Ok(true)
}

/// Daily gainer alert
pub async fn run_alerts(
    config: &RunConfig,
    market: &FmpClient,
    mailer: &dyn Mailer,
    options: &RunOptions,
) -> Result<AlertRun> {
    if options.test {
        info!("Test mode: sending immediately");
    }

    let all = market.get_daily_gainers().await?;
    let mut gainers = filter_gainers(&all, config.gain_threshold);
    info!("Total gainers: {}", all.len());
    info!("{}%+ gainers: {}", config.gain_threshold, gainers.len());

    if let Some(min_cap) = config.min_market_cap {
        if !gainers.is_empty() {
            info!("Applying market cap filter (${:.0} minimum)...", min_cap);
            let enriched = market.enrich_with_market_cap(gainers).await?;
            gainers = filter_by_market_cap(&enriched, min_cap);
        }
    }

    log_summary(&gainers);

    let email = format_gainer_email(&gainers, config.gain_threshold, options.generated_at);
    let sent = deliver(config, mailer, &email, options.dry_run)?;

    Ok(AlertRun { gainers, email, sent })
}

/// Deep research report for one symbol
pub async fn run_deep_research(
    config: &RunConfig,
    market: &FmpClient,
    research: &PerplexityClient,
    mailer: &dyn Mailer,
    request: &ResearchRequest,
) -> Result<ResearchRun> {
    let symbol = request.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AlertError::Config("Stock symbol must not be empty".into()));
    }
    info!("Generating deep research report for {}", symbol);

    let given_name = request.company_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let (company_name, todays_gain) = match given_name {
        Some(name) => (name.to_string(), None),
        None => {
            info!("Fetching company profile...");
            let profile = market
                .get_company_profile(&symbol)
                .await?
                .ok_or_else(|| AlertError::UnknownSymbol(symbol.clone()))?;
            info!("Found company: {}", profile.company_name);
            let gain = profile.todays_gain();
            (profile.company_name, gain)
        }
    };

    let prompt = format_research_prompt(&company_name, &symbol);
    let content = research.deep_research(&prompt).await?;
    let report = ResearchReport::from_text(&symbol, &company_name, &content);
    if report.sections.is_empty() {
        return Err(AlertError::Parse {
            url: research.endpoint(),
            message: "research response held only reasoning, no report".into(),
        });
    }
    info!("Research report generated with {} sections", report.sections.len());

    let email = format_research_email(&report, todays_gain, request.generated_at);
    let sent = deliver(config, mailer, &email, request.dry_run)?;

    Ok(ResearchRun { report, email, sent })
}
