//! Stock Gainer Alerts CLI
//!
//! Commands:
//! - `run`: Email today's gainers above the threshold
//! - `deep-research`: Generate and email a deep research report for one stock
//! - `trigger-research`: Start the deep research workflow on GitHub Actions
//!
//! # Usage
//! ```bash
//! # Daily alert (FMP_API_KEY, EMAIL_SENDER, EMAIL_PASSWORD, EMAIL_RECIPIENT)
//! gainer_alerts run
//!
//! # Preview without sending
//! gainer_alerts run --dry-run
//!
//! # Deep research (also needs PERPLEXITY_API_KEY)
//! gainer_alerts deep-research AAPL --name "Apple Inc."
//!
//! # Remote research run (GITHUB_TOKEN or --token)
//! gainer_alerts trigger-research AAPL
//! ```

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use gainer_alerts::config::{RunConfig, TriggerConfig};
use gainer_alerts::email::SmtpMailer;
use gainer_alerts::market::FmpClient;
use gainer_alerts::pipeline::{run_alerts, run_deep_research, ResearchRequest, RunOptions};
use gainer_alerts::research::PerplexityClient;
use gainer_alerts::trigger::WorkflowTrigger;
use gainer_alerts::EmailContent;

#[derive(Parser)]
#[command(name = "gainer_alerts")]
#[command(about = "Daily email alerts for stocks with large gains")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also append logs to this file (empty to disable)
    #[arg(long, default_value = "stock_alerts.log", global = true)]
    log_file: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch today's gainers and email those above the threshold
    Run {
        /// Send immediately (manual run outside the schedule)
        #[arg(long)]
        test: bool,

        /// Print the email instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a deep research report for one stock and email it
    #[command(alias = "deep_research")]
    DeepResearch {
        /// Stock symbol (e.g. AAPL, MSFT)
        symbol: String,

        /// Company name (skips the profile lookup)
        #[arg(long)]
        name: Option<String>,

        /// Print the report instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Trigger the deep research workflow on GitHub Actions
    #[command(alias = "trigger_research")]
    TriggerResearch {
        /// Stock symbol (e.g. AAPL, MSFT)
        symbol: String,

        /// Company name passed to the workflow
        #[arg(long)]
        name: Option<String>,

        /// GitHub token (defaults to GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level, &cli.log_file);

    let result = match cli.command {
        Commands::Run { test, dry_run } => run_daily(test, dry_run).await,
        Commands::DeepResearch { symbol, name, dry_run } => run_research(symbol, name, dry_run).await,
        Commands::TriggerResearch { symbol, name, token } => run_trigger(symbol, name, token).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Stdout plus an optional append-mode log file
fn init_logging(level: &str, log_file: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file, open_error) = if log_file.is_empty() {
        (None, None)
    } else {
        match OpenOptions::new().create(true).append(true).open(log_file) {
            Ok(f) => (Some(f), None),
            Err(e) => (None, Some(e)),
        }
    };
    let file_layer =
        file.map(|f| fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(f)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        warn!("Could not open log file {}: {}", log_file, e);
    }
}

fn print_preview(email: &EmailContent) {
    println!("Subject: {}", email.subject);
    println!();
    println!("{}", email.html);
}

async fn run_daily(test: bool, dry_run: bool) -> Result<()> {
    info!("=== Stock Alerts Started ===");
    info!("Run time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let config = RunConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let market = FmpClient::new(&config.fmp_api_key)?;
    let mailer = SmtpMailer::new(config.smtp.clone());
    let options = RunOptions { test, dry_run, generated_at: Local::now().naive_local() };

    let run = run_alerts(&config, &market, &mailer, &options).await.context("Stock alert run failed")?;

    if dry_run {
        print_preview(&run.email);
    } else {
        info!("Email sent successfully!");
    }

    info!("=== Stock Alerts Completed Successfully ===");
    Ok(())
}

async fn run_research(symbol: String, name: Option<String>, dry_run: bool) -> Result<()> {
    info!("=== Deep Research ===");

    let config = RunConfig::from_env().context("Failed to load configuration")?;
    let market = FmpClient::new(&config.fmp_api_key)?;
    let research = PerplexityClient::new(config.perplexity_key()?)?;
    let mailer = SmtpMailer::new(config.smtp.clone());

    let request = ResearchRequest {
        symbol,
        company_name: name,
        dry_run,
        generated_at: Local::now().naive_local(),
    };

    let run = run_deep_research(&config, &market, &research, &mailer, &request)
        .await
        .context("Deep research failed")?;

    if dry_run {
        print_preview(&run.email);
    } else {
        info!("Research report sent successfully!");
    }

    Ok(())
}

async fn run_trigger(symbol: String, name: Option<String>, token: Option<String>) -> Result<()> {
    let config = TriggerConfig::from_env(token).context("Failed to load configuration")?;
    info!("Workflow: {}/{} {} @ {}", config.owner, config.repo, config.workflow, config.git_ref);

    let symbol = symbol.trim().to_uppercase();
    anyhow::ensure!(!symbol.is_empty(), "Stock symbol must not be empty");

    let trigger = WorkflowTrigger::new(config)?;
    trigger
        .trigger_research(&symbol, name.as_deref())
        .await
        .context("Failed to trigger workflow")?;

    Ok(())
}
