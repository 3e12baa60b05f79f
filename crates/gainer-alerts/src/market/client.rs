//! FMP REST client
//!
//! Base URL: https://financialmodelingprep.com/api/v3
//!
//! # Endpoints
//! - GET /stock_market/gainers - Today's biggest gainers
//! - GET /profile/{symbol} - Company profile (comma-separated symbols allowed)
//!
//! Authentication is the `apikey` query parameter. It never appears in logs
//! or error messages.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AlertError, Result};
use crate::types::{CompanyProfile, FmpGainer, FmpProfile, GainerRecord};
use crate::FMP_API_BASE;

/// FMP REST client
#[derive(Clone)]
pub struct FmpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    /// Create a new FMP client with default base URL
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(FMP_API_BASE, api_key)
    }

    /// Create a new FMP client with custom base URL
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("StockAlertsBot/1.0")
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| AlertError::Config(format!("Invalid FMP base URL '{}': {}", base_url, e)))?;

        Ok(Self { client, base_url, api_key: api_key.to_string() })
    }

    /// GET {base}/{segments...}, returning the parsed JSON body.
    /// Each segment is percent-encoded, so a symbol cannot add path or query parts.
    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AlertError::Config(format!("Invalid FMP base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AlertError::Config(format!("FMP base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        let display_url = url.to_string();
        url.query_pairs_mut().append_pair("apikey", &self.api_key);
        debug!("GET {}", display_url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::from_status(&display_url, status, body));
        }

        let json: Value = response.json().await?;

        // FMP reports some failures (bad key, plan limits) as 200 + {"Error Message": ...}
        if let Some(message) = json.get("Error Message").and_then(Value::as_str) {
            return Err(AlertError::Parse {
                url: display_url,
                message: format!("API error: {}", message),
            });
        }

        serde_json::from_value(json)
            .map_err(|e| AlertError::Parse { url: display_url, message: e.to_string() })
    }

    /// GET /stock_market/gainers - today's gainers in API order.
    /// Entries with an unparseable percentage or price are skipped.
    pub async fn get_daily_gainers(&self) -> Result<Vec<GainerRecord>> {
        info!("Fetching daily gainers from FMP API");

        let raw: Vec<FmpGainer> = self.get_json(&["stock_market", "gainers"]).await?;
        let records: Vec<GainerRecord> = raw
            .iter()
            .filter_map(|g| {
                let record = GainerRecord::from_wire(g);
                if record.is_none() {
                    warn!(
                        "Skipping {}: unparseable changesPercentage {} or missing price",
                        g.symbol, g.changes_percentage
                    );
                }
                record
            })
            .collect();

        info!("Successfully fetched {} gainers", records.len());
        Ok(records)
    }

    /// GET /profile/{symbol} - Returns None when the symbol is unknown
    ///
    /// Note: FMP returns an array even for a single symbol, so we take the first element.
    pub async fn get_company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        let profiles: Vec<FmpProfile> = self.get_json(&["profile", symbol]).await?;
        Ok(profiles.into_iter().next().map(CompanyProfile::from))
    }

    /// GET /profile/{A,B,C} - One request for many symbols
    pub async fn get_company_profiles(&self, symbols: &[&str]) -> Result<Vec<CompanyProfile>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let joined = symbols.join(",");
        let profiles: Vec<FmpProfile> = self.get_json(&["profile", joined.as_str()]).await?;
        Ok(profiles.into_iter().map(CompanyProfile::from).collect())
    }

    /// Fill `market_cap` on each record from its company profile.
    /// Symbols missing from the profile response keep `None`.
    pub async fn enrich_with_market_cap(&self, records: Vec<GainerRecord>) -> Result<Vec<GainerRecord>> {
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        let profiles = self.get_company_profiles(&symbols).await?;

        let enriched: Vec<GainerRecord> = records
            .into_iter()
            .map(|mut record| {
                record.market_cap = profiles
                    .iter()
                    .find(|p| p.symbol.eq_ignore_ascii_case(&record.symbol))
                    .and_then(|p| p.market_cap);
                record
            })
            .collect();

        let known = enriched.iter().filter(|r| r.market_cap.is_some()).count();
        info!("Market cap found for {}/{} stocks", known, enriched.len());
        Ok(enriched)
    }
}
