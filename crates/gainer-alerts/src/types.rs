//! Wire and domain types for the alert pipeline
//!
//! # Design Principles
//! 1. Raw API payloads (`Fmp*`, `Chat*`) are kept separate from domain types
//! 2. Unknown wire fields are preserved via `#[serde(flatten)] extra`
//! 3. A malformed record is skipped, never a panic
//!
//! # Sources
//! - FMP Market Gainers: https://site.financialmodelingprep.com/developer/docs#market-biggest-gainers
//! - Perplexity Chat Completions: https://docs.perplexity.ai/api-reference/chat-completions
//! - GitHub Workflow Dispatch: https://docs.github.com/en/rest/actions/workflows#create-a-workflow-dispatch-event

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Financial Modeling Prep (Inbound)
// ============================================================================

/// Raw gainer entry from GET /stock_market/gainers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FmpGainer {
    pub symbol: String,
    #[serde(default, alias = "companyName")]
    pub name: Option<String>,
    /// Absolute price change since previous close
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Either a number (`12.5`) or a string (`"12.5%"`, `"+12.5%"`)
    #[serde(rename = "changesPercentage", default)]
    pub changes_percentage: Value,
    /// Extra fields for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw company profile from GET /profile/{symbol}
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FmpProfile {
    pub symbol: String,
    #[serde(rename = "companyName", default)]
    pub company_name: Option<String>,
    #[serde(rename = "mktCap", default)]
    pub mkt_cap: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Absolute price change today
    #[serde(default)]
    pub changes: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse FMP's `changesPercentage`, which arrives as a number or a string
/// with an optional sign and `%` suffix.
pub fn parse_percentage(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').trim().trim_start_matches('+');
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

// ============================================================================
// Domain Types
// ============================================================================

/// A stock that rose today, as reported by the market-data API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GainerRecord {
    pub symbol: String,
    pub name: String,
    /// Percent gain versus previous close (12.5 means +12.5%)
    pub percent_gain: f64,
    pub price: f64,
    pub previous_close: f64,
    /// Only set when market-cap enrichment ran
    pub market_cap: Option<f64>,
}

impl GainerRecord {
    /// Convert a wire record. Returns None when the percentage is unparseable
    /// or the price is missing.
    pub fn from_wire(raw: &FmpGainer) -> Option<Self> {
        let percent_gain = parse_percentage(&raw.changes_percentage)?;
        let price = raw.price?;
        let previous_close = match raw.change {
            Some(change) => price - change,
            None => price / (1.0 + percent_gain / 100.0),
        };

        Some(Self {
            symbol: raw.symbol.clone(),
            name: raw.name.clone().unwrap_or_else(|| raw.symbol.clone()),
            percent_gain,
            price,
            previous_close,
            market_cap: None,
        })
    }
}

/// Company profile used for name lookup and market-cap enrichment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: String,
    pub market_cap: Option<f64>,
    pub price: Option<f64>,
    pub changes: Option<f64>,
}

impl CompanyProfile {
    /// Percent change versus previous close, when the profile carries prices
    pub fn todays_gain(&self) -> Option<f64> {
        let (price, changes) = (self.price?, self.changes?);
        let previous_close = price - changes;
        (previous_close > 0.0).then(|| changes / previous_close * 100.0)
    }
}

impl From<FmpProfile> for CompanyProfile {
    fn from(raw: FmpProfile) -> Self {
        Self {
            company_name: raw.company_name.unwrap_or_else(|| raw.symbol.clone()),
            symbol: raw.symbol,
            market_cap: raw.mkt_cap,
            price: raw.price,
            changes: raw.changes,
        }
    }
}

/// Named block of a deep research report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Overview,
    Metrics,
    CompetitiveAnalysis,
    Valuation,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Overview,
        SectionKind::Metrics,
        SectionKind::CompetitiveAnalysis,
        SectionKind::Valuation,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Overview => "Overview",
            SectionKind::Metrics => "Key Metrics",
            SectionKind::CompetitiveAnalysis => "Competitive Analysis",
            SectionKind::Valuation => "Valuation",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub body: String,
}

/// Research findings for one stock, split into sections in `SectionKind::ALL` order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub symbol: String,
    pub company_name: String,
    pub sections: Vec<ReportSection>,
}

impl ResearchReport {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Rendered email ready for delivery or preview
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

// ============================================================================
// Perplexity Chat Completions
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// GitHub Workflow Dispatch (Outbound)
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchInputs {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Body of POST /repos/{owner}/{repo}/actions/workflows/{id}/dispatches
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowDispatch {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: DispatchInputs,
}

impl WorkflowDispatch {
    pub fn research(git_ref: &str, symbol: &str, company_name: Option<&str>) -> Self {
        Self {
            git_ref: git_ref.to_string(),
            inputs: DispatchInputs {
                symbol: symbol.to_string(),
                company_name: company_name.map(str::to_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> FmpGainer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_percentage_formats() {
        assert_eq!(parse_percentage(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(parse_percentage(&serde_json::json!("12.5%")), Some(12.5));
        assert_eq!(parse_percentage(&serde_json::json!("+15.02%")), Some(15.02));
        assert_eq!(parse_percentage(&serde_json::json!("-3%")), Some(-3.0));
        assert_eq!(parse_percentage(&serde_json::json!("n/a")), None);
        assert_eq!(parse_percentage(&Value::Null), None);
    }

    #[test]
    fn test_gainer_from_wire() {
        let raw = wire(
            r#"{"symbol":"NVDA","name":"NVIDIA Corporation","change":15.0,"price":115.0,"changesPercentage":"15.0%","exchange":"NASDAQ"}"#,
        );
        let rec = GainerRecord::from_wire(&raw).unwrap();
        assert_eq!(rec.symbol, "NVDA");
        assert_eq!(rec.name, "NVIDIA Corporation");
        assert_eq!(rec.percent_gain, 15.0);
        assert_eq!(rec.previous_close, 100.0);
        assert!(raw.extra.contains_key("exchange"));
    }

    #[test]
    fn test_gainer_without_change_derives_previous_close() {
        let raw = wire(r#"{"symbol":"X","price":110.0,"changesPercentage":10}"#);
        let rec = GainerRecord::from_wire(&raw).unwrap();
        assert_eq!(rec.name, "X");
        assert!((rec.previous_close - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_gainer_with_bad_percentage_is_skipped() {
        let raw = wire(r#"{"symbol":"X","price":1.0,"changesPercentage":"abc"}"#);
        assert!(GainerRecord::from_wire(&raw).is_none());
    }

    #[test]
    fn test_profile_todays_gain() {
        let raw: FmpProfile = serde_json::from_str(
            r#"{"symbol":"AAPL","companyName":"Apple Inc.","mktCap":3.0e12,"price":110.0,"changes":10.0}"#,
        )
        .unwrap();
        let profile = CompanyProfile::from(raw);
        assert_eq!(profile.company_name, "Apple Inc.");
        assert_eq!(profile.todays_gain(), Some(10.0));

        let bare: FmpProfile = serde_json::from_str(r#"{"symbol":"X"}"#).unwrap();
        let profile = CompanyProfile::from(bare);
        assert_eq!(profile.company_name, "X");
        assert_eq!(profile.todays_gain(), None);
    }

    #[test]
    fn test_dispatch_omits_missing_name() {
        let body = serde_json::to_value(WorkflowDispatch::research("main", "AAPL", None)).unwrap();
        assert_eq!(body, serde_json::json!({"ref": "main", "inputs": {"symbol": "AAPL"}}));

        let body =
            serde_json::to_value(WorkflowDispatch::research("main", "AAPL", Some("Apple Inc."))).unwrap();
        assert_eq!(body["inputs"]["company_name"], "Apple Inc.");
    }
}
