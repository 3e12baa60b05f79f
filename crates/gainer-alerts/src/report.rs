//! HTML email rendering
//!
//! Everything here is pure: the generation timestamp is passed in, so the same
//! inputs always render byte-identical output. All interpolated text is
//! HTML-escaped.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::types::{EmailContent, GainerRecord, ReportSection, ResearchReport, SectionKind};

const BODY_STYLE: &str = "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; margin: 0; padding: 0; background-color: #ffffff;";
const TH_STYLE: &str = "padding: 8px; text-align: left; color: #666; font-size: 12px; font-weight: 600; border-bottom: 2px solid #ddd;";
const TD_STYLE: &str = "padding: 8px; color: #333; font-size: 14px; border-bottom: 1px solid #eee;";
const FOOTER_STYLE: &str = "color: #999; font-size: 14px; text-align: center; margin-top: 40px;";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `10.0` -> `10`, `7.5` -> `7.5`
pub fn format_threshold(threshold: f64) -> String {
    if threshold.fract() == 0.0 {
        format!("{:.0}", threshold)
    } else {
        let s = format!("{:.2}", threshold);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// `$1.2T`, `$25.7B`, `$450.0M`, `N/A` when unknown
pub fn format_market_cap(market_cap: Option<f64>) -> String {
    match market_cap {
        None => "N/A".to_string(),
        Some(cap) if cap >= 1e12 => format!("${:.1}T", cap / 1e12),
        Some(cap) if cap >= 1e9 => format!("${:.1}B", cap / 1e9),
        Some(cap) if cap >= 1e6 => format!("${:.1}M", cap / 1e6),
        Some(cap) => format!("${:.0}", cap),
    }
}

fn format_generated(generated_at: NaiveDateTime) -> String {
    generated_at.format("%B %d, %Y at %I:%M %p").to_string()
}

pub fn gainer_subject(count: usize, threshold: f64) -> String {
    let t = format_threshold(threshold);
    match count {
        0 => format!("Stock Alert: No {}%+ gainers today", t),
        1 => format!("Stock Alert: 1 stock gained {}%+ today", t),
        n => format!("Stock Alert: {} stocks gained {}%+ today", n, t),
    }
}

/// Render the daily gainer email. `records` should already be filtered and
/// sorted; an empty slice renders the "no gainers" message.
pub fn format_gainer_email(
    records: &[GainerRecord],
    threshold: f64,
    generated_at: NaiveDateTime,
) -> EmailContent {
    let subject = gainer_subject(records.len(), threshold);
    let t = format_threshold(threshold);

    let mut html = String::new();
    let _ = write!(
        html,
        "<html>\n<body style=\"{}\">\n<div style=\"max-width: 700px; margin: 0 auto; padding: 40px 20px;\">\n",
        BODY_STYLE
    );
    let _ = writeln!(
        html,
        "<h1 style=\"color: #000; text-align: center; font-weight: 600;\">Daily Gainers ({}%+)</h1>",
        t
    );

    if records.is_empty() {
        let _ = writeln!(
            html,
            "<p style=\"color: #666; text-align: center; font-size: 16px; margin-top: 20px;\">No stocks gained {}% or more today.</p>",
            t
        );
    } else {
        let show_market_cap = records.iter().any(|r| r.market_cap.is_some());

        html.push_str("<table style=\"width: 100%; border-collapse: collapse;\">\n<thead>\n<tr>\n");
        let mut headers = vec!["Symbol", "Name", "% Gain", "Price", "Previous Close"];
        if show_market_cap {
            headers.push("Market Cap");
        }
        for h in headers {
            let _ = writeln!(html, "<th style=\"{}\">{}</th>", TH_STYLE, h);
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");

        for record in records {
            html.push_str("<tr>\n");
            let _ = writeln!(
                html,
                "<td style=\"{}\"><strong>{}</strong></td>",
                TD_STYLE,
                escape_html(&record.symbol)
            );
            let _ = writeln!(html, "<td style=\"{}\">{}</td>", TD_STYLE, escape_html(&record.name));
            let _ = writeln!(
                html,
                "<td style=\"{} color: #00aa00; font-weight: 600;\">{:+.2}%</td>",
                TD_STYLE, record.percent_gain
            );
            let _ = writeln!(html, "<td style=\"{}\">${:.2}</td>", TD_STYLE, record.price);
            let _ = writeln!(html, "<td style=\"{}\">${:.2}</td>", TD_STYLE, record.previous_close);
            if show_market_cap {
                let _ = writeln!(
                    html,
                    "<td style=\"{}\">{}</td>",
                    TD_STYLE,
                    format_market_cap(record.market_cap)
                );
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
    }

    let _ = writeln!(
        html,
        "<p style=\"{}\">Generated on {}</p>",
        FOOTER_STYLE,
        format_generated(generated_at)
    );
    html.push_str("</div>\n</body>\n</html>\n");

    EmailContent { subject, html }
}

// ============================================================================
// Deep Research
// ============================================================================

/// Research brief sent to the deep research model
pub fn format_research_prompt(company_name: &str, symbol: &str) -> String {
    format!(
        "Write a research report per the below for {company_name} ({symbol})

[Company name, [IRR over time horizon]]
What they do in 100 words or less

Market cap:
Rev gr cur yr:
PS current:
Gross margin:
Rev gr nxt yr:
PS nxt yr:
R&D % of rev:
Rev gr nxt + 1:
PS nxt +1 t:

Competitive advantage [x/10]

Competitive landscape
[100 words] Describe the market the company operates in, the key competitors, market share split, and competitors' strengths/weaknesses.

Competitive advantage
[200 words] Describe the strength of the company's competitive advantage and why it exists. Do this in a simple way so readers unfamiliar to the industry can understand. Will this competitive advantage naturally grow/compound over time? How hard would it be to replicate what this company has done if you had unlimited funding?

Market share change
[100 words] How do you see the market evolving over the next 5, 10 years? How fast will the market grow, and why will this company take market share, if it will?

Valuation [expected IRR over xx years]

IRR buildup
[100 words] Provide your IRR building, stating the revenue and PS ratio now and the exit revenue and PS ratio at the end of your investment period.

Revenue change
[100 words] What is revenue right now, why is it what it is today, and why do you think revenue will change the way it will over your investment horizon?

PS ratio change
[200 words] What is the PS ratio right now, why is it what it is today, and why do you think the PS ratio will change the way it will over your investment horizon?

Factors influencing exit PS
Growth runway
Competitive advantage strength
Margin potential
Industry growth"
    )
}

/// Remove `<think>...</think>` reasoning blocks. An unterminated block
/// swallows the rest of the text.
fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Strip markdown heading and emphasis markers from one line
fn clean_line(line: &str) -> String {
    line.trim().trim_start_matches('#').trim().replace("**", "").replace("__", "")
}

/// Section a heading line opens, if any
fn heading_kind(raw: &str, cleaned: &str) -> Option<SectionKind> {
    let lower = cleaned.to_lowercase();
    let marked = raw.trim_start().starts_with('#') || raw.trim().starts_with("**");
    if !marked && cleaned.len() > 80 {
        return None;
    }

    const MARKERS: &[(&str, SectionKind)] = &[
        ("company overview", SectionKind::Overview),
        ("overview", SectionKind::Overview),
        ("key metrics", SectionKind::Metrics),
        ("metrics", SectionKind::Metrics),
        ("market cap", SectionKind::Metrics),
        ("competitive analysis", SectionKind::CompetitiveAnalysis),
        ("competitive advantage", SectionKind::CompetitiveAnalysis),
        ("competitive landscape", SectionKind::CompetitiveAnalysis),
        ("market share change", SectionKind::CompetitiveAnalysis),
        ("valuation", SectionKind::Valuation),
        ("irr buildup", SectionKind::Valuation),
        ("revenue change", SectionKind::Valuation),
        ("ps ratio change", SectionKind::Valuation),
        ("factors influencing exit ps", SectionKind::Valuation),
    ];

    MARKERS
        .iter()
        .find(|(marker, _)| if marked { lower.starts_with(marker) } else { is_label(&lower, marker) })
        .map(|(_, kind)| *kind)
}

/// Unmarked lines open a section only when they are the label itself,
/// optionally followed by `:` or a `[...]` note.
fn is_label(lower: &str, marker: &str) -> bool {
    lower.strip_prefix(marker).is_some_and(|rest| {
        let rest = rest.trim_start();
        rest.is_empty() || rest.starts_with(':') || rest.starts_with('[')
    })
}

/// Headings that only name a section and carry no content of their own
fn is_bare_title(cleaned: &str) -> bool {
    let lower = cleaned.trim_end_matches(':').to_lowercase();
    matches!(
        lower.as_str(),
        "overview" | "company overview" | "key metrics" | "metrics" | "competitive analysis" | "valuation"
    )
}

impl ResearchReport {
    /// Split research text into sections. Text before the first recognised
    /// heading is the overview. Empty sections are omitted.
    pub fn from_text(symbol: &str, company_name: &str, text: &str) -> Self {
        let text = strip_reasoning(text);
        let mut bodies: Vec<(SectionKind, Vec<String>)> =
            SectionKind::ALL.iter().map(|k| (*k, Vec::new())).collect();
        let mut current = SectionKind::Overview;

        for raw in text.lines() {
            let cleaned = clean_line(raw);
            if let Some(kind) = heading_kind(raw, &cleaned) {
                current = kind;
                if is_bare_title(&cleaned) {
                    continue;
                }
            }
            if let Some((_, lines)) = bodies.iter_mut().find(|(k, _)| *k == current) {
                lines.push(cleaned);
            }
        }

        let sections = bodies
            .into_iter()
            .filter_map(|(kind, lines)| {
                let body = lines.join("\n").trim().to_string();
                (!body.is_empty()).then_some(ReportSection { kind, body })
            })
            .collect();

        Self { symbol: symbol.to_string(), company_name: company_name.to_string(), sections }
    }
}

pub fn research_subject(report: &ResearchReport) -> String {
    format!("Deep Research: {} ({})", report.company_name, report.symbol)
}

/// Render a research report. `todays_gain` adds a gain note to the header.
pub fn format_research_email(
    report: &ResearchReport,
    todays_gain: Option<f64>,
    generated_at: NaiveDateTime,
) -> EmailContent {
    let gain_info = todays_gain.map(|g| format!(" | Today's Gain: {:.2}%", g)).unwrap_or_default();

    let mut html = String::new();
    let _ = write!(
        html,
        "<html>\n<body style=\"{}\">\n<div style=\"max-width: 800px; margin: 0 auto; padding: 40px 20px;\">\n",
        BODY_STYLE
    );
    html.push_str(
        "<h1 style=\"color: #000; text-align: center; margin-bottom: 10px; font-weight: 600;\">Deep Research Report</h1>\n",
    );
    let _ = writeln!(
        html,
        "<h2 style=\"color: #666; text-align: center; margin-bottom: 40px; font-weight: 500;\">{} ({}){}</h2>",
        escape_html(&report.company_name),
        escape_html(&report.symbol),
        gain_info
    );

    if report.sections.is_empty() {
        html.push_str("<p style=\"color: #666; text-align: center;\">The research service returned no content.</p>\n");
    }

    for section in &report.sections {
        html.push_str(
            "<div style=\"background-color: #f5f5f5; border-radius: 16px; padding: 30px; margin-bottom: 20px;\">\n",
        );
        let _ = writeln!(
            html,
            "<h3 style=\"color: #000; margin-top: 0; font-weight: 600;\">{}</h3>",
            section.kind.title()
        );
        let _ = writeln!(
            html,
            "<div style=\"white-space: pre-wrap; color: #333; font-size: 15px; line-height: 1.6;\">{}</div>",
            escape_html(&section.body)
        );
        html.push_str("</div>\n");
    }

    let _ = writeln!(
        html,
        "<p style=\"{}\">Generated on {}</p>",
        FOOTER_STYLE,
        format_generated(generated_at)
    );
    html.push_str("</div>\n</body>\n</html>\n");

    EmailContent { subject: research_subject(report), html }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(16, 5, 0).unwrap()
    }

    fn rec(symbol: &str, name: &str, gain: f64) -> GainerRecord {
        GainerRecord {
            symbol: symbol.to_string(),
            name: name.to_string(),
            percent_gain: gain,
            price: 115.0,
            previous_close: 100.0,
            market_cap: None,
        }
    }

    #[test]
    fn test_threshold_formatting() {
        assert_eq!(format_threshold(10.0), "10");
        assert_eq!(format_threshold(7.5), "7.5");
        assert_eq!(format_threshold(12.25), "12.25");
    }

    #[test]
    fn test_market_cap_formatting() {
        assert_eq!(format_market_cap(None), "N/A");
        assert_eq!(format_market_cap(Some(1.2e12)), "$1.2T");
        assert_eq!(format_market_cap(Some(25.7e9)), "$25.7B");
        assert_eq!(format_market_cap(Some(450e6)), "$450.0M");
        assert_eq!(format_market_cap(Some(999.0)), "$999");
    }

    #[test]
    fn test_subjects() {
        assert_eq!(gainer_subject(0, 10.0), "Stock Alert: No 10%+ gainers today");
        assert_eq!(gainer_subject(1, 10.0), "Stock Alert: 1 stock gained 10%+ today");
        assert_eq!(gainer_subject(3, 10.0), "Stock Alert: 3 stocks gained 10%+ today");
    }

    #[test]
    fn test_empty_email() {
        let email = format_gainer_email(&[], 10.0, at());
        assert_eq!(email.subject, "Stock Alert: No 10%+ gainers today");
        assert!(email.html.contains("No stocks gained 10% or more today."));
        assert!(!email.html.contains("<table"));
        assert!(email.html.contains("Generated on March 14, 2025 at 04:05 PM"));
    }

    #[test]
    fn test_table_rows() {
        let records = vec![rec("NVDA", "NVIDIA Corporation", 15.0), rec("AAPL", "Apple Inc.", 12.0)];
        let email = format_gainer_email(&records, 10.0, at());

        assert_eq!(email.subject, "Stock Alert: 2 stocks gained 10%+ today");
        assert_eq!(email.html.matches("<tr>").count(), 3);
        for header in ["Symbol", "Name", "% Gain", "Price", "Previous Close"] {
            assert!(email.html.contains(&format!(">{}</th>", header)));
        }
        assert!(!email.html.contains("Market Cap"));
        assert!(email.html.contains("+15.00%"));
        assert!(email.html.contains("$115.00"));
        assert!(email.html.contains("$100.00"));
        assert!(email.html.find("NVDA").unwrap() < email.html.find("AAPL").unwrap());
    }

    #[test]
    fn test_market_cap_column_when_enriched() {
        let mut r = rec("AAA", "Aaa", 11.0);
        r.market_cap = Some(2.5e9);
        let email = format_gainer_email(&[r], 10.0, at());
        assert!(email.html.contains(">Market Cap</th>"));
        assert!(email.html.contains("$2.5B"));
    }

    #[test]
    fn test_names_are_escaped() {
        let email = format_gainer_email(&[rec("AT&T", "<script>x</script>", 11.0)], 10.0, at());
        assert!(email.html.contains("AT&amp;T"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let records = vec![rec("A", "A Corp", 20.0)];
        assert_eq!(format_gainer_email(&records, 10.0, at()), format_gainer_email(&records, 10.0, at()));
    }

    #[test]
    fn test_prompt_mentions_company() {
        let prompt = format_research_prompt("Apple Inc.", "AAPL");
        assert!(prompt.starts_with("Write a research report per the below for Apple Inc. (AAPL)"));
        assert!(prompt.contains("IRR buildup"));
    }

    #[test]
    fn test_split_sections() {
        let text = "<think>planning the report</think>\n\
            **Apple Inc., 12% IRR over 5 years**\n\
            Apple designs phones.\n\
            \n\
            Market cap: $3.4T\n\
            Gross margin: 46%\n\
            \n\
            ## Competitive landscape\n\
            Samsung and others.\n\
            ### Competitive advantage\n\
            Ecosystem lock-in.\n\
            # Valuation [12% IRR over 5 years]\n\
            ## IRR buildup\n\
            Revenue grows 6%.";

        let report = ResearchReport::from_text("AAPL", "Apple Inc.", text);
        assert_eq!(report.sections.len(), 4);

        let overview = report.section(SectionKind::Overview).unwrap();
        assert!(overview.body.starts_with("Apple Inc., 12% IRR"));
        assert!(overview.body.contains("Apple designs phones."));
        assert!(!overview.body.contains("planning"));

        let metrics = report.section(SectionKind::Metrics).unwrap();
        assert_eq!(metrics.body, "Market cap: $3.4T\nGross margin: 46%");

        let competitive = report.section(SectionKind::CompetitiveAnalysis).unwrap();
        assert!(competitive.body.contains("Competitive landscape\nSamsung and others."));
        assert!(competitive.body.contains("Ecosystem lock-in."));

        let valuation = report.section(SectionKind::Valuation).unwrap();
        assert!(valuation.body.starts_with("Valuation [12% IRR over 5 years]"));
        assert!(valuation.body.ends_with("Revenue grows 6%."));
    }

    #[test]
    fn test_bare_titles_are_dropped_and_sections_ordered() {
        let text = "## Valuation\nCheap.\n## Overview\nMakes widgets.";
        let report = ResearchReport::from_text("W", "Widget Co", text);
        let kinds: Vec<SectionKind> = report.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Overview, SectionKind::Valuation]);
        assert_eq!(report.section(SectionKind::Valuation).unwrap().body, "Cheap.");
    }

    #[test]
    fn test_sentences_do_not_open_sections() {
        let text = "## Overview\n\
            Valuation multiples look stretched.\n\
            Metrics improved across the board.\n\
            Key metrics:\n\
            Revenue $10B\n\
            Valuation [8% IRR over 5 years]\n\
            Cheap.";

        let report = ResearchReport::from_text("W", "Widget Co", text);
        let overview = report.section(SectionKind::Overview).unwrap();
        assert_eq!(overview.body, "Valuation multiples look stretched.\nMetrics improved across the board.");
        assert_eq!(report.section(SectionKind::Metrics).unwrap().body, "Revenue $10B");
        assert_eq!(
            report.section(SectionKind::Valuation).unwrap().body,
            "Valuation [8% IRR over 5 years]\nCheap."
        );
    }

    #[test]
    fn test_negative_gain_sign() {
        let email = format_gainer_email(&[rec("DOWN", "Down Co", -3.0)], -5.0, at());
        assert!(email.html.contains(">-3.00%</td>"));
        assert!(!email.html.contains("+-"));
    }

    #[test]
    fn test_unterminated_reasoning_block() {
        let report = ResearchReport::from_text("X", "X", "<think>never closed\nstill thinking");
        assert!(report.sections.is_empty());
        let email = format_research_email(&report, None, at());
        assert!(email.html.contains("returned no content"));
    }

    #[test]
    fn test_research_email() {
        let report = ResearchReport::from_text("AAPL", "Apple & Co", "Overview text.\nMarket cap: $1");
        let email = format_research_email(&report, Some(12.5), at());
        assert_eq!(email.subject, "Deep Research: Apple & Co (AAPL)");
        assert!(email.html.contains("Apple &amp; Co (AAPL) | Today's Gain: 12.50%"));
        assert!(email.html.contains(">Overview</h3>"));
        assert!(email.html.contains(">Key Metrics</h3>"));
        assert!(!email.html.contains(">Valuation</h3>"));
    }
}
