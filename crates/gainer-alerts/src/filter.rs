//! Gainer selection
//!
//! Output is always sorted by percent gain, highest first. The sort is stable,
//! so equal gains keep their fetch order.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::types::GainerRecord;

/// Sort by percent gain descending, keeping fetch order for ties
pub fn sort_by_gain(records: &mut [GainerRecord]) {
    records.sort_by(|a, b| b.percent_gain.partial_cmp(&a.percent_gain).unwrap_or(Ordering::Equal));
}

/// Keep records whose gain is at least `threshold` percent, sorted descending.
/// An empty result is a normal outcome.
pub fn filter_gainers(records: &[GainerRecord], threshold: f64) -> Vec<GainerRecord> {
    let mut selected: Vec<GainerRecord> =
        records.iter().filter(|r| r.percent_gain >= threshold).cloned().collect();
    sort_by_gain(&mut selected);

    info!("Filtered {} of {} stocks with gains >= {}%", selected.len(), records.len(), threshold);
    selected
}

/// Keep records with a known market cap of at least `min_market_cap`.
/// Records never enriched with a market cap are dropped.
pub fn filter_by_market_cap(records: &[GainerRecord], min_market_cap: f64) -> Vec<GainerRecord> {
    let mut selected: Vec<GainerRecord> = records
        .iter()
        .filter(|r| match r.market_cap {
            Some(cap) => cap >= min_market_cap,
            None => {
                debug!("Dropping {}: market cap unknown", r.symbol);
                false
            }
        })
        .cloned()
        .collect();
    sort_by_gain(&mut selected);

    info!(
        "Market cap filter kept {} of {} stocks (min ${:.0})",
        selected.len(),
        records.len(),
        min_market_cap
    );
    selected
}
