use crate::chain::{ChainRecord, ChainSnapshot};
use crate::options::Right;
use chrono::NaiveDate;
use serde::Serialize;

/// Calendar scan: for a chosen near/next expiry pair and right, the strikes
/// quoted in both expiries and the midprice debit of the calendar at each
/// one. This is the flat data behind a "which strike is cheap" comparison
/// across the chain.

#[derive(Debug, Clone, Serialize)]
pub struct CalendarQuote {
    pub strike: f64,
    pub near_mid: f64,
    pub next_mid: f64,
    /// Cost of the calendar at midprice: next-term mid minus near-term mid.
    pub debit: f64,
}

/// Sorted unique expiries carrying at least one usable quote for `right`.
pub fn quoted_expiries(snapshot: &ChainSnapshot, right: Right) -> Vec<NaiveDate> {
    let mut expiries: Vec<NaiveDate> = snapshot
        .records
        .iter()
        .filter(|r| r.right == right && usable_mid(r).is_some())
        .map(|r| r.expiry)
        .collect();
    expiries.sort_unstable();
    expiries.dedup();
    expiries
}

/// Per-strike calendar debits for the given expiry pair, sorted by strike.
/// Strikes quoted in only one of the two expiries are dropped, as are
/// contracts without a positive midprice.
pub fn calendar_debits(
    snapshot: &ChainSnapshot,
    near: NaiveDate,
    next: NaiveDate,
    right: Right,
) -> Vec<CalendarQuote> {
    let mids = |expiry: NaiveDate| {
        let mut quotes: Vec<(f64, f64)> = snapshot
            .records
            .iter()
            .filter(|r| r.right == right && r.expiry == expiry)
            .filter_map(|r| usable_mid(r).map(|mid| (r.strike, mid)))
            .collect();
        quotes.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        quotes
    };

    let near_mids = mids(near);
    let next_mids = mids(next);

    let mut out = Vec::new();
    for &(strike, near_mid) in &near_mids {
        if let Ok(idx) = next_mids.binary_search_by(|probe| probe.0.total_cmp(&strike)) {
            let next_mid = next_mids[idx].1;
            out.push(CalendarQuote {
                strike,
                near_mid,
                next_mid,
                debit: next_mid - near_mid,
            });
        }
    }
    out
}

/// Midprice with unquoted sides (negative placeholders) clamped to zero;
/// a zero mid means the contract is not really quoted.
fn usable_mid(rec: &ChainRecord) -> Option<f64> {
    let bid = rec.bid.max(0.0);
    let ask = rec.ask.max(0.0);
    let mid = (bid + ask) / 2.0;
    (mid > 0.0 && mid.is_finite()).then_some(mid)
}
