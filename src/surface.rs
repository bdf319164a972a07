use crate::chain::ChainRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Implied-volatility surface data: one point per quoted contract, for an
/// external 3D/contour plotting layer.

/// IVs at or above this are treated as junk quotes and dropped.
const MAX_SANE_IV: f64 = 2.0;

#[derive(Debug, Clone, Serialize)]
pub struct SurfacePoint {
    pub expiry: NaiveDate,
    pub days_to_expiration: i64,
    pub strike: f64,
    /// Bid/ask midpoint of the contract's implied volatility.
    pub iv: f64,
}

/// Surface points for every contract with a sane IV quote and an expiry
/// after `as_of`. Past or same-day expiries carry no volatility information.
pub fn surface_points(records: &[ChainRecord], as_of: NaiveDate) -> Vec<SurfacePoint> {
    records
        .iter()
        .filter_map(|rec| {
            let days = (rec.expiry - as_of).num_days();
            if days <= 0 {
                return None;
            }
            let iv = (rec.bid_iv + rec.ask_iv) / 2.0;
            if !iv.is_finite() || iv <= 0.0 || iv >= MAX_SANE_IV {
                return None;
            }
            Some(SurfacePoint {
                expiry: rec.expiry,
                days_to_expiration: days,
                strike: rec.strike,
                iv,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Right;

    fn record(expiry: NaiveDate, strike: f64, bid_iv: f64, ask_iv: f64) -> ChainRecord {
        ChainRecord {
            symbol: "XYZ".into(),
            contract_id: 1,
            expiry,
            strike,
            right: Right::Call,
            bid: 1.0,
            ask: 1.2,
            close: None,
            multiplier: 100.0,
            bid_delta: 0.0,
            ask_delta: 0.0,
            bid_gamma: 0.0,
            ask_gamma: 0.0,
            bid_theta: 0.0,
            ask_theta: 0.0,
            bid_vega: 0.0,
            ask_vega: 0.0,
            bid_iv,
            ask_iv,
        }
    }

    #[test]
    fn builds_points_with_days_to_expiration() {
        let as_of = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2026, 9, 18).unwrap();
        let points = surface_points(&[record(expiry, 100.0, 0.18, 0.22)], as_of);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].days_to_expiration, 43);
        assert!((points[0].iv - 0.20).abs() < 1e-12);
    }

    #[test]
    fn drops_expired_and_junk_quotes() {
        let as_of = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let live = NaiveDate::from_ymd_opt(2026, 9, 18).unwrap();
        let dead = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let records = vec![
            record(dead, 100.0, 0.18, 0.22),   // expired
            record(live, 100.0, 0.0, 0.0),     // no IV quote
            record(live, 105.0, 3.0, 3.5),     // junk IV
            record(live, 110.0, f64::NAN, 0.2), // unparseable
            record(live, 115.0, 0.25, 0.30),
        ];
        let points = surface_points(&records, as_of);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].strike, 115.0);
    }
}
