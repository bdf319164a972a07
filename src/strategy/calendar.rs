use crate::options::{OptionPosition, Right};
use crate::pricing::{black_scholes, probability};
use crate::strategy::{Strategy, StrategyError};
use chrono::NaiveDate;

/// Calendar spread: two options on the same underlying, same strike, same
/// right, different expirations, one long and one short.
///
/// Legs are reordered at construction so the near-term option always comes
/// first, whatever order the caller passed them in.
#[derive(Debug, Clone)]
pub struct CalendarSpread {
    legs: [OptionPosition; 2],
    /// Signed calendar count; the next-term leg gives the sign.
    pub amount: i32,
    /// Net price of both legs when the spread was quoted.
    pub debit: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl CalendarSpread {
    pub fn new(
        near_term: OptionPosition,
        next_term: OptionPosition,
    ) -> Result<Self, StrategyError> {
        if near_term.ticker != next_term.ticker {
            return Err(StrategyError::TickerMismatch {
                near: near_term.ticker,
                next: next_term.ticker,
            });
        }
        if near_term.strike != next_term.strike {
            return Err(StrategyError::StrikeMismatch {
                near: near_term.strike,
                next: next_term.strike,
            });
        }
        if near_term.expiration == next_term.expiration {
            return Err(StrategyError::SameExpiration(near_term.expiration));
        }
        if near_term.amount.abs() != next_term.amount.abs()
            || near_term.amount + next_term.amount != 0
        {
            return Err(StrategyError::AmountMismatch {
                near: near_term.amount,
                next: next_term.amount,
            });
        }
        if near_term.right != next_term.right {
            return Err(StrategyError::RightMismatch);
        }

        // debit and greeks are commutative over the legs, so compute them
        // before any swap
        let debit = near_term.price(false) + next_term.price(false);
        let delta = near_term.delta() + next_term.delta();
        let gamma = near_term.gamma() + next_term.gamma();
        let theta = near_term.theta() + next_term.theta();
        let vega = near_term.vega() + next_term.vega();

        // swap if the caller handed the legs in far-to-near order
        let legs = if near_term.expiration > next_term.expiration {
            [next_term, near_term]
        } else {
            [near_term, next_term]
        };
        let amount = legs[1].amount;

        Ok(Self {
            legs,
            amount,
            debit,
            delta,
            gamma,
            theta,
            vega,
        })
    }

    #[inline]
    pub fn near_term(&self) -> &OptionPosition {
        &self.legs[0]
    }

    #[inline]
    pub fn next_term(&self) -> &OptionPosition {
        &self.legs[1]
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.legs[0].strike
    }

    #[inline]
    pub fn right(&self) -> Right {
        self.legs[0].right
    }
}

impl Strategy for CalendarSpread {
    fn name(&self) -> &'static str {
        "Calendar Spread"
    }

    fn legs(&self) -> &[OptionPosition] {
        &self.legs
    }

    /// P/L of the spread at `date` across the price grid. Each leg is priced
    /// with Black-Scholes at its own time to expiry, scaled by
    /// `multiplier * amount`, net of the leg's entry debit. Dates at or past
    /// a leg's expiry price that leg at intrinsic value.
    fn evaluate(&self, grid: &[f64], date: NaiveDate, rate: f64, iv: f64) -> Vec<f64> {
        let mut curve = vec![0.0; grid.len()];
        for leg in &self.legs {
            let t = (leg.expiration - date).num_days() as f64 / 365.0;
            let scale = leg.multiplier * leg.amount as f64;
            let debit = leg.debit();
            for (y, &spot) in curve.iter_mut().zip(grid) {
                let value = black_scholes::price(leg.right, spot, leg.strike, t, rate, iv);
                *y += scale * (value - debit);
            }
        }
        curve
    }

    fn profit_probability(
        &self,
        grid: &[f64],
        curve: &[f64],
        iv: f64,
        spot: f64,
        rate: f64,
        t: f64,
    ) -> Result<f64, StrategyError> {
        probability::profit_probability(grid, curve, iv, spot, rate, t)
    }
}

impl std::fmt::Display for CalendarSpread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} {} calendar spread, strike {}",
            self.legs[0].expiration.format("%d %b'%y"),
            self.legs[1].expiration.format("%d %b'%y"),
            self.right(),
            self.strike()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainRecord;
    use crate::graph::price_grid;

    fn leg(
        ticker: &str,
        strike: f64,
        expiration: NaiveDate,
        price: f64,
        amount: i32,
    ) -> OptionPosition {
        let rec = ChainRecord {
            symbol: ticker.into(),
            contract_id: 1,
            expiry: expiration,
            strike,
            right: Right::Call,
            bid: price,
            ask: price,
            close: Some(price),
            multiplier: 100.0,
            bid_delta: 0.45,
            ask_delta: 0.55,
            bid_gamma: 0.03,
            ask_gamma: 0.04,
            bid_theta: -0.05,
            ask_theta: -0.04,
            bid_vega: 0.10,
            ask_vega: 0.12,
            bid_iv: 0.20,
            ask_iv: 0.22,
        };
        OptionPosition::from_record(&rec, amount)
    }

    fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn near_next() -> (OptionPosition, OptionPosition) {
        let near = leg("XYZ", 100.0, base_date() + chrono::Days::new(30), 2.0, -1);
        let next = leg("XYZ", 100.0, base_date() + chrono::Days::new(60), 3.0, 1);
        (near, next)
    }

    #[test]
    fn rejects_mixed_underlyings() {
        let (near, mut next) = near_next();
        next.ticker = "ABC".into();
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::TickerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_mixed_strikes() {
        let (near, mut next) = near_next();
        next.strike = 105.0;
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::StrikeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_equal_expirations() {
        let (near, mut next) = near_next();
        next.expiration = near.expiration;
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::SameExpiration(_))
        ));
    }

    #[test]
    fn rejects_same_sign_amounts() {
        let (mut near, mut next) = near_next();
        near.amount = -1;
        next.amount = -1;
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::AmountMismatch { near: -1, next: -1 })
        ));
    }

    #[test]
    fn rejects_unequal_magnitudes() {
        let (mut near, mut next) = near_next();
        near.amount = -2;
        next.amount = 1;
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn rejects_mixed_rights() {
        let (near, mut next) = near_next();
        next.right = Right::Put;
        assert!(matches!(
            CalendarSpread::new(near, next),
            Err(StrategyError::RightMismatch)
        ));
    }

    #[test]
    fn reorders_legs_by_expiration() {
        let (near, next) = near_next();
        let near_exp = near.expiration;
        let spread = CalendarSpread::new(next, near).unwrap();
        assert_eq!(spread.near_term().expiration, near_exp);
        assert!(spread.near_term().expiration < spread.next_term().expiration);
        // sign comes from the (reordered) next-term leg
        assert_eq!(spread.amount, 1);
    }

    #[test]
    fn sums_debit_and_greeks_across_legs() {
        let (near, next) = near_next();
        let spread = CalendarSpread::new(near, next).unwrap();
        // short near leg is sold at bid (2.00), long next leg bought at ask (3.00)
        assert!((spread.debit - 5.0).abs() < 1e-12);
        // short selects bid-side greeks, long selects ask-side
        assert!((spread.delta - (0.45 + 0.55)).abs() < 1e-12);
        assert!((spread.vega - (0.10 + 0.12)).abs() < 1e-12);
        assert_eq!(spread.ticker(), "XYZ");
        assert_eq!(spread.strike_bounds(), (100.0, 100.0));
        assert_eq!(spread.nearest_expiration(), spread.near_term().expiration);
    }

    #[test]
    fn curve_has_single_hump_and_two_breakevens_at_near_expiry() {
        let (near, next) = near_next();
        let eval_date = near.expiration;
        let spread = CalendarSpread::new(near, next).unwrap();

        let grid = price_grid(100.0, 100.0, 500);
        let curve = spread.evaluate(&grid, eval_date, 0.01, 0.20);

        // peak sits near the shared strike
        let (max_idx, max_val) = curve
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| {
                if v > acc.1 { (i, v) } else { acc }
            });
        assert!(max_val > 0.0, "peak P/L should be positive: {max_val}");
        assert!(
            (grid[max_idx] - 100.0).abs() < 5.0,
            "peak at {} should be near the strike",
            grid[max_idx]
        );
        // interior maximum, losses in both wings
        assert!(curve[0] < 0.0, "left wing should lose: {}", curve[0]);
        assert!(curve[curve.len() - 1] < 0.0, "right wing should lose");

        let points = probability::breakevens(&grid, &curve);
        assert_eq!(points.len(), 2, "expected two breakevens: {points:?}");
        assert!(points[0] < 100.0 && points[1] > 100.0, "breakevens {points:?}");

        let p = spread
            .profit_probability(&grid, &curve, 0.20, 100.0, 0.01, 30.0 / 365.0)
            .unwrap();
        assert!(p > 0.0 && p < 1.0, "profit probability {p}");
    }

    #[test]
    fn evaluate_settles_expired_legs_at_intrinsic() {
        let (near, next) = near_next();
        let past_both = next.expiration + chrono::Days::new(10);
        let spread = CalendarSpread::new(near, next).unwrap();

        let grid = [80.0, 100.0, 120.0];
        let curve = spread.evaluate(&grid, past_both, 0.01, 0.20);
        // both legs settled: intrinsic values cancel, leaving the net debits
        // -1 * 100 * (0 - 2.0) + 1 * 100 * (0 - 3.0) = -100 at 80
        assert!((curve[0] + 100.0).abs() < 1e-9, "settled OTM: {}", curve[0]);
        // at 120 both intrinsics are 20 and cancel leg against leg
        assert!((curve[2] + 100.0).abs() < 1e-9, "settled ITM: {}", curve[2]);
    }
}
