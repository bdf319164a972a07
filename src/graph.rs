use crate::strategy::Strategy;
use chrono::NaiveDate;
use serde::Serialize;

/// Risk-graph data: P/L curve families over a price grid, ready for an
/// external plotting layer. No rendering happens here.

/// Default number of grid points per curve.
pub const GRID_POINTS: usize = 500;

/// Price grid spanning 30% below the lowest strike to 30% above the
/// highest, so the wings of a spread stay visible.
pub fn price_grid(min_strike: f64, max_strike: f64, points: usize) -> Vec<f64> {
    let lo = min_strike * 0.7;
    let hi = max_strike * 1.3;
    if points < 2 {
        return vec![lo];
    }
    let step = (hi - lo) / (points - 1) as f64;
    (0..points).map(|i| lo + step * i as f64).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DatedCurve {
    pub date: NaiveDate,
    /// Days from `date` to the strategy's nearest expiration, for labeling.
    pub days_to_expiry: i64,
    pub pnl: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskGraph {
    pub prices: Vec<f64>,
    pub curves: Vec<DatedCurve>,
}

/// Evaluate a strategy across its price grid for each requested date.
pub fn risk_graph(
    strategy: &dyn Strategy,
    dates: &[NaiveDate],
    rate: f64,
    iv: f64,
) -> RiskGraph {
    let (min_strike, max_strike) = strategy.strike_bounds();
    let prices = price_grid(min_strike, max_strike, GRID_POINTS);
    let front_expiry = strategy.nearest_expiration();

    let curves = dates
        .iter()
        .map(|&date| DatedCurve {
            date,
            days_to_expiry: (front_expiry - date).num_days(),
            pnl: strategy.evaluate(&prices, date, rate, iv),
        })
        .collect();

    RiskGraph { prices, curves }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spans_strike_bounds_with_margin() {
        let grid = price_grid(100.0, 120.0, 500);
        assert_eq!(grid.len(), 500);
        assert!((grid[0] - 70.0).abs() < 1e-9);
        assert!((grid[499] - 156.0).abs() < 1e-9);
        // strictly increasing
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn degenerate_point_count_still_returns_a_grid() {
        let grid = price_grid(100.0, 100.0, 1);
        assert_eq!(grid, vec![70.0]);
    }
}
