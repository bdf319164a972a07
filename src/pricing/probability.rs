use crate::strategy::StrategyError;
use smallvec::SmallVec;
use statrs::distribution::{ContinuousCDF, LogNormal};

/// Breakeven extraction and lognormal profit-probability estimation.
///
/// The underlying at expiry is modeled as lognormal with shape `iv` and
/// scale `spot * e^(rate * t)` (the forward). Probability of profit is the
/// mass between the breakevens of the P/L curve.

/// Underlying prices where the curve changes sign. Each sign change between
/// consecutive samples reports the left grid point.
pub fn breakevens(x: &[f64], y: &[f64]) -> SmallVec<[f64; 4]> {
    let mut found = SmallVec::new();
    for i in 0..y.len().saturating_sub(1) {
        if sign(y[i]) != sign(y[i + 1]) {
            found.push(x[i]);
        }
    }
    found
}

#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Probability that the strategy finishes profitable.
///
/// `x`/`y` are the price grid and P/L curve, `iv` the underlying implied
/// volatility (annualized decimal), `spot` the current underlying price,
/// `rate` the risk-free rate, and `t` the horizon in years.
///
/// With no breakeven the curve never crosses zero, so the outcome is near
/// certain either way; 0.9999/0.0001 are reported instead of hard 0 or 1
/// since the distribution tails never vanish. More than two breakevens is
/// outside the supported payoff shapes and is reported as an error rather
/// than a silently wrong number.
pub fn profit_probability(
    x: &[f64],
    y: &[f64],
    iv: f64,
    spot: f64,
    rate: f64,
    t: f64,
) -> Result<f64, StrategyError> {
    if y.is_empty() {
        return Err(StrategyError::EmptyCurve);
    }

    let points = breakevens(x, y);
    match points.len() {
        0 => Ok(if y[y.len() / 2] > 0.0 { 0.9999 } else { 0.0001 }),
        1 => {
            let dist = settlement_distribution(iv, spot, rate, t)?;
            // profitable side is wherever the curve starts out positive
            if y[0] > 0.0 {
                Ok(dist.cdf(points[0]).clamp(0.0, 1.0))
            } else {
                Ok(dist.sf(points[0]).clamp(0.0, 1.0))
            }
        }
        2 => {
            let dist = settlement_distribution(iv, spot, rate, t)?;
            let p_below = dist.cdf(points[0]);
            let p_above = dist.sf(points[1]);
            Ok((1.0 - p_below - p_above).clamp(0.0, 1.0))
        }
        n => Err(StrategyError::TooManyBreakevens(n)),
    }
}

fn settlement_distribution(
    iv: f64,
    spot: f64,
    rate: f64,
    t: f64,
) -> Result<LogNormal, StrategyError> {
    if iv <= 0.0 || !iv.is_finite() {
        return Err(StrategyError::InvalidVolatility(iv));
    }
    if spot <= 0.0 || !spot.is_finite() {
        return Err(StrategyError::InvalidSpot(spot));
    }
    let scale = spot * (rate * t).exp();
    LogNormal::new(scale.ln(), iv).map_err(|_| StrategyError::InvalidVolatility(iv))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn finds_two_crossings_of_a_hump() {
        let x = grid(70.0, 130.0, 500);
        // inverted parabola crossing zero at 90 and 110
        let y: Vec<f64> = x.iter().map(|&s| -(s - 90.0) * (s - 110.0)).collect();
        let b = breakevens(&x, &y);
        assert_eq!(b.len(), 2);
        assert!((b[0] - 90.0).abs() < 0.5, "lower breakeven {}", b[0]);
        assert!((b[1] - 110.0).abs() < 0.5, "upper breakeven {}", b[1]);
    }

    #[test]
    fn no_breakeven_reports_near_certainty() {
        let x = grid(70.0, 130.0, 101);
        let flat_win: Vec<f64> = x.iter().map(|_| 5.0).collect();
        let flat_loss: Vec<f64> = x.iter().map(|_| -5.0).collect();
        let p_win = profit_probability(&x, &flat_win, 0.2, 100.0, 0.01, 0.1).unwrap();
        let p_loss = profit_probability(&x, &flat_loss, 0.2, 100.0, 0.01, 0.1).unwrap();
        assert!(p_win >= 0.999, "always-profitable curve: {p_win}");
        assert!(p_loss <= 0.001, "always-losing curve: {p_loss}");
    }

    #[test]
    fn two_breakevens_matches_lognormal_tails() {
        let x = grid(70.0, 130.0, 500);
        let y: Vec<f64> = x.iter().map(|&s| -(s - 90.0) * (s - 110.0)).collect();
        let b = breakevens(&x, &y);

        let (iv, spot, rate, t) = (0.2, 100.0, 0.01, 30.0 / 365.0);
        let p = profit_probability(&x, &y, iv, spot, rate, t).unwrap();

        let scale = spot * (rate * t).exp();
        let dist = LogNormal::new(scale.ln(), iv).unwrap();
        let expected = 1.0 - dist.cdf(b[0]) - dist.sf(b[1]);
        assert!((p - expected).abs() < 1e-12);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn single_breakeven_takes_the_profitable_tail() {
        let x = grid(70.0, 130.0, 500);
        // long-call-like curve: losing below 100, winning above
        let rising: Vec<f64> = x.iter().map(|&s| s - 100.0).collect();
        // short-call-like curve: winning below 100, losing above
        let falling: Vec<f64> = x.iter().map(|&s| 100.0 - s).collect();

        let (iv, spot, rate, t) = (0.2, 100.0, 0.01, 30.0 / 365.0);
        let p_up = profit_probability(&x, &rising, iv, spot, rate, t).unwrap();
        let p_down = profit_probability(&x, &falling, iv, spot, rate, t).unwrap();

        // the two tails partition the distribution around the breakeven
        assert!((p_up + p_down - 1.0).abs() < 1e-9);
        assert!(p_up > 0.3 && p_up < 0.7, "ATM tail should be near half: {p_up}");
    }

    #[test]
    fn more_than_two_breakevens_is_an_error() {
        let x = grid(0.0, 4.0, 400);
        let y: Vec<f64> = x.iter().map(|&s| (s * std::f64::consts::PI).sin()).collect();
        let err = profit_probability(&x, &y, 0.2, 100.0, 0.01, 0.1).unwrap_err();
        match err {
            StrategyError::TooManyBreakevens(n) => assert!(n > 2, "found {n}"),
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn bad_volatility_is_an_error() {
        let x = grid(70.0, 130.0, 100);
        let y: Vec<f64> = x.iter().map(|&s| s - 100.0).collect();
        assert!(matches!(
            profit_probability(&x, &y, 0.0, 100.0, 0.01, 0.1),
            Err(StrategyError::InvalidVolatility(_))
        ));
        assert!(matches!(
            profit_probability(&x, &y, 0.2, 0.0, 0.01, 0.1),
            Err(StrategyError::InvalidSpot(_))
        ));
    }
}
