use crate::options::Right;
use statrs::distribution::{ContinuousCDF, Normal};

/// Closed-form Black-Scholes pricing for European options.
///
/// C = S*Phi(d1) - K*e^(-rT)*Phi(d2)
/// P = K*e^(-rT)*Phi(-d2) - S*Phi(-d1)
///
/// where d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma*sqrt(T))
/// and d2 = d1 - sigma*sqrt(T).
///
/// `sigma` is an annualized decimal (0.25 = 25%), `t` is in years. For
/// t <= 0 or sigma <= 0 the option is priced at intrinsic value, which is
/// what makes valuation curves well defined on dates at or past expiry.

#[inline]
fn d1_d2(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> (f64, f64) {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    (d1, d1 - sigma_sqrt_t)
}

/// Price a call or put at the given spot.
#[inline]
pub fn price(right: Right, spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> f64 {
    match right {
        Right::Call => call_price(spot, strike, t, rate, sigma),
        Right::Put => put_price(spot, strike, t, rate, sigma),
    }
}

pub fn call_price(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> f64 {
    if t <= 0.0 || sigma <= 0.0 {
        return (spot - strike).max(0.0);
    }
    let (d1, d2) = d1_d2(spot, strike, t, rate, sigma);
    let normal = Normal::standard();
    (spot * normal.cdf(d1) - strike * (-rate * t).exp() * normal.cdf(d2)).max(0.0)
}

pub fn put_price(spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> f64 {
    if t <= 0.0 || sigma <= 0.0 {
        return (strike - spot).max(0.0);
    }
    let (d1, d2) = d1_d2(spot, strike, t, rate, sigma);
    let normal = Normal::standard();
    (strike * (-rate * t).exp() * normal.cdf(-d2) - spot * normal.cdf(-d1)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_put_call_parity() {
        // C - P = S - K*e^(-rT)
        let (s, k, r, sigma, t) = (100.0, 100.0, 0.05, 0.20, 30.0 / 365.0);
        let c = call_price(s, k, t, r, sigma);
        let p = put_price(s, k, t, r, sigma);
        let expected = s - k * (-r * t).exp();
        assert!(
            ((c - p) - expected).abs() < 1e-9,
            "parity violated: C-P={} expected={expected}",
            c - p
        );
    }

    #[test]
    fn test_atm_call_has_time_value() {
        let c = call_price(100.0, 100.0, 30.0 / 365.0, 0.01, 0.20);
        assert!(c > 0.5 && c < 5.0, "ATM call price {c} out of range");
    }

    #[test]
    fn test_intrinsic_at_expiry() {
        assert!((call_price(105.0, 100.0, 0.0, 0.05, 0.2) - 5.0).abs() < TOL);
        assert!((put_price(95.0, 100.0, 0.0, 0.05, 0.2) - 5.0).abs() < TOL);
        assert_eq!(call_price(95.0, 100.0, 0.0, 0.05, 0.2), 0.0);
        // same policy for a date past expiry
        assert!((call_price(105.0, 100.0, -0.1, 0.05, 0.2) - 5.0).abs() < TOL);
    }

    #[test]
    fn test_zero_vol_prices_intrinsic() {
        assert!((call_price(110.0, 100.0, 0.5, 0.0, 0.0) - 10.0).abs() < TOL);
        assert_eq!(put_price(110.0, 100.0, 0.5, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_call_monotonic_in_spot() {
        let t = 60.0 / 365.0;
        let mut prev = call_price(70.0, 100.0, t, 0.01, 0.25);
        for s in [80.0, 90.0, 100.0, 110.0, 120.0, 130.0] {
            let c = call_price(s, 100.0, t, 0.01, 0.25);
            assert!(c > prev, "call price not increasing at spot {s}");
            prev = c;
        }
    }
}
