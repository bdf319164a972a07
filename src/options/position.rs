use crate::chain::ChainRecord;
use crate::options::{Quote, Right};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("expected exactly one matching contract, found {0}")]
    AmbiguousContract(usize),
}

/// One option contract position: market data, greeks, and a signed size.
///
/// `amount > 0` is long, `amount < 0` is short. Every quoted field is a
/// bid/ask pair; the effective value is selected by position sign on demand
/// and never cached. The only mutable piece of state is `debit`, recorded
/// once when the position is actually established.
#[derive(Debug, Clone, Serialize)]
pub struct OptionPosition {
    pub ticker: String,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub implied_volatility: Quote,
    pub bid_ask: Quote,
    pub delta: Quote,
    pub gamma: Quote,
    pub theta: Quote,
    pub vega: Quote,
    pub multiplier: f64,
    pub right: Right,
    pub amount: i32,
    debit: Option<f64>,
}

impl OptionPosition {
    /// Build a position from a single chain record.
    pub fn from_record(rec: &ChainRecord, amount: i32) -> Self {
        Self {
            ticker: rec.symbol.clone(),
            strike: rec.strike,
            expiration: rec.expiry,
            implied_volatility: Quote::new(rec.bid_iv, rec.ask_iv),
            bid_ask: Quote::new(rec.bid, rec.ask),
            delta: Quote::new(rec.bid_delta, rec.ask_delta),
            gamma: Quote::new(rec.bid_gamma, rec.ask_gamma),
            theta: Quote::new(rec.bid_theta, rec.ask_theta),
            vega: Quote::new(rec.bid_vega, rec.ask_vega),
            multiplier: rec.multiplier,
            right: rec.right,
            amount,
            debit: None,
        }
    }

    /// Build a position from a filtered chain selection. The selection must
    /// identify exactly one contract; anything else is ambiguous or missing.
    pub fn from_chain<'a, I>(records: I, amount: i32) -> Result<Self, PositionError>
    where
        I: IntoIterator<Item = &'a ChainRecord>,
    {
        let mut iter = records.into_iter();
        let first = iter.next().ok_or(PositionError::AmbiguousContract(0))?;
        let extra = iter.count();
        if extra > 0 {
            return Err(PositionError::AmbiguousContract(1 + extra));
        }
        Ok(Self::from_record(first, amount))
    }

    /// Option price: ask when long, bid when short, or the bid/ask midpoint
    /// when `midprice` is requested.
    #[inline]
    pub fn price(&self, midprice: bool) -> f64 {
        if midprice {
            self.bid_ask.mid()
        } else {
            self.bid_ask.for_amount(self.amount)
        }
    }

    /// The debit (credit when short) paid when the position was established,
    /// or the bid/ask midpoint if none was recorded. Always a positive
    /// magnitude; the sign of `amount` says whether it is debit or credit.
    #[inline]
    pub fn debit(&self) -> f64 {
        self.debit.unwrap_or_else(|| self.bid_ask.mid())
    }

    /// Record the actual establishment price. Later calls overwrite nothing.
    pub fn establish(&mut self, price: f64) {
        if self.debit.is_none() {
            self.debit = Some(price.abs());
        }
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta.for_amount(self.amount)
    }

    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma.for_amount(self.amount)
    }

    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta.for_amount(self.amount)
    }

    #[inline]
    pub fn vega(&self) -> f64 {
        self.vega.for_amount(self.amount)
    }

    #[inline]
    pub fn iv(&self) -> f64 {
        self.implied_volatility.for_amount(self.amount)
    }

    /// Independent copy with the IV pair scaled by `iv_change`
    /// (1.03 = +3%, 0.97 = -3%). The original is untouched.
    pub fn with_iv_scaled(&self, iv_change: f64) -> Self {
        let mut copy = self.clone();
        copy.implied_volatility = self.implied_volatility.scaled(iv_change);
        copy
    }
}

impl std::fmt::Display for OptionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} ({})",
            self.amount,
            self.ticker,
            self.right,
            self.strike,
            self.expiration.format("%d %b'%y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ChainRecord {
        ChainRecord {
            symbol: "XYZ".into(),
            contract_id: 1001,
            expiry: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
            strike: 100.0,
            right: Right::Call,
            bid: 1.9,
            ask: 2.1,
            close: Some(2.0),
            multiplier: 100.0,
            bid_delta: 0.48,
            ask_delta: 0.52,
            bid_gamma: 0.030,
            ask_gamma: 0.034,
            bid_theta: -0.05,
            ask_theta: -0.04,
            bid_vega: 0.11,
            ask_vega: 0.13,
            bid_iv: 0.20,
            ask_iv: 0.24,
        }
    }

    #[test]
    fn long_position_selects_ask_side() {
        let opt = OptionPosition::from_record(&sample_record(), 2);
        assert_eq!(opt.price(false), 2.1);
        assert_eq!(opt.delta(), 0.52);
        assert_eq!(opt.gamma(), 0.034);
        assert_eq!(opt.theta(), -0.04);
        assert_eq!(opt.vega(), 0.13);
        assert_eq!(opt.iv(), 0.24);
    }

    #[test]
    fn short_position_selects_bid_side() {
        let opt = OptionPosition::from_record(&sample_record(), -2);
        assert_eq!(opt.price(false), 1.9);
        assert_eq!(opt.delta(), 0.48);
        assert_eq!(opt.gamma(), 0.030);
        assert_eq!(opt.theta(), -0.05);
        assert_eq!(opt.vega(), 0.11);
        assert_eq!(opt.iv(), 0.20);
    }

    #[test]
    fn midprice_ignores_position_sign() {
        let long = OptionPosition::from_record(&sample_record(), 1);
        let short = OptionPosition::from_record(&sample_record(), -1);
        assert!((long.price(true) - 2.0).abs() < 1e-12);
        assert_eq!(long.price(true), short.price(true));
    }

    #[test]
    fn debit_falls_back_to_midpoint_until_established() {
        let mut opt = OptionPosition::from_record(&sample_record(), -1);
        assert!((opt.debit() - 2.0).abs() < 1e-12);
        opt.establish(1.95);
        assert_eq!(opt.debit(), 1.95);
        // set once: a second establishment does not overwrite
        opt.establish(5.0);
        assert_eq!(opt.debit(), 1.95);
    }

    #[test]
    fn iv_scaled_copy_leaves_original_untouched() {
        let opt = OptionPosition::from_record(&sample_record(), 1);
        let bumped = opt.with_iv_scaled(1.03);
        assert!((bumped.implied_volatility.bid - 0.20 * 1.03).abs() < 1e-12);
        assert!((bumped.implied_volatility.ask - 0.24 * 1.03).abs() < 1e-12);
        assert_eq!(opt.implied_volatility, Quote::new(0.20, 0.24));
        // everything else is carried over
        assert_eq!(bumped.strike, opt.strike);
        assert_eq!(bumped.amount, opt.amount);
    }

    #[test]
    fn from_chain_requires_exactly_one_record() {
        let rec = sample_record();
        let one = [rec.clone()];
        assert!(OptionPosition::from_chain(one.iter(), 1).is_ok());

        let none: [ChainRecord; 0] = [];
        assert_eq!(
            OptionPosition::from_chain(none.iter(), 1).unwrap_err(),
            PositionError::AmbiguousContract(0)
        );

        let two = [rec.clone(), rec];
        assert_eq!(
            OptionPosition::from_chain(two.iter(), 1).unwrap_err(),
            PositionError::AmbiguousContract(2)
        );
    }

    #[test]
    fn display_reads_like_an_order() {
        let opt = OptionPosition::from_record(&sample_record(), -1);
        assert_eq!(opt.to_string(), "-1 XYZ call 100 (18 Sep'26)");
    }
}
