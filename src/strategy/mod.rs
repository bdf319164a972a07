pub mod calendar;
pub mod n_calendar;

pub use calendar::CalendarSpread;
pub use n_calendar::NCalendarSpread;

use crate::options::OptionPosition;
use chrono::NaiveDate;

/// Strategy construction and evaluation errors. Construction checks report
/// one distinct variant per violated invariant so a caller can tell a wrong
/// underlying from a wrong strike from a same-expiration pair.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StrategyError {
    #[error("calendar legs must share the same underlying ({near} vs {next})")]
    TickerMismatch { near: String, next: String },

    #[error("calendar legs must share the same strike ({near} vs {next}); use a diagonal spread for mixed strikes")]
    StrikeMismatch { near: f64, next: f64 },

    #[error("calendar legs must have different expirations (both expire {0})")]
    SameExpiration(NaiveDate),

    #[error("calendar legs must have equal size with opposite sign (got {near} and {next})")]
    AmountMismatch { near: i32, next: i32 },

    #[error("calendar legs must share the same right")]
    RightMismatch,

    #[error("cannot build a strategy from an empty list of calendars")]
    NoCalendars,

    #[error("all calendars must share the same underlying ({first} vs {other})")]
    MixedTickers { first: String, other: String },

    #[error("all calendars must share the same near-term expiration")]
    MixedNearTerm,

    #[error("all calendars must share the same next-term expiration")]
    MixedNextTerm,

    #[error("payoff curve crosses zero {0} times; at most two breakevens are supported")]
    TooManyBreakevens(usize),

    #[error("cannot analyze an empty payoff curve")]
    EmptyCurve,

    #[error("implied volatility must be a positive decimal, got {0}")]
    InvalidVolatility(f64),

    #[error("underlying price must be positive, got {0}")]
    InvalidSpot(f64),
}

/// Common contract for option strategies.
///
/// Implementations guarantee a non-empty leg list ordered near-term first,
/// so the provided accessors can lean on that invariant. Evaluation is a
/// pure function of the inputs and the leg data captured at construction.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Legs composing the strategy, near-term expiries first. Never empty.
    fn legs(&self) -> &[OptionPosition];

    /// Shares of the underlying held alongside the options, if any.
    fn underlying_amount(&self) -> i64 {
        0
    }

    /// P/L of the strategy at `date` for each underlying price in `grid`,
    /// with `rate` the risk-free rate and `iv` the underlying implied
    /// volatility as an annualized decimal.
    fn evaluate(&self, grid: &[f64], date: NaiveDate, rate: f64, iv: f64) -> Vec<f64>;

    /// Probability of finishing profitable given an already-evaluated curve.
    /// `spot` is the current underlying price and `t` the horizon in years.
    fn profit_probability(
        &self,
        grid: &[f64],
        curve: &[f64],
        iv: f64,
        spot: f64,
        rate: f64,
        t: f64,
    ) -> Result<f64, StrategyError>;

    /// Ticker of the options composing the strategy.
    fn ticker(&self) -> &str {
        &self.legs()[0].ticker
    }

    /// (min, max) strike across all legs.
    fn strike_bounds(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for leg in self.legs() {
            min = min.min(leg.strike);
            max = max.max(leg.strike);
        }
        (min, max)
    }

    /// Earliest expiration date among the legs.
    fn nearest_expiration(&self) -> NaiveDate {
        self.legs()
            .iter()
            .map(|leg| leg.expiration)
            .min()
            .unwrap_or(NaiveDate::MIN)
    }
}
