use crate::options::OptionPosition;
use crate::pricing::probability;
use crate::strategy::{CalendarSpread, Strategy, StrategyError};
use chrono::NaiveDate;

/// N calendar spreads grouped into one position (double, triple, ...
/// calendars). All constituents must share the underlying and both
/// expiration dates; only the strikes differ.
///
/// The combined P/L curve is the sum of the constituent calendar curves,
/// and profit probability runs the usual breakeven analysis on that summed
/// curve.
#[derive(Debug, Clone)]
pub struct NCalendarSpread {
    calendars: Vec<CalendarSpread>,
    /// All constituent legs flattened, near-term legs first.
    legs: Vec<OptionPosition>,
    pub near_term_exp: NaiveDate,
    pub next_term_exp: NaiveDate,
}

impl NCalendarSpread {
    pub fn new(calendars: Vec<CalendarSpread>) -> Result<Self, StrategyError> {
        let first = calendars.first().ok_or(StrategyError::NoCalendars)?;
        let ticker = first.ticker().to_string();
        let near_term_exp = first.near_term().expiration;
        let next_term_exp = first.next_term().expiration;

        for cal in &calendars {
            if cal.ticker() != ticker {
                return Err(StrategyError::MixedTickers {
                    first: ticker,
                    other: cal.ticker().to_string(),
                });
            }
            if cal.near_term().expiration != near_term_exp {
                return Err(StrategyError::MixedNearTerm);
            }
            if cal.next_term().expiration != next_term_exp {
                return Err(StrategyError::MixedNextTerm);
            }
        }

        let mut legs = Vec::with_capacity(calendars.len() * 2);
        legs.extend(calendars.iter().map(|c| c.near_term().clone()));
        legs.extend(calendars.iter().map(|c| c.next_term().clone()));

        Ok(Self {
            calendars,
            legs,
            near_term_exp,
            next_term_exp,
        })
    }

    #[inline]
    pub fn calendars(&self) -> &[CalendarSpread] {
        &self.calendars
    }

    /// Net debit across all constituent calendars.
    pub fn debit(&self) -> f64 {
        self.calendars.iter().map(|c| c.debit).sum()
    }
}

impl Strategy for NCalendarSpread {
    fn name(&self) -> &'static str {
        "N Calendar Spread"
    }

    fn legs(&self) -> &[OptionPosition] {
        &self.legs
    }

    fn evaluate(&self, grid: &[f64], date: NaiveDate, rate: f64, iv: f64) -> Vec<f64> {
        let mut curve = vec![0.0; grid.len()];
        for cal in &self.calendars {
            for (y, v) in curve.iter_mut().zip(cal.evaluate(grid, date, rate, iv)) {
                *y += v;
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
