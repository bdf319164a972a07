use crate::options::Right;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row of an option chain: a single contract's quotes and greeks.
/// This is the tabular record shape shared by the REST feed, CSV files,
/// and the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRecord {
    pub symbol: String,
    pub contract_id: i64,
    #[serde(with = "yyyymmdd")]
    pub expiry: NaiveDate,
    pub strike: f64,
    pub right: Right,
    pub bid: f64,
    pub ask: f64,
    pub close: Option<f64>,
    pub multiplier: f64,
    pub bid_delta: f64,
    pub ask_delta: f64,
    pub bid_gamma: f64,
    pub ask_gamma: f64,
    pub bid_theta: f64,
    pub ask_theta: f64,
    pub bid_vega: f64,
    pub ask_vega: f64,
    pub bid_iv: f64,
    pub ask_iv: f64,
}

/// A full option-chain snapshot for one underlying at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub ticker: String,
    /// Underlying last price.
    pub last: f64,
    /// Underlying implied volatility, annualized decimal.
    pub iv: f64,
    pub timestamp: DateTime<Utc>,
    pub records: Vec<ChainRecord>,
}

impl ChainSnapshot {
    /// Contracts matching the given expiry, strike, and right.
    pub fn select(&self, expiry: NaiveDate, strike: f64, right: Right) -> Vec<&ChainRecord> {
        self.records
            .iter()
            .filter(|r| r.expiry == expiry && r.strike == strike && r.right == right)
            .collect()
    }
}

/// Expiry dates on the wire and in files are YYYYMMDD integers.
pub mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u32(to_u32(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
        let raw = u32::deserialize(de)?;
        from_u32(raw).ok_or_else(|| de::Error::custom(format!("invalid YYYYMMDD date: {raw}")))
    }

    pub fn to_u32(date: &NaiveDate) -> u32 {
        use chrono::Datelike;
        date.year() as u32 * 10_000 + date.month() * 100 + date.day()
    }

    pub fn from_u32(raw: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt((raw / 10_000) as i32, raw / 100 % 100, raw % 100)
    }
}
