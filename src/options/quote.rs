use serde::{Deserialize, Serialize};

/// A (bid, ask) market quote pair.
///
/// Price, implied volatility, and all four greeks arrive as bid/ask pairs,
/// and every one of them resolves the same way: a long position pays the
/// ask side, a short position receives the bid side. The selector lives
/// here once instead of being repeated per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    #[inline]
    pub const fn new(bid: f64, ask: f64) -> Self {
        Self { bid, ask }
    }

    /// Bid/ask midpoint.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Effective value for a position of the given signed size:
    /// ask side when long (amount >= 0), bid side when short.
    #[inline]
    pub fn for_amount(&self, amount: i32) -> f64 {
        if amount >= 0 {
            self.ask
        } else {
            self.bid
        }
    }

    /// Both sides multiplied by `factor`. Used for volatility scenarios.
    #[inline]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            bid: self.bid * factor,
            ask: self.ask * factor,
        }
    }
}

/// Option right: call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Right {
    #[serde(rename = "C")]
    Call,
    #[serde(rename = "P")]
    Put,
}

impl Right {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}
