use crate::strategy::StrategyError;

/// Service-level error types for the analyzer.
/// Feed and API failures are recoverable; the service keeps polling and
/// serving. Strategy construction errors pass through untouched so the
/// caller can tell exactly which invariant its inputs violated.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("chain feed error: {0}")]
    ChainFeed(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("file error: {0}")]
    File(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(e: reqwest::Error) -> Self {
        AnalyzerError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(e: serde_json::Error) -> Self {
        AnalyzerError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for AnalyzerError {
    fn from(e: rusqlite::Error) -> Self {
        AnalyzerError::Database(e.to_string())
    }
}

impl From<csv::Error> for AnalyzerError {
    fn from(e: csv::Error) -> Self {
        AnalyzerError::File(e.to_string())
    }
}

impl From<std::io::Error> for AnalyzerError {
    fn from(e: std::io::Error) -> Self {
        AnalyzerError::File(e.to_string())
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
