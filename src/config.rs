use crate::errors::{AnalyzerError, AnalyzerResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Underlyings whose option chains are polled and stored.
    pub tickers: Vec<String>,
    pub chain_api_base_url: String,
    pub chain_api_key: String,
    pub poll_interval_secs: u64,
    /// Annualized risk-free rate as a decimal (3-month T-bill or similar).
    pub risk_free_rate: f64,
    pub data_dir: PathBuf,
    /// Offline mode: load `<dir>/<ticker>.csv` chains at startup instead of
    /// polling the feed.
    pub chain_import_dir: Option<PathBuf>,
    /// Mirror every ingested chain to `<dir>/<ticker>.csv`.
    pub chain_export_dir: Option<PathBuf>,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> AnalyzerResult<Self> {
        dotenvy::dotenv().ok();

        let tickers: Vec<String> = env_var_or("TICKERS", "SPY")
            .split(',')
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tickers.is_empty() {
            return Err(AnalyzerError::Config("TICKERS: empty list".into()));
        }

        let poll_interval_secs = env_var_or("CHAIN_POLL_INTERVAL_SECS", "60")
            .parse::<u64>()
            .map_err(|e| AnalyzerError::Config(format!("CHAIN_POLL_INTERVAL_SECS: {e}")))?;

        let risk_free_rate = env_var_or("RISK_FREE_RATE", "0.01")
            .parse::<f64>()
            .map_err(|e| AnalyzerError::Config(format!("RISK_FREE_RATE: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| AnalyzerError::Config(format!("SERVER_PORT: {e}")))?;

        let chain_import_dir = std::env::var("CHAIN_IMPORT_DIR").ok().map(PathBuf::from);
        let chain_export_dir = std::env::var("CHAIN_EXPORT_DIR").ok().map(PathBuf::from);

        // the feed key is only needed when actually polling
        let chain_api_key = if chain_import_dir.is_some() {
            env_var_or("CHAIN_API_KEY", "")
        } else {
            env_var("CHAIN_API_KEY")?
        };

        Ok(Self {
            tickers,
            chain_api_base_url: env_var_or("CHAIN_API_BASE_URL", "http://localhost:8200/v1"),
            chain_api_key,
            poll_interval_secs,
            risk_free_rate,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            chain_import_dir,
            chain_export_dir,
            server_port,
        })
    }
}

fn env_var(key: &str) -> AnalyzerResult<String> {
    std::env::var(key).map_err(|_| AnalyzerError::Config(format!("missing env var: {key}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
