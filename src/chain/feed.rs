use crate::chain::{ChainRecord, ChainSnapshot};
use crate::errors::{AnalyzerError, AnalyzerResult};
use crate::state::ChainEvent;
use reqwest::Client;
use tokio::sync::mpsc;

/// Option-chain REST feed. Polls one underlying's chain at a configurable
/// interval and hands snapshots to the ingest loop via bounded channel.
pub async fn run_chain_feed(
    ticker: String,
    api_key: String,
    base_url: String,
    poll_interval_secs: u64,
    ingest_tx: mpsc::Sender<ChainEvent>,
) {
    tracing::info!(ticker = %ticker, "chain feed started");

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .unwrap_or_default();

    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(poll_interval_secs.max(1)));
    let mut consecutive_errors: u32 = 0;

    loop {
        interval.tick().await;

        match fetch_chain(&client, &api_key, &base_url, &ticker).await {
            Ok(snapshot) => {
                consecutive_errors = 0;
                tracing::debug!(
                    ticker = %ticker,
                    contracts = snapshot.records.len(),
                    last = snapshot.last,
                    "chain snapshot fetched"
                );

                if ingest_tx
                    .send(ChainEvent::Snapshot(Box::new(snapshot)))
                    .await
                    .is_err()
                {
                    tracing::error!(ticker = %ticker, "ingest channel closed, chain feed shutting down");
                    return;
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                tracing::warn!(
                    ticker = %ticker,
                    error = %e,
                    consecutive = consecutive_errors,
                    "chain fetch failed"
                );

                // Exponential backoff on repeated failures (cap at 5 min)
                if consecutive_errors > 3 {
                    let backoff = std::cmp::min(consecutive_errors * 30, 300);
                    tokio::time::sleep(tokio::time::Duration::from_secs(backoff as u64)).await;
                }
            }
        }
    }
}

// Expected chain endpoint response:
// {
//   "underlying": { "symbol": "SPY", "last": 514.23, "iv": 0.182 },
//   "contracts": [
//     { "symbol": "SPY", "contract_id": 812, "expiry": 20260918,
//       "strike": 510.0, "right": "C", "bid": 12.1, "ask": 12.4,
//       "close": 12.2, "multiplier": 100,
//       "bid_delta": 0.52, "ask_delta": 0.55, ... }
//   ]
// }

#[derive(serde::Deserialize)]
struct ChainApiResponse {
    underlying: Option<UnderlyingData>,
    contracts: Option<Vec<ChainRecord>>,
}

#[derive(serde::Deserialize)]
struct UnderlyingData {
    #[allow(dead_code)]
    symbol: Option<String>,
    last: Option<f64>,
    iv: Option<f64>,
}

async fn fetch_chain(
    client: &Client,
    api_key: &str,
    base_url: &str,
    ticker: &str,
) -> AnalyzerResult<ChainSnapshot> {
    let url = format!("{}/chains/{}", base_url.trim_end_matches('/'), ticker);

    let resp = client
        .get(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .send()
        .await
        .map_err(|e| AnalyzerError::ChainFeed(format!("request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AnalyzerError::ChainFeed(format!("HTTP {status}: {body}")));
    }

    let data: ChainApiResponse = resp
        .json()
        .await
        .map_err(|e| AnalyzerError::ChainFeed(format!("parse: {e}")))?;

    let underlying = data
        .underlying
        .ok_or_else(|| AnalyzerError::ChainFeed("no underlying in response".into()))?;
    let last = underlying
        .last
        .ok_or_else(|| AnalyzerError::ChainFeed("no underlying last price".into()))?;
    if last <= 0.0 || !last.is_finite() {
        return Err(AnalyzerError::ChainFeed(format!("invalid last price: {last}")));
    }

    let records = data.contracts.unwrap_or_default();
    if records.is_empty() {
        return Err(AnalyzerError::ChainFeed("zero contracts retrieved".into()));
    }

    Ok(ChainSnapshot {
        ticker: ticker.to_string(),
        last,
        iv: underlying.iv.unwrap_or(0.0),
        timestamp: chrono::Utc::now(),
        records,
    })
}
