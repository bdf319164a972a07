mod chain;
mod config;
mod db;
mod errors;
mod graph;
mod options;
mod pricing;
mod scan;
mod server;
mod state;
mod strategy;
mod surface;

use crate::state::{AppState, ChainEvent, DbCommand};
use portable_atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Structured logging (line-buffered so container platforms capture it)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("optionscope starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init database
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    // Create bounded channels
    let (ingest_tx, ingest_rx) = mpsc::channel::<ChainEvent>(64);
    let (db_tx, db_rx) = mpsc::channel::<DbCommand>(1024);

    // Create shared state
    let app_state = AppState::new(cfg.clone(), db_pool.clone(), db_tx.clone());

    // ── Spawn tasks ──

    // 1. DB writer task (dedicated, owns all database writes)
    let db_pool_writer = db_pool.clone();
    tokio::spawn(async move {
        db::run_db_writer(db_pool_writer, db_rx).await;
    });

    // 2. Chain sources: offline CSV import, or one live feed per underlying
    if let Some(import_dir) = cfg.chain_import_dir.clone() {
        tracing::info!(dir = %import_dir.display(), "offline mode, loading chains from CSV");
        for ticker in &cfg.tickers {
            let path = import_dir.join(format!("{ticker}.csv"));
            match chain::import::load_records(&path) {
                Ok(records) => {
                    let snapshot = chain::ChainSnapshot {
                        ticker: ticker.clone(),
                        // offline files carry no underlying data; analysis
                        // callers supply spot/iv overrides instead
                        last: 0.0,
                        iv: 0.0,
                        timestamp: chrono::Utc::now(),
                        records,
                    };
                    if ingest_tx
                        .send(ChainEvent::Snapshot(Box::new(snapshot)))
                        .await
                        .is_err()
                    {
                        tracing::error!("ingest channel closed during import");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(ticker = %ticker, path = %path.display(), "chain import failed: {e}");
                }
            }
        }
    } else {
        for ticker in &cfg.tickers {
            let feed_tx = ingest_tx.clone();
            let ticker = ticker.clone();
            let api_key = cfg.chain_api_key.clone();
            let base_url = cfg.chain_api_base_url.clone();
            let poll = cfg.poll_interval_secs;
            tokio::spawn(async move {
                chain::feed::run_chain_feed(ticker, api_key, base_url, poll, feed_tx).await;
            });
        }
    }

    // 3. Ingest loop (publishes snapshots, queues DB writes)
    let ingest_state = app_state.clone();
    tokio::spawn(async move {
        run_ingest(ingest_state, ingest_rx).await;
    });

    // 4. Axum HTTP server
    let server_state = app_state.clone();
    let port = cfg.server_port;

    let app = axum::Router::new()
        .route("/api/chain/{ticker}", axum::routing::get(server::routes::get_chain))
        .route("/api/underlying/{ticker}", axum::routing::get(server::routes::get_underlying))
        .route("/api/options/{ticker}", axum::routing::get(server::routes::get_options))
        .route("/api/analyze/calendar", axum::routing::post(server::routes::analyze_calendar))
        .route("/api/analyze/n-calendar", axum::routing::post(server::routes::analyze_n_calendar))
        .route("/api/scan/{ticker}", axum::routing::get(server::routes::scan_calendars))
        .route("/api/surface/{ticker}", axum::routing::get(server::routes::get_surface))
        .route(
            "/api/strategies",
            axum::routing::get(server::routes::get_strategies)
                .post(server::routes::save_strategy),
        )
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(server_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

/// Ingest loop: receives chain snapshots from the feeds, publishes the
/// latest per ticker for the API, and queues database writes.
async fn run_ingest(state: Arc<AppState>, mut rx: mpsc::Receiver<ChainEvent>) {
    tracing::info!("ingest task started");

    while let Some(event) = rx.recv().await {
        match event {
            ChainEvent::Snapshot(snapshot) => {
                state.counters.chains_fetched.fetch_add(1, Ordering::Relaxed);

                let ticker = snapshot.ticker.clone();
                let timestamp = snapshot.timestamp.to_rfc3339();
                let record_count = snapshot.records.len() as u64;

                let underlying = DbCommand::InsertUnderlying {
                    ticker: ticker.clone(),
                    last: snapshot.last,
                    iv: (snapshot.iv > 0.0).then_some(snapshot.iv),
                    timestamp: timestamp.clone(),
                };
                let chain_cmd = DbCommand::InsertChain {
                    ticker: ticker.clone(),
                    timestamp,
                    records: snapshot.records.clone(),
                };

                // Mirror the chain to CSV if an export directory is set
                if let Some(dir) = &state.config.chain_export_dir {
                    let path = dir.join(format!("{ticker}.csv"));
                    if let Err(e) = std::fs::create_dir_all(dir)
                        .map_err(Into::into)
                        .and_then(|()| chain::import::save_records(&path, &snapshot.records))
                    {
                        tracing::warn!(ticker = %ticker, "chain export failed: {e}");
                    }
                }

                // Publish before persisting so the API sees fresh data even
                // if the writer falls behind
                state.chains_tx.send_modify(|store| {
                    store.insert(ticker.clone(), *snapshot);
                });

                let mut queued = true;
                if state.db_tx.send(underlying).await.is_err() {
                    queued = false;
                }
                if state.db_tx.send(chain_cmd).await.is_err() {
                    queued = false;
                }

                if queued {
                    state
                        .counters
                        .records_stored
                        .fetch_add(record_count, Ordering::Relaxed);
                } else {
                    state.counters.errors_recovered.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(ticker = %ticker, "db channel closed, snapshot not persisted");
                }

                tracing::info!(
                    ticker = %ticker,
                    contracts = record_count,
                    "chain snapshot ingested"
                );
            }
        }
    }

    tracing::info!("ingest task shutting down");
}
