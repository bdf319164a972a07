use crate::chain::ChainSnapshot;
use crate::config::AppConfig;
use crate::db::DbPool;
use portable_atomic::AtomicU64;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

// ── Messages INTO the ingest loop (bounded channels) ──

#[derive(Debug)]
pub enum ChainEvent {
    Snapshot(Box<ChainSnapshot>),
}

// ── DB Commands (sent to the writer task via bounded channel) ──

#[derive(Debug)]
pub enum DbCommand {
    InsertUnderlying {
        ticker: String,
        last: f64,
        iv: Option<f64>,
        timestamp: String,
    },
    InsertChain {
        ticker: String,
        timestamp: String,
        records: Vec<crate::chain::ChainRecord>,
    },
    InsertStrategy {
        id: String,
        kind: String,
        title: String,
        author: Option<String>,
        ticker: String,
        debit: f64,
        /// JSON array of the contract ids composing the strategy.
        legs: String,
        timestamp: String,
    },
}

/// Latest chain snapshot per ticker, published over the watch channel.
pub type ChainStore = HashMap<String, ChainSnapshot>;

// ── Performance counters (lock-free) ──

pub struct PerfCounters {
    pub chains_fetched: AtomicU64,
    pub records_stored: AtomicU64,
    pub analyses_served: AtomicU64,
    pub errors_recovered: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            chains_fetched: AtomicU64::new(0),
            records_stored: AtomicU64::new(0),
            analyses_served: AtomicU64::new(0),
            errors_recovered: AtomicU64::new(0),
        }
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,

    // Ingest -> API: latest snapshots (watch = single producer, multi consumer)
    pub chains_tx: watch::Sender<ChainStore>,
    pub chains_rx: watch::Receiver<ChainStore>,

    // Ingest -> DB writer: bounded command channel
    pub db_tx: mpsc::Sender<DbCommand>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, db_tx: mpsc::Sender<DbCommand>) -> Arc<Self> {
        let (chains_tx, chains_rx) = watch::channel(ChainStore::new());

        Arc::new(Self {
            config,
            db,
            chains_tx,
            chains_rx,
            db_tx,
            counters: PerfCounters::new(),
        })
    }

    /// Latest snapshot for a ticker, if the feed has delivered one yet.
    pub fn latest_chain(&self, ticker: &str) -> Option<ChainSnapshot> {
        self.chains_rx.borrow().get(ticker).cloned()
    }
}
