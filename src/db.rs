use crate::chain::ChainRecord;
use crate::chain::record::yyyymmdd;
use crate::errors::{AnalyzerError, AnalyzerResult};
use crate::state::DbCommand;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type DbPool = Arc<Mutex<Connection>>;

pub fn init_db(data_dir: &Path) -> AnalyzerResult<DbPool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| AnalyzerError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("optionscope.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;",
    )?;

    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Dedicated DB writer task. Reads commands from a bounded channel and is
/// the ONLY task that writes to the database.
pub async fn run_db_writer(db: DbPool, mut rx: mpsc::Receiver<DbCommand>) {
    tracing::info!("db writer task started");

    while let Some(cmd) = rx.recv().await {
        if let Err(e) = execute_command(&db, cmd) {
            tracing::error!("db write error: {e}");
        }
    }

    tracing::info!("db writer task shutting down");
}

fn execute_command(db: &DbPool, cmd: DbCommand) -> AnalyzerResult<()> {
    let mut conn = db
        .lock()
        .map_err(|e| AnalyzerError::Database(format!("lock poisoned: {e}")))?;

    match cmd {
        DbCommand::InsertUnderlying {
            ticker,
            last,
            iv,
            timestamp,
        } => {
            conn.execute(
                "INSERT INTO underlyings (ticker, last, iv, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![ticker, last, iv, timestamp],
            )?;
        }
        DbCommand::InsertChain {
            ticker,
            timestamp,
            records,
        } => {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO options (ticker, contract_id, \"right\", strike, expiry, bid, ask, bid_iv, ask_iv, close, multiplier, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                )?;
                for rec in &records {
                    stmt.execute(rusqlite::params![
                        ticker,
                        rec.contract_id,
                        right_str(rec),
                        rec.strike,
                        yyyymmdd::to_u32(&rec.expiry).to_string(),
                        rec.bid,
                        rec.ask,
                        rec.bid_iv,
                        rec.ask_iv,
                        rec.close,
                        rec.multiplier,
                        timestamp,
                    ])?;
                }
            }
            tx.commit()?;
        }
        DbCommand::InsertStrategy {
            id,
            kind,
            title,
            author,
            ticker,
            debit,
            legs,
            timestamp,
        } => {
            conn.execute(
                "INSERT INTO strategies (id, kind, title, author, ticker, debit, legs, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![id, kind, title, author, ticker, debit, legs, timestamp],
            )?;
        }
    }
    Ok(())
}

fn right_str(rec: &ChainRecord) -> &'static str {
    match rec.right {
        crate::options::Right::Call => "C",
        crate::options::Right::Put => "P",
    }
}

// ── Query helpers (REST reads -- these lock, but only from the cold path) ──

pub fn get_underlying_history(
    db: &DbPool,
    ticker: &str,
    start: Option<&str>,
    end: Option<&str>,
    limit: usize,
) -> AnalyzerResult<Vec<UnderlyingRow>> {
    let conn = db
        .lock()
        .map_err(|e| AnalyzerError::Database(format!("lock: {e}")))?;

    let mut stmt = conn.prepare(
        "SELECT ticker, last, iv, timestamp FROM underlyings
         WHERE ticker = ?1
           AND (?2 IS NULL OR timestamp >= ?2)
           AND (?3 IS NULL OR timestamp <= ?3)
         ORDER BY timestamp DESC LIMIT ?4",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![ticker, start, end, limit as i64],
        |row| {
            Ok(UnderlyingRow {
                ticker: row.get(0)?,
                last: row.get(1)?,
                iv: row.get(2)?,
                timestamp: row.get(3)?,
            })
        },
    )?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_option_history(
    db: &DbPool,
    ticker: &str,
    right: Option<&str>,
    strike: Option<f64>,
    expiry: Option<u32>,
    samples: usize,
) -> AnalyzerResult<Vec<OptionRow>> {
    let conn = db
        .lock()
        .map_err(|e| AnalyzerError::Database(format!("lock: {e}")))?;

    let mut stmt = conn.prepare(
        "SELECT ticker, contract_id, \"right\", strike, expiry, bid, ask, bid_iv, ask_iv, close, multiplier, timestamp
         FROM options
         WHERE ticker = ?1
           AND (?2 IS NULL OR \"right\" = ?2)
           AND (?3 IS NULL OR strike = ?3)
           AND (?4 IS NULL OR expiry = ?4)
         ORDER BY timestamp DESC LIMIT ?5",
    )?;
    let expiry_str = expiry.map(|e| e.to_string());
    let rows = stmt.query_map(
        rusqlite::params![ticker, right, strike, expiry_str, samples as i64],
        |row| {
            Ok(OptionRow {
                ticker: row.get(0)?,
                contract_id: row.get(1)?,
                right: row.get(2)?,
                strike: row.get(3)?,
                expiry: row.get(4)?,
                bid: row.get(5)?,
                ask: row.get(6)?,
                bid_iv: row.get(7)?,
                ask_iv: row.get(8)?,
                close: row.get(9)?,
                multiplier: row.get(10)?,
                timestamp: row.get(11)?,
            })
        },
    )?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_saved_strategies(
    db: &DbPool,
    ticker: Option<&str>,
    limit: usize,
) -> AnalyzerResult<Vec<StrategyRow>> {
    let conn = db
        .lock()
        .map_err(|e| AnalyzerError::Database(format!("lock: {e}")))?;

    let mut stmt = conn.prepare(
        "SELECT id, kind, title, author, ticker, debit, legs, timestamp FROM strategies
         WHERE (?1 IS NULL OR ticker = ?1)
         ORDER BY timestamp DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(rusqlite::params![ticker, limit as i64], |row| {
        Ok(StrategyRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            title: row.get(2)?,
            author: row.get(3)?,
            ticker: row.get(4)?,
            debit: row.get(5)?,
            legs: row.get(6)?,
            timestamp: row.get(7)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Row types ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct UnderlyingRow {
    pub ticker: String,
    pub last: f64,
    pub iv: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OptionRow {
    pub ticker: String,
    pub contract_id: i64,
    pub right: String,
    pub strike: f64,
    pub expiry: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub bid_iv: Option<f64>,
    pub ask_iv: Option<f64>,
    pub close: Option<f64>,
    pub multiplier: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub author: Option<String>,
    pub ticker: String,
    pub debit: f64,
    pub legs: String,
    pub timestamp: String,
}
