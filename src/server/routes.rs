use crate::chain::record::yyyymmdd;
use crate::db;
use crate::graph;
use crate::options::{OptionPosition, Right};
use crate::pricing::probability;
use crate::scan;
use crate::state::{AppState, DbCommand};
use crate::strategy::{CalendarSpread, NCalendarSpread, Strategy};
use crate::surface;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use portable_atomic::Ordering;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<usize>,
}

#[derive(serde::Deserialize)]
pub struct OptionsQuery {
    pub right: Option<String>,
    pub strike: Option<f64>,
    pub expiry: Option<u32>,
    pub samples: Option<usize>,
}

#[derive(serde::Deserialize)]
pub struct ScanQuery {
    pub near: u32,
    pub next: u32,
    pub right: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct StrategiesQuery {
    pub ticker: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/chain/{ticker} -- latest in-memory snapshot (no lock, no DB)
pub async fn get_chain(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    match state.latest_chain(&ticker.to_uppercase()) {
        Some(snapshot) => Json(serde_json::json!({ "chain": snapshot })),
        None => Json(serde_json::json!({ "error": format!("no snapshot for {ticker}") })),
    }
}

/// GET /api/underlying/{ticker} -- stored close/IV history (cold path)
pub async fn get_underlying(
    Path(ticker): Path<String>,
    Query(params): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(100).min(1000);
    match db::get_underlying_history(
        &state.db,
        &ticker.to_uppercase(),
        params.start.as_deref(),
        params.end.as_deref(),
        limit,
    ) {
        Ok(rows) => Json(serde_json::json!({ "underlying": rows })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/options/{ticker} -- stored contract history (cold path)
pub async fn get_options(
    Path(ticker): Path<String>,
    Query(params): Query<OptionsQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    if let Some(r) = params.right.as_deref() {
        if Right::parse(r).is_none() {
            return Json(serde_json::json!({
                "error": "wrong right format: use 'C' for calls or 'P' for puts"
            }));
        }
    }
    if let Some(strike) = params.strike {
        if strike <= 0.0 {
            return Json(serde_json::json!({ "error": "wrong strike format: must be positive" }));
        }
    }
    if let Some(expiry) = params.expiry {
        if yyyymmdd::from_u32(expiry).is_none() {
            return Json(serde_json::json!({ "error": "wrong expiry format: use YYYYMMDD" }));
        }
    }

    let samples = params.samples.unwrap_or(1).min(1000);
    let right = params.right.as_deref().map(|r| r.to_uppercase());
    match db::get_option_history(
        &state.db,
        &ticker.to_uppercase(),
        right.as_deref(),
        params.strike,
        params.expiry,
        samples,
    ) {
        Ok(rows) => Json(serde_json::json!({ "options": rows })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

// ── Calendar analysis ──

#[derive(serde::Deserialize)]
pub struct AnalyzeCalendarRequest {
    pub ticker: String,
    pub near_expiry: u32,
    pub next_expiry: u32,
    pub strike: f64,
    /// "C" or "P"
    pub right: String,
    /// Calendar count; near leg is short, next leg long. Default 1.
    pub amount: Option<i32>,
    /// Evaluation date for the P/L curve, YYYYMMDD. Default: near expiry.
    pub eval_date: Option<u32>,
    /// Extra evaluation dates (YYYYMMDD) for a multi-date risk graph.
    pub dates: Option<Vec<u32>>,
    /// Underlying IV override, annualized decimal. Default: snapshot IV.
    pub iv: Option<f64>,
    /// IV scenario multiplier applied to both legs (1.03 = +3%).
    pub iv_change: Option<f64>,
    /// Underlying price override. Default: snapshot last.
    pub spot: Option<f64>,
    /// Risk-free rate override, annualized decimal.
    pub rate: Option<f64>,
    /// Actual fill prices, when analyzing an established position.
    pub near_debit: Option<f64>,
    pub next_debit: Option<f64>,
}

/// POST /api/analyze/calendar -- build a calendar from the latest chain and
/// return its P/L curve, breakevens, and profit probability.
pub async fn analyze_calendar(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeCalendarRequest>,
) -> Json<serde_json::Value> {
    state.counters.analyses_served.fetch_add(1, Ordering::Relaxed);

    let ticker = req.ticker.to_uppercase();
    let snapshot = match state.latest_chain(&ticker) {
        Some(s) => s,
        None => return Json(serde_json::json!({ "error": format!("no snapshot for {ticker}") })),
    };

    let right = match Right::parse(&req.right) {
        Some(r) => r,
        None => {
            return Json(serde_json::json!({
                "error": "wrong right format: use 'C' for calls or 'P' for puts"
            }))
        }
    };
    let (near_expiry, next_expiry) = match (
        yyyymmdd::from_u32(req.near_expiry),
        yyyymmdd::from_u32(req.next_expiry),
    ) {
        (Some(a), Some(b)) => (a, b),
        _ => return Json(serde_json::json!({ "error": "wrong expiry format: use YYYYMMDD" })),
    };

    let amount = req.amount.unwrap_or(1);
    let iv_change = req.iv_change.unwrap_or(1.0);
    let mut near = match OptionPosition::from_chain(
        snapshot.select(near_expiry, req.strike, right),
        -amount,
    ) {
        Ok(p) => p.with_iv_scaled(iv_change),
        Err(e) => return Json(serde_json::json!({ "error": format!("near-term leg: {e}") })),
    };
    let mut next = match OptionPosition::from_chain(
        snapshot.select(next_expiry, req.strike, right),
        amount,
    ) {
        Ok(p) => p.with_iv_scaled(iv_change),
        Err(e) => return Json(serde_json::json!({ "error": format!("next-term leg: {e}") })),
    };
    if let Some(d) = req.near_debit {
        near.establish(d);
    }
    if let Some(d) = req.next_debit {
        next.establish(d);
    }

    let spread = match CalendarSpread::new(near, next) {
        Ok(s) => s,
        Err(e) => return Json(serde_json::json!({ "error": e.to_string() })),
    };

    let eval_date = req
        .eval_date
        .and_then(yyyymmdd::from_u32)
        .unwrap_or_else(|| spread.near_term().expiration);
    let rate = req.rate.unwrap_or(state.config.risk_free_rate);
    let iv = req.iv.unwrap_or(snapshot.iv) * iv_change;
    let spot = req.spot.unwrap_or(snapshot.last);

    let (min_strike, max_strike) = spread.strike_bounds();
    let prices = graph::price_grid(min_strike, max_strike, graph::GRID_POINTS);
    let pnl = spread.evaluate(&prices, eval_date, rate, iv);
    let breakevens = probability::breakevens(&prices, &pnl);

    // horizon for the settlement distribution: today to the near expiry
    let today = chrono::Utc::now().date_naive();
    let t = ((spread.near_term().expiration - today).num_days().max(0)) as f64 / 365.0;

    let (p_profit, p_error) = match spread.profit_probability(&prices, &pnl, iv, spot, rate, t) {
        Ok(p) => (Some(p), None),
        Err(e) => (None, Some(e.to_string())),
    };

    // optional curve family across extra dates for plotting
    let family = req.dates.as_ref().map(|raw| {
        let dates: Vec<NaiveDate> = raw.iter().filter_map(|&d| yyyymmdd::from_u32(d)).collect();
        graph::risk_graph(&spread, &dates, rate, iv)
    });

    Json(serde_json::json!({
        "ticker": ticker,
        "strategy": spread.name(),
        "description": spread.to_string(),
        "legs": [spread.near_term().to_string(), spread.next_term().to_string()],
        "strike": spread.strike(),
        "underlying_amount": spread.underlying_amount(),
        "debit": spread.debit,
        "greeks": {
            "delta": spread.delta,
            "gamma": spread.gamma,
            "theta": spread.theta,
            "vega": spread.vega,
        },
        "near_term_iv": spread.near_term().iv(),
        "next_term_iv": spread.next_term().iv(),
        "eval_date": yyyymmdd::to_u32(&eval_date),
        "iv": iv,
        "spot": spot,
        "rate": rate,
        "prices": prices,
        "pnl": pnl,
        "breakevens": breakevens.as_slice(),
        "profit_probability": p_profit,
        "profit_probability_error": p_error,
        "risk_graph": family,
    }))
}

#[derive(serde::Deserialize)]
pub struct AnalyzeNCalendarRequest {
    pub ticker: String,
    pub near_expiry: u32,
    pub next_expiry: u32,
    /// One calendar per strike, all sharing the expiry pair.
    pub strikes: Vec<f64>,
    /// "C" or "P"
    pub right: String,
    pub amount: Option<i32>,
    pub eval_date: Option<u32>,
    pub iv: Option<f64>,
    pub spot: Option<f64>,
    pub rate: Option<f64>,
}

/// POST /api/analyze/n-calendar -- double/triple/... calendar built from one
/// calendar per requested strike.
pub async fn analyze_n_calendar(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeNCalendarRequest>,
) -> Json<serde_json::Value> {
    state.counters.analyses_served.fetch_add(1, Ordering::Relaxed);

    let ticker = req.ticker.to_uppercase();
    let snapshot = match state.latest_chain(&ticker) {
        Some(s) => s,
        None => return Json(serde_json::json!({ "error": format!("no snapshot for {ticker}") })),
    };

    let right = match Right::parse(&req.right) {
        Some(r) => r,
        None => {
            return Json(serde_json::json!({
                "error": "wrong right format: use 'C' for calls or 'P' for puts"
            }))
        }
    };
    let (near_expiry, next_expiry) = match (
        yyyymmdd::from_u32(req.near_expiry),
        yyyymmdd::from_u32(req.next_expiry),
    ) {
        (Some(a), Some(b)) => (a, b),
        _ => return Json(serde_json::json!({ "error": "wrong expiry format: use YYYYMMDD" })),
    };

    let amount = req.amount.unwrap_or(1);
    let mut calendars = Vec::with_capacity(req.strikes.len());
    for &strike in &req.strikes {
        let near =
            match OptionPosition::from_chain(snapshot.select(near_expiry, strike, right), -amount)
            {
                Ok(p) => p,
                Err(e) => {
                    return Json(serde_json::json!({
                        "error": format!("near-term leg at strike {strike}: {e}")
                    }))
                }
            };
        let next =
            match OptionPosition::from_chain(snapshot.select(next_expiry, strike, right), amount) {
                Ok(p) => p,
                Err(e) => {
                    return Json(serde_json::json!({
                        "error": format!("next-term leg at strike {strike}: {e}")
                    }))
                }
            };
        match CalendarSpread::new(near, next) {
            Ok(c) => calendars.push(c),
            Err(e) => {
                return Json(serde_json::json!({
                    "error": format!("calendar at strike {strike}: {e}")
                }))
            }
        }
    }

    let spread = match NCalendarSpread::new(calendars) {
        Ok(s) => s,
        Err(e) => return Json(serde_json::json!({ "error": e.to_string() })),
    };

    let eval_date = req
        .eval_date
        .and_then(yyyymmdd::from_u32)
        .unwrap_or(spread.near_term_exp);
    let rate = req.rate.unwrap_or(state.config.risk_free_rate);
    let iv = req.iv.unwrap_or(snapshot.iv);
    let spot = req.spot.unwrap_or(snapshot.last);

    let (min_strike, max_strike) = spread.strike_bounds();
    let prices = graph::price_grid(min_strike, max_strike, graph::GRID_POINTS);
    let pnl = spread.evaluate(&prices, eval_date, rate, iv);
    let breakevens = probability::breakevens(&prices, &pnl);

    let today = chrono::Utc::now().date_naive();
    let t = ((spread.near_term_exp - today).num_days().max(0)) as f64 / 365.0;
    let (p_profit, p_error) = match spread.profit_probability(&prices, &pnl, iv, spot, rate, t) {
        Ok(p) => (Some(p), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(serde_json::json!({
        "ticker": ticker,
        "strategy": spread.name(),
        "calendars": spread
            .calendars()
            .iter()
            .map(|c| serde_json::json!({
                "description": c.to_string(),
                "strike": c.strike(),
                "debit": c.debit,
            }))
            .collect::<Vec<_>>(),
        "near_expiry": yyyymmdd::to_u32(&spread.near_term_exp),
        "next_expiry": yyyymmdd::to_u32(&spread.next_term_exp),
        "debit": spread.debit(),
        "eval_date": yyyymmdd::to_u32(&eval_date),
        "iv": iv,
        "spot": spot,
        "rate": rate,
        "prices": prices,
        "pnl": pnl,
        "breakevens": breakevens.as_slice(),
        "profit_probability": p_profit,
        "profit_probability_error": p_error,
    }))
}

/// GET /api/scan/{ticker} -- per-strike calendar debits for an expiry pair
pub async fn scan_calendars(
    Path(ticker): Path<String>,
    Query(params): Query<ScanQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let ticker = ticker.to_uppercase();
    let snapshot = match state.latest_chain(&ticker) {
        Some(s) => s,
        None => return Json(serde_json::json!({ "error": format!("no snapshot for {ticker}") })),
    };

    let right = match params.right.as_deref().map_or(Some(Right::Call), Right::parse) {
        Some(r) => r,
        None => {
            return Json(serde_json::json!({
                "error": "wrong right format: use 'C' for calls or 'P' for puts"
            }))
        }
    };
    let (near, next) = match (
        yyyymmdd::from_u32(params.near),
        yyyymmdd::from_u32(params.next),
    ) {
        (Some(a), Some(b)) => (a, b),
        _ => return Json(serde_json::json!({ "error": "wrong expiry format: use YYYYMMDD" })),
    };

    let quotes = scan::calendar_debits(&snapshot, near, next, right);
    Json(serde_json::json!({
        "ticker": ticker,
        "expiries": scan::quoted_expiries(&snapshot, right)
            .iter()
            .map(yyyymmdd::to_u32)
            .collect::<Vec<_>>(),
        "calendars": quotes,
    }))
}

/// GET /api/surface/{ticker} -- IV-surface points from the latest snapshot
pub async fn get_surface(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let ticker = ticker.to_uppercase();
    match state.latest_chain(&ticker) {
        Some(snapshot) => {
            let as_of = snapshot.timestamp.date_naive();
            let points = surface::surface_points(&snapshot.records, as_of);
            Json(serde_json::json!({ "ticker": ticker, "points": points }))
        }
        None => Json(serde_json::json!({ "error": format!("no snapshot for {ticker}") })),
    }
}

// ── Saved strategies ──

#[derive(serde::Deserialize)]
pub struct SaveStrategyRequest {
    pub kind: String,
    pub title: String,
    pub author: Option<String>,
    pub ticker: String,
    pub debit: f64,
    /// Contract ids composing the strategy.
    pub legs: Vec<i64>,
}

/// POST /api/strategies -- persist a strategy for later tracking
pub async fn save_strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveStrategyRequest>,
) -> Json<serde_json::Value> {
    let id = uuid::Uuid::new_v4().to_string();
    let legs = serde_json::to_string(&req.legs).unwrap_or_else(|_| "[]".into());
    let cmd = DbCommand::InsertStrategy {
        id: id.clone(),
        kind: req.kind,
        title: req.title,
        author: req.author,
        ticker: req.ticker.to_uppercase(),
        debit: req.debit,
        legs,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    match state.db_tx.send(cmd).await {
        Ok(()) => Json(serde_json::json!({ "id": id })),
        Err(e) => Json(serde_json::json!({ "error": format!("db channel closed: {e}") })),
    }
}

/// GET /api/strategies -- previously saved strategies
pub async fn get_strategies(
    Query(params): Query<StrategiesQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(50).min(200);
    let ticker = params.ticker.map(|t| t.to_uppercase());
    match db::get_saved_strategies(&state.db, ticker.as_deref(), limit) {
        Ok(rows) => Json(serde_json::json!({ "strategies": rows })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "chains_fetched": state.counters.chains_fetched.load(Relaxed),
        "records_stored": state.counters.records_stored.load(Relaxed),
        "analyses_served": state.counters.analyses_served.load(Relaxed),
        "errors_recovered": state.counters.errors_recovered.load(Relaxed),
    }))
}
