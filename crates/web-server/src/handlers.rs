use crate::{AppState, error::AppError};
use analytics::{ReturnRiskReport, analyze_return_risk};
use axum::{
    Json,
    extract::{Query, State},
};
use backtester::{PairsBacktester, RsiBacktestResult, RsiBacktester, SpreadBacktestResult};
use chrono::NaiveDate;
use configuration::{
    CorrelationParams, ReturnRiskParams, RollingCorrelationParams, RsiParams, SpreadParams,
};
use core_types::{CorrelationBasis, Interval};
use correlation::{
    CorrelationError, CorrelationMatrix, RollingCorrelationResult, correlation_matrix,
    rolling_correlation,
};
use market_data::{fetch_panel, fetch_pair, normalize_symbol};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RsiQuery {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,
    pub window: Option<usize>,
    pub oversold: Option<f64>,
    pub overbought: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRiskQuery {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,
    pub rolling_window: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CorrelationMatrixQuery {
    /// Comma separated, e.g. `AAPL,MSFT,SPY`.
    pub symbols: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,
    pub basis: Option<CorrelationBasis>,
}

#[derive(Debug, Deserialize)]
pub struct RollingCorrelationQuery {
    pub symbol1: String,
    pub symbol2: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,
    pub window: Option<usize>,
    pub band_window: Option<usize>,
    pub band_std_dev: Option<f64>,
    pub basis: Option<CorrelationBasis>,
}

#[derive(Debug, Deserialize)]
pub struct SpreadQuery {
    pub symbol1: String,
    pub symbol2: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub interval: Option<Interval>,
    pub window: Option<usize>,
    pub entry_upper: Option<f64>,
    pub entry_lower: Option<f64>,
    pub exit_band: Option<f64>,
}

/// Splits `A, b ,A,,C` into `["A", "B", "C"]`.
fn parse_symbols(raw: &str) -> Result<Vec<String>, AppError> {
    let mut symbols: Vec<String> = Vec::new();
    for part in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let symbol = normalize_symbol(part)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}

fn require_symbol(name: &str, value: &str) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("'{}' must not be empty", name)));
    }
    Ok(normalize_symbol(value)?)
}

/// Both legs of a pair analysis, which must differ.
fn require_pair(symbol1: &str, symbol2: &str) -> Result<(String, String), AppError> {
    let first = require_symbol("symbol1", symbol1)?;
    let second = require_symbol("symbol2", symbol2)?;
    if first == second {
        return Err(AppError::BadRequest(format!(
            "symbol1 and symbol2 must differ, both are {}",
            first
        )));
    }
    Ok((first, second))
}

/// # GET /api/rsi
/// RSI, moving averages and the long-only RSI backtest for one symbol.
pub async fn get_rsi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RsiQuery>,
) -> Result<Json<RsiBacktestResult>, AppError> {
    let defaults = state.config.rsi;
    let params = RsiParams {
        window: query.window.unwrap_or(defaults.window),
        oversold: query.oversold.unwrap_or(defaults.oversold),
        overbought: query.overbought.unwrap_or(defaults.overbought),
    };
    let backtester = RsiBacktester::new(params)?;

    let symbol = require_symbol("symbol", &query.symbol)?;
    let (interval, start, end) = state.request_window(query.start, query.end, query.interval)?;
    let series = state.source.fetch_series(&symbol, interval, start, end).await?;

    Ok(Json(backtester.run(&series)?))
}

/// # GET /api/return-risk
/// Return distribution, drawdown and volatility of one symbol.
pub async fn get_return_risk(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReturnRiskQuery>,
) -> Result<Json<ReturnRiskReport>, AppError> {
    let params = ReturnRiskParams {
        rolling_window: query
            .rolling_window
            .unwrap_or(state.config.return_risk.rolling_window),
        ..state.config.return_risk
    };
    params.validate()?;

    let symbol = require_symbol("symbol", &query.symbol)?;
    let (interval, start, end) = state.request_window(query.start, query.end, query.interval)?;
    let series = state.source.fetch_series(&symbol, interval, start, end).await?;

    Ok(Json(analyze_return_risk(&series, &params)?))
}

/// # GET /api/correlation-matrix
/// Pearson correlation matrix over two or more symbols.
pub async fn get_correlation_matrix(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CorrelationMatrixQuery>,
) -> Result<Json<CorrelationMatrix>, AppError> {
    let params = CorrelationParams {
        basis: query.basis.unwrap_or(state.config.correlation.basis),
    };

    let symbols = parse_symbols(&query.symbols)?;
    if symbols.len() < 2 {
        return Err(CorrelationError::TooFewSymbols {
            required: 2,
            got: symbols.len(),
        }
        .into());
    }

    let (interval, start, end) = state.request_window(query.start, query.end, query.interval)?;
    let panel = fetch_panel(state.source.as_ref(), &symbols, interval, start, end).await?;

    Ok(Json(correlation_matrix(&panel, &params)?))
}

/// # GET /api/rolling-correlation
/// Rolling correlation of a pair with mean-reversion bands and signals.
pub async fn get_rolling_correlation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RollingCorrelationQuery>,
) -> Result<Json<RollingCorrelationResult>, AppError> {
    let defaults = state.config.rolling_correlation;
    let params = RollingCorrelationParams {
        window: query.window.unwrap_or(defaults.window),
        band_window: query.band_window.unwrap_or(defaults.band_window),
        band_std_dev: query.band_std_dev.unwrap_or(defaults.band_std_dev),
        basis: query.basis.unwrap_or(defaults.basis),
    };
    params.validate()?;

    let (symbol1, symbol2) = require_pair(&query.symbol1, &query.symbol2)?;
    let (interval, start, end) = state.request_window(query.start, query.end, query.interval)?;
    let panel = fetch_pair(state.source.as_ref(), &symbol1, &symbol2, interval, start, end).await?;

    Ok(Json(rolling_correlation(&panel, &params)?))
}

/// # GET /api/spread
/// Hedge ratio, spread z-score and the pairs backtest.
pub async fn get_spread(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpreadQuery>,
) -> Result<Json<SpreadBacktestResult>, AppError> {
    let defaults = state.config.spread;
    let params = SpreadParams {
        window: query.window.unwrap_or(defaults.window),
        entry_upper: query.entry_upper.unwrap_or(defaults.entry_upper),
        entry_lower: query.entry_lower.unwrap_or(defaults.entry_lower),
        exit_band: query.exit_band.unwrap_or(defaults.exit_band),
    };
    let backtester = PairsBacktester::new(params)?;

    let (symbol1, symbol2) = require_pair(&query.symbol1, &query.symbol2)?;
    let (interval, start, end) = state.request_window(query.start, query.end, query.interval)?;
    let panel = fetch_pair(state.source.as_ref(), &symbol1, &symbol2, interval, start, end).await?;

    Ok(Json(backtester.run(&panel)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_normalised_and_deduplicated() {
        assert_eq!(parse_symbols("aapl, MSFT ,AAPL,,spy").unwrap(), vec!["AAPL", "MSFT", "SPY"]);
        assert!(parse_symbols(" , ").unwrap().is_empty());
        assert!(parse_symbols("AAPL,../etc").is_err());
    }

    #[test]
    fn pair_legs_must_differ() {
        assert_eq!(
            require_pair("aaa", " bbb").unwrap(),
            ("AAA".to_string(), "BBB".to_string())
        );
        assert!(matches!(require_pair("AAA", "aaa"), Err(AppError::BadRequest(_))));
    }
}
