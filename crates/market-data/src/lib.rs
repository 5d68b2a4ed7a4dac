//! # QuantLens Market Data
//!
//! The shared input-loading convention of every analysis: a
//! [`MarketDataSource`] yields validated `PriceSeries`, and [`fetch_panel`] /
//! [`fetch_pair`] fetch several symbols concurrently and align them on their
//! common timestamps.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use configuration::{DataConfig, DataSourceKind};
use core_types::{Interval, PricePanel, PriceSeries};
use futures::future::join_all;
use std::sync::Arc;

pub mod csv_source;
pub mod error;
pub mod responses;
pub mod yahoo;

// --- Public API ---
pub use csv_source::CsvDirectorySource;
pub use error::MarketDataError;
pub use yahoo::YahooChartClient;

/// The abstract interface to a provider of historical closing prices.
///
/// The CLI and the web server only ever hold a `dyn MarketDataSource`, so the
/// remote client can be swapped for local files (or a fake in tests).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches closes for `symbol` in `[start, end]`.
    ///
    /// Returns `MarketDataError::DataUnavailable` rather than an empty series
    /// when the provider has nothing for the request.
    async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Builds the source selected by `data.source`.
pub fn build_source(config: &DataConfig) -> Result<Arc<dyn MarketDataSource>, MarketDataError> {
    let source: Arc<dyn MarketDataSource> = match config.source {
        DataSourceKind::Yahoo => Arc::new(YahooChartClient::new(config)?),
        DataSourceKind::Csv => Arc::new(CsvDirectorySource::new(config.csv_dir.clone())),
    };
    tracing::debug!(source = source.name(), "Market data source ready");
    Ok(source)
}

/// Longest ticker accepted by [`normalize_symbol`].
const MAX_SYMBOL_LEN: usize = 32;

/// Rejects symbols that could not be a ticker, such as anything containing a
/// path separator or URL delimiter. Case is not checked.
pub fn check_symbol(symbol: &str) -> Result<(), MarketDataError> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'))
        && symbol.chars().any(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(MarketDataError::InvalidSymbol(symbol.to_string()))
    }
}

/// Trims and uppercases a user-supplied ticker, then validates it with
/// [`check_symbol`].
pub fn normalize_symbol(raw: &str) -> Result<String, MarketDataError> {
    let symbol = raw.trim().to_ascii_uppercase();
    check_symbol(&symbol)?;
    Ok(symbol)
}

/// Converts an inclusive range of calendar days into UTC instants, from the
/// first second of `start` to the last second of `end`.
pub fn date_range(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MarketDataError> {
    if start > end {
        return Err(MarketDataError::InvalidRange(format!(
            "start {} is after end {}",
            start, end
        )));
    }
    let from = start.and_hms_opt(0, 0, 0);
    let to = end.and_hms_opt(23, 59, 59);
    match (from, to) {
        (Some(from), Some(to)) => Ok((from.and_utc(), to.and_utc())),
        _ => Err(MarketDataError::InvalidRange(format!("{} .. {}", start, end))),
    }
}

/// Fills in a missing end with `today` and a missing start with
/// `lookback_days` before the end, then converts with [`date_range`].
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_days: u32,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MarketDataError> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| {
                MarketDataError::InvalidRange(format!(
                    "cannot look back {} days from {}",
                    lookback_days, end
                ))
            })?,
    };
    date_range(start, end)
}

/// Fetches every symbol concurrently and aligns them into a panel.
///
/// Symbols without data are kept as empty series so that the panel records
/// them in `dropped`; any other failure aborts the whole fetch.
pub async fn fetch_panel(
    source: &dyn MarketDataSource,
    symbols: &[String],
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<PricePanel, MarketDataError> {
    let requests = symbols
        .iter()
        .map(|symbol| source.fetch_series(symbol, interval, start, end));
    let results = join_all(requests).await;

    let mut series = Vec::with_capacity(symbols.len());
    for (symbol, result) in symbols.iter().zip(results) {
        match result {
            Ok(s) => series.push(s),
            Err(e) if e.is_data_unavailable() => {
                tracing::warn!(symbol = %symbol, "No data; symbol will be dropped from the panel");
                series.push(PriceSeries::new(symbol.clone(), interval, Vec::new())?);
            }
            Err(e) => return Err(e),
        }
    }

    let panel = PricePanel::align(&series)?;
    tracing::debug!(symbols = ?panel.symbols, rows = panel.len(), "Aligned price panel");
    Ok(panel)
}

/// Fetches two symbols and aligns them; both must have overlapping data.
pub async fn fetch_pair(
    source: &dyn MarketDataSource,
    first: &str,
    second: &str,
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<PricePanel, MarketDataError> {
    let symbols = [first.to_string(), second.to_string()];
    let panel = fetch_panel(source, &symbols, interval, start, end).await?;

    if let Some(symbol) = panel.dropped.first() {
        return Err(MarketDataError::DataUnavailable {
            symbol: symbol.clone(),
            interval,
        });
    }
    if panel.is_empty() {
        return Err(MarketDataError::DataUnavailable {
            symbol: format!("{} and {} (no overlapping dates)", first, second),
            interval,
        });
    }
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::PricePoint;
    use std::collections::HashMap;

    /// Serves fixed closes starting at 2024-01-01 for known symbols.
    struct FixedSource {
        data: HashMap<String, (u32, Vec<f64>)>,
        broken: Option<String>,
    }

    #[async_trait]
    impl MarketDataSource for FixedSource {
        async fn fetch_series(
            &self,
            symbol: &str,
            interval: Interval,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<PriceSeries, MarketDataError> {
            if self.broken.as_deref() == Some(symbol) {
                return Err(MarketDataError::Provider("boom".to_string()));
            }
            let (offset, closes) = self.data.get(symbol).ok_or_else(|| {
                MarketDataError::DataUnavailable {
                    symbol: symbol.to_string(),
                    interval,
                }
            })?;
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let points = closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(base + Duration::days((*offset as i64) + i as i64), *c))
                .collect();
            Ok(PriceSeries::new(symbol, interval, points)?)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn source() -> FixedSource {
        FixedSource {
            data: HashMap::from([
                ("A".to_string(), (0, vec![1.0, 2.0, 3.0, 4.0])),
                ("B".to_string(), (1, vec![20.0, 30.0, 40.0, 50.0])),
                ("C".to_string(), (10, vec![7.0])),
            ]),
            broken: None,
        }
    }

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn panel_aligns_and_drops_missing_symbols() {
        let (start, end) = range();
        let symbols = vec!["A".to_string(), "MISSING".to_string(), "B".to_string()];
        let panel = fetch_panel(&source(), &symbols, Interval::Daily, start, end)
            .await
            .unwrap();

        assert_eq!(panel.symbols, vec!["A", "B"]);
        assert_eq!(panel.dropped, vec!["MISSING"]);
        assert_eq!(panel.column("A").unwrap(), &[2.0, 3.0, 4.0]);
        assert_eq!(panel.column("B").unwrap(), &[20.0, 30.0, 40.0]);
    }

    #[tokio::test]
    async fn provider_failure_aborts_panel() {
        let (start, end) = range();
        let mut src = source();
        src.broken = Some("B".to_string());
        let symbols = vec!["A".to_string(), "B".to_string()];
        let err = fetch_panel(&src, &symbols, Interval::Daily, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Provider(_)));
    }

    #[tokio::test]
    async fn pair_requires_both_symbols() {
        let (start, end) = range();
        let err = fetch_pair(&source(), "A", "MISSING", Interval::Daily, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::DataUnavailable { ref symbol, .. } if symbol == "MISSING"));
    }

    #[tokio::test]
    async fn pair_requires_overlap() {
        let (start, end) = range();
        let err = fetch_pair(&source(), "A", "C", Interval::Daily, start, end)
            .await
            .unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn date_range_is_inclusive() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let (start, end) = date_range(day(1), day(1)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());
        assert!(matches!(
            date_range(day(2), day(1)),
            Err(MarketDataError::InvalidRange(_))
        ));
    }

    #[test]
    fn missing_bounds_fall_back_to_lookback() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (start, end) = resolve_range(None, None, 30, today).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());

        let given = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (start, _) = resolve_range(Some(given), None, 30, today).unwrap();
        assert_eq!(start.date_naive(), given);
    }

    #[test]
    fn symbols_are_normalised_and_checked() {
        assert_eq!(normalize_symbol(" brk-b ").unwrap(), "BRK-B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_symbol("eurusd=x").unwrap(), "EURUSD=X");
        for bad in ["", "   ", "../SECRET", "/etc/passwd", "A/B", "AAPL?x=1", "A#B", "..", "A B"] {
            assert!(
                matches!(normalize_symbol(bad), Err(MarketDataError::InvalidSymbol(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn builds_csv_source_from_config() {
        let config = DataConfig {
            source: DataSourceKind::Csv,
            ..DataConfig::default()
        };
        let source = build_source(&config).unwrap();
        assert_eq!(source.name(), "csv");
    }
}
