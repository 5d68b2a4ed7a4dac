use crate::error::MarketDataError;
use crate::{MarketDataSource, check_symbol};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core_types::{Interval, PricePoint, PriceSeries};
use std::path::{Path, PathBuf};

/// Loads closing prices from `{dir}/{SYMBOL}.csv`.
///
/// The file needs a header row with a `timestamp` (or `date`) column and a
/// `close` column; other columns are ignored. Timestamps may be RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` or plain `YYYY-MM-DD` (midnight UTC). Rows with an
/// empty or `null` close are skipped. The interval is taken on trust from
/// the request since a file carries a single sampling frequency.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> Option<PathBuf> {
        [symbol.to_string(), symbol.to_ascii_uppercase()]
            .into_iter()
            .map(|name| self.dir.join(format!("{}.csv", name)))
            .find(|path| path.is_file())
    }
}

#[async_trait]
impl MarketDataSource for CsvDirectorySource {
    async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError> {
        let unavailable = || MarketDataError::DataUnavailable {
            symbol: symbol.to_string(),
            interval,
        };

        check_symbol(symbol)?;
        let Some(path) = self.path_for(symbol) else {
            tracing::warn!(symbol, dir = %self.dir.display(), "No CSV file for symbol");
            return Err(unavailable());
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| MarketDataError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let mut points: Vec<PricePoint> = parse_csv(&path, &contents)?
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .collect();
        points.sort_by_key(|p| p.timestamp);

        if points.is_empty() {
            return Err(unavailable());
        }

        tracing::info!(symbol, path = %path.display(), bars = points.len(), "Loaded price series");
        Ok(PriceSeries::new(symbol, interval, points)?)
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

fn parse_csv(path: &Path, contents: &str) -> Result<Vec<PricePoint>, MarketDataError> {
    let csv_err = |source: csv::Error| MarketDataError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers = reader.headers().map_err(csv_err)?.clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let ts_col = find(&["timestamp", "date", "datetime", "time"]).ok_or_else(|| {
        MarketDataError::InvalidData(format!("{}: missing a timestamp/date column", path.display()))
    })?;
    let close_col = find(&["close", "adj_close", "adj close"]).ok_or_else(|| {
        MarketDataError::InvalidData(format!("{}: missing a close column", path.display()))
    })?;

    let mut points = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let raw_close = record.get(close_col).unwrap_or("");
        if raw_close.is_empty() || raw_close.eq_ignore_ascii_case("null") {
            continue;
        }
        let raw_ts = record.get(ts_col).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
            MarketDataError::InvalidData(format!(
                "{} row {}: unrecognised timestamp '{}'",
                path.display(),
                line + 2,
                raw_ts
            ))
        })?;
        let close: f64 = raw_close.parse().map_err(|_| {
            MarketDataError::InvalidData(format!(
                "{} row {}: close '{}' is not a number",
                path.display(),
                line + 2,
                raw_close
            ))
        })?;
        points.push(PricePoint::new(timestamp, close));
    }
    Ok(points)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}
