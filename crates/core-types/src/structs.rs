use crate::enums::{Interval, TradeDirection, TradeStatus};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single closing-price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// A time-indexed sequence of closing prices for one instrument.
///
/// Construction enforces the two invariants every analysis relies on:
/// timestamps never decrease and every close is finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub interval: Interval,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        points: Vec<PricePoint>,
    ) -> Result<Self, CoreError> {
        let symbol = symbol.into();

        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(CoreError::InvalidInput(
                symbol,
                format!("non-finite close {} at {}", bad.close, bad.timestamp),
            ));
        }

        if let Some(w) = points.windows(2).find(|w| w[1].timestamp < w[0].timestamp) {
            return Err(CoreError::InvalidInput(
                symbol,
                format!(
                    "timestamps must be non-decreasing ({} follows {})",
                    w[1].timestamp, w[0].timestamp
                ),
            ));
        }

        Ok(Self {
            symbol,
            interval,
            points,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }
}

/// Percentage change between consecutive values: `(v[i] / v[i-1] - 1) * 100`.
///
/// The result has one element fewer than the input. A zero previous value
/// produces a non-finite return; callers decide how to treat it.
pub fn pct_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| (w[1] / w[0] - 1.0) * 100.0)
        .collect()
}

/// Several series aligned on the timestamps they all share.
///
/// Symbols whose series is empty are dropped and listed in `dropped`; a row
/// survives only when every remaining symbol has an observation at that
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePanel {
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Vec<f64>>,
    pub dropped: Vec<String>,
}

impl PricePanel {
    pub fn align(series: &[PriceSeries]) -> Result<Self, CoreError> {
        let interval = series
            .first()
            .map(|s| s.interval)
            .ok_or_else(|| CoreError::InvalidInput("panel".to_string(), "no series given".to_string()))?;

        let (kept, dropped): (Vec<&PriceSeries>, Vec<&PriceSeries>) =
            series.iter().partition(|s| !s.is_empty());
        let dropped: Vec<String> = dropped.into_iter().map(|s| s.symbol.clone()).collect();
        if !dropped.is_empty() {
            tracing::warn!(?dropped, "Dropping symbols without any observations");
        }

        // Later observations at a repeated timestamp win.
        let maps: Vec<BTreeMap<DateTime<Utc>, f64>> = kept
            .iter()
            .map(|s| s.points().iter().map(|p| (p.timestamp, p.close)).collect())
            .collect();

        let timestamps: Vec<DateTime<Utc>> = match maps.split_first() {
            Some((head, rest)) => head
                .keys()
                .filter(|ts| rest.iter().all(|m| m.contains_key(*ts)))
                .copied()
                .collect(),
            None => Vec::new(),
        };

        let columns = maps
            .iter()
            .map(|m| timestamps.iter().map(|ts| m[ts]).collect())
            .collect();

        Ok(Self {
            symbols: kept.iter().map(|s| s.symbol.clone()).collect(),
            interval,
            timestamps,
            columns,
            dropped,
        })
    }

    /// Number of aligned rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }
}

/// A completed (or force-closed) backtest trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    /// The instrument, or both legs for a spread trade.
    pub symbols: Vec<String>,
    pub direction: TradeDirection,
    pub entry_time: DateTime<Utc>,
    /// Price (or spread value) at entry.
    pub entry_price: Decimal,
    /// Indicator value that triggered the entry (RSI or z-score).
    pub entry_signal: Option<f64>,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub exit_signal: Option<f64>,
    pub pnl: Decimal,
    pub status: TradeStatus,
}

impl Trade {
    /// Holding time between entry and exit.
    pub fn duration(&self) -> chrono::Duration {
        self.exit_time - self.entry_time
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// Converts an `f64` into a `Decimal`, failing on NaN, infinities and values
/// outside the representable range.
pub fn decimal_from_f64(value: f64, what: &str) -> Result<Decimal, CoreError> {
    Decimal::from_f64(value).ok_or_else(|| {
        CoreError::Calculation(format!("{} value {} cannot be represented as a decimal", what, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn series(symbol: &str, points: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(
            symbol,
            Interval::Daily,
            points.iter().map(|&(d, c)| PricePoint::new(day(d), c)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn series_rejects_non_finite_close() {
        let err = PriceSeries::new(
            "AAPL",
            Interval::Daily,
            vec![PricePoint::new(day(1), 1.0), PricePoint::new(day(2), f64::NAN)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(ref s, _) if s == "AAPL"));
    }

    #[test]
    fn series_rejects_decreasing_timestamps() {
        let err = PriceSeries::new(
            "AAPL",
            Interval::Daily,
            vec![PricePoint::new(day(3), 1.0), PricePoint::new(day(2), 2.0)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn series_accepts_repeated_timestamps() {
        let s = series("AAPL", &[(1, 1.0), (1, 1.5), (2, 2.0)]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.closes(), vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn pct_returns_are_in_percent() {
        let r = pct_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 10.0).abs() < 1e-12);
        assert!((r[1] + 10.0).abs() < 1e-12);
    }

    #[test]
    fn panel_inner_joins_on_timestamps() {
        let a = series("A", &[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let b = series("B", &[(2, 20.0), (3, 30.0), (5, 50.0)]);
        let panel = PricePanel::align(&[a, b]).unwrap();

        assert_eq!(panel.symbols, vec!["A", "B"]);
        assert_eq!(panel.timestamps, vec![day(2), day(3)]);
        assert_eq!(panel.column("A").unwrap(), &[2.0, 3.0]);
        assert_eq!(panel.column("B").unwrap(), &[20.0, 30.0]);
        assert!(panel.dropped.is_empty());
    }

    #[test]
    fn panel_drops_empty_series() {
        let a = series("A", &[(1, 1.0), (2, 2.0)]);
        let empty = PriceSeries::new("EMPTY", Interval::Daily, vec![]).unwrap();
        let b = series("B", &[(1, 5.0), (2, 6.0)]);
        let panel = PricePanel::align(&[a, empty, b]).unwrap();

        assert_eq!(panel.symbols, vec!["A", "B"]);
        assert_eq!(panel.dropped, vec!["EMPTY"]);
        assert_eq!(panel.len(), 2);
    }

    #[test]
    fn trade_duration_and_winner() {
        let trade = Trade {
            trade_id: Uuid::new_v4(),
            symbols: vec!["AAPL".to_string()],
            direction: TradeDirection::Long,
            entry_time: day(1),
            entry_price: dec!(100),
            entry_signal: Some(25.0),
            exit_time: day(4),
            exit_price: dec!(104.5),
            exit_signal: Some(75.0),
            pnl: dec!(4.5),
            status: TradeStatus::Closed,
        };
        assert_eq!(trade.duration(), chrono::Duration::days(3));
        assert!(trade.is_winner());
    }

    #[test]
    fn decimal_conversion_rejects_nan() {
        assert!(decimal_from_f64(f64::NAN, "price").is_err());
        assert_eq!(decimal_from_f64(1.5, "price").unwrap(), dec!(1.5));
    }
}
