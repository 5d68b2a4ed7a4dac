use crate::{CorrelationError, basis_columns};
use chrono::{DateTime, Utc};
use configuration::RollingCorrelationParams;
use core_types::{CorrelationBasis, PricePanel};
use indicators::stats;
use serde::{Serialize, Serializer};

/// Position of the rolling correlation relative to its bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationSignal {
    /// Above the upper band; serialized as `-1`.
    UnusuallyHigh,
    /// Below the lower band; serialized as `1`.
    UnusuallyLow,
    Neutral,
}

impl CorrelationSignal {
    pub fn value(self) -> i8 {
        match self {
            CorrelationSignal::UnusuallyHigh => -1,
            CorrelationSignal::UnusuallyLow => 1,
            CorrelationSignal::Neutral => 0,
        }
    }
}

impl Serialize for CorrelationSignal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingCorrelationRow {
    pub timestamp: DateTime<Utc>,
    pub price1: f64,
    pub price2: f64,
    pub correlation: f64,
    pub band_mean: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub signal: CorrelationSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingCorrelationSummary {
    pub latest: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Correlation over the whole aligned sample.
    pub full_sample: Option<f64>,
    pub high_signals: usize,
    pub low_signals: usize,
    /// True when the bands came from an expanding window because fewer than
    /// `band_window` rolling values were available.
    pub expanding_bands: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingCorrelationResult {
    pub symbol1: String,
    pub symbol2: String,
    pub params: RollingCorrelationParams,
    pub summary: RollingCorrelationSummary,
    /// Only rows where the rolling correlation is defined.
    pub rows: Vec<RollingCorrelationRow>,
}

/// Rolling Pearson correlation of a two-symbol panel with bands.
///
/// The bands are the mean of the rolling correlation plus/minus
/// `band_std_dev` standard deviations, measured over the trailing
/// `band_window` rolling values. When fewer rolling values than that exist,
/// an expanding mean/std over everything seen so far is used instead.
pub fn rolling_correlation(
    panel: &PricePanel,
    params: &RollingCorrelationParams,
) -> Result<RollingCorrelationResult, CorrelationError> {
    params.validate()?;
    if panel.symbols.len() != 2 {
        return Err(CorrelationError::TooFewSymbols {
            required: 2,
            got: panel.symbols.len(),
        });
    }

    let columns = basis_columns(panel, params.basis)?;
    let (x, y) = (&columns[0], &columns[1]);
    indicators::ensure_len(x.len(), params.window)?;

    // Returns start one row later than prices.
    let offset = match params.basis {
        CorrelationBasis::Prices => 0,
        CorrelationBasis::Returns => 1,
    };
    let prices = panel.columns();

    let correlation = stats::rolling_pearson(x, y, params.window);
    let defined = correlation.iter().flatten().count();
    let expanding_bands = defined < params.band_window;
    let (band_mean, band_std) = if expanding_bands {
        (
            stats::expanding_mean(&correlation),
            stats::expanding_std(&correlation),
        )
    } else {
        (
            stats::rolling_mean_opt(&correlation, params.band_window),
            stats::rolling_std_opt(&correlation, params.band_window),
        )
    };

    let k = params.band_std_dev;
    let mut rows = Vec::with_capacity(defined);
    for (i, corr) in correlation.iter().enumerate() {
        let Some(corr) = *corr else { continue };
        let bands = band_mean[i].zip(band_std[i]).map(|(m, s)| (m + k * s, m - k * s));
        let signal = match bands {
            Some((upper, _)) if corr > upper => CorrelationSignal::UnusuallyHigh,
            Some((_, lower)) if corr < lower => CorrelationSignal::UnusuallyLow,
            _ => CorrelationSignal::Neutral,
        };
        let row = i + offset;
        rows.push(RollingCorrelationRow {
            timestamp: panel.timestamps[row],
            price1: prices[0][row],
            price2: prices[1][row],
            correlation: corr,
            band_mean: band_mean[i],
            upper_band: bands.map(|b| b.0),
            lower_band: bands.map(|b| b.1),
            signal,
        });
    }

    let values: Vec<f64> = rows.iter().map(|r| r.correlation).collect();
    let summary = RollingCorrelationSummary {
        latest: values.last().copied(),
        mean: stats::mean(&values),
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
        full_sample: stats::pearson(x, y),
        high_signals: rows
            .iter()
            .filter(|r| r.signal == CorrelationSignal::UnusuallyHigh)
            .count(),
        low_signals: rows
            .iter()
            .filter(|r| r.signal == CorrelationSignal::UnusuallyLow)
            .count(),
        expanding_bands,
    };

    tracing::debug!(
        symbol1 = %panel.symbols[0],
        symbol2 = %panel.symbols[1],
        rows = rows.len(),
        expanding_bands,
        "Rolling correlation computed"
    );

    Ok(RollingCorrelationResult {
        symbol1: panel.symbols[0].clone(),
        symbol2: panel.symbols[1].clone(),
        params: *params,
        summary,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{Interval, PricePoint, PriceSeries};
    use indicators::IndicatorError;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(base + Duration::days(i as i64), *c))
            .collect();
        PriceSeries::new(symbol, Interval::Daily, points).unwrap()
    }

    fn pair(a: &[f64], b: &[f64]) -> PricePanel {
        PricePanel::align(&[series("A", a), series("B", b)]).unwrap()
    }

    fn wavy(n: usize, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3 + phase).sin() * 5.0 + i as f64 * 0.05)
            .collect()
    }

    fn params(window: usize, band_window: usize) -> RollingCorrelationParams {
        RollingCorrelationParams {
            window,
            band_window,
            ..RollingCorrelationParams::default()
        }
    }

    #[test]
    fn shorter_than_window_is_insufficient() {
        let p = pair(&wavy(10, 0.0), &wavy(10, 0.5));
        let err = rolling_correlation(&p, &params(30, 100)).unwrap_err();
        assert!(matches!(
            err,
            CorrelationError::Indicator(IndicatorError::InsufficientData { required: 30, got: 10 })
        ));
    }

    #[test]
    fn warm_up_rows_are_omitted() {
        let p = pair(&wavy(50, 0.0), &wavy(50, 0.7));
        let result = rolling_correlation(&p, &params(10, 100)).unwrap();
        assert_eq!(result.rows.len(), 41);
        assert_eq!(result.rows[0].timestamp, p.timestamps[9]);
        assert!(result.summary.expanding_bands);
        for row in &result.rows {
            assert!((-1.0..=1.0).contains(&row.correlation));
        }
    }

    #[test]
    fn first_row_has_no_band_width_yet() {
        let p = pair(&wavy(40, 0.0), &wavy(40, 1.1));
        let result = rolling_correlation(&p, &params(5, 100)).unwrap();
        let first = &result.rows[0];
        // expanding mean of a single value is the value, std needs two
        assert_eq!(first.band_mean, Some(first.correlation));
        assert_eq!(first.upper_band, None);
        assert_eq!(first.signal, CorrelationSignal::Neutral);
        assert!(result.rows[1].upper_band.is_some());
    }

    #[test]
    fn rolling_bands_once_enough_values() {
        let p = pair(&wavy(80, 0.0), &wavy(80, 1.3));
        let result = rolling_correlation(&p, &params(5, 20)).unwrap();
        assert!(!result.summary.expanding_bands);
        // 76 defined values; the rolling band needs 20 of them
        assert!(result.rows[..19].iter().all(|r| r.band_mean.is_none()));
        assert!(result.rows[19].band_mean.is_some());
    }

    #[test]
    fn signals_follow_bands() {
        let p = pair(&wavy(120, 0.0), &wavy(120, 2.0));
        let result = rolling_correlation(&p, &params(8, 30)).unwrap();
        for row in &result.rows {
            match row.signal {
                CorrelationSignal::UnusuallyHigh => assert!(row.correlation > row.upper_band.unwrap()),
                CorrelationSignal::UnusuallyLow => assert!(row.correlation < row.lower_band.unwrap()),
                CorrelationSignal::Neutral => {}
            }
        }
        assert_eq!(
            result.summary.high_signals + result.summary.low_signals,
            result.rows.iter().filter(|r| r.signal != CorrelationSignal::Neutral).count()
        );
    }

    #[test]
    fn returns_basis_shifts_rows() {
        let p = pair(&wavy(30, 0.0), &wavy(30, 0.4));
        let prm = RollingCorrelationParams {
            basis: CorrelationBasis::Returns,
            ..params(5, 100)
        };
        let result = rolling_correlation(&p, &prm).unwrap();
        // 29 returns, first window ends at return 4 -> price row 5
        assert_eq!(result.rows.len(), 25);
        assert_eq!(result.rows[0].timestamp, p.timestamps[5]);
        assert_eq!(result.rows[0].price1, p.columns()[0][5]);
    }

    #[test]
    fn signal_serializes_as_number() {
        let json = serde_json::to_string(&[
            CorrelationSignal::UnusuallyHigh,
            CorrelationSignal::Neutral,
            CorrelationSignal::UnusuallyLow,
        ])
        .unwrap();
        assert_eq!(json, "[-1,0,1]");
    }
}
