use crate::error::AnalyticsError;
use chrono::{DateTime, Utc};
use configuration::ReturnRiskParams;
use core_types::{Interval, PriceSeries, pct_returns};
use indicators::stats;
use serde::Serialize;
use std::f64::consts::PI;

/// Below this standard deviation (in percent) a fitted normal curve is meaningless.
const MIN_FIT_STD: f64 = 1e-6;

/// Histogram bin width used when every return is identical.
const DEGENERATE_BIN_WIDTH: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPoint {
    pub timestamp: DateTime<Utc>,
    /// Simple return over the previous bar, in percent.
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityPoint {
    pub timestamp: DateTime<Utc>,
    pub volatility: Option<f64>,
}

/// Largest peak-to-trough fall of the price path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drawdown {
    /// Positive percentage below the running peak.
    pub pct: f64,
    pub peak_time: DateTime<Utc>,
    pub trough_time: DateTime<Utc>,
}

/// Moments and risk figures of the return distribution. All values in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSummary {
    pub observations: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub skewness: Option<f64>,
    pub excess_kurtosis: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub annualized_volatility: Option<f64>,
    pub max_drawdown: Drawdown,
}

/// Equal-width histogram normalised to a probability density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `density.len() + 1` ascending edges.
    pub bin_edges: Vec<f64>,
    pub density: Vec<f64>,
}

/// Normal pdf with the sample mean and std, sampled over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalFit {
    pub x: Vec<f64>,
    pub pdf: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnRiskReport {
    pub symbol: String,
    pub interval: Interval,
    pub params: ReturnRiskParams,
    pub summary: ReturnSummary,
    pub returns: Vec<ReturnPoint>,
    pub rolling_volatility: Vec<VolatilityPoint>,
    pub histogram: Histogram,
    pub normal_fit: Option<NormalFit>,
    pub warnings: Vec<String>,
}

/// Summarises the percentage returns of `series`.
///
/// Needs at least two prices. A distribution too narrow for a normal fit is
/// not an error: the fit is left out and a warning is attached instead.
pub fn analyze_return_risk(
    series: &PriceSeries,
    params: &ReturnRiskParams,
) -> Result<ReturnRiskReport, AnalyticsError> {
    params.validate()?;
    indicators::ensure_len(series.len(), 2)?;

    let closes = series.closes();
    let timestamps = series.timestamps();
    let returns = pct_returns(&closes);
    if let Some(bad) = returns.iter().position(|r| !r.is_finite()) {
        return Err(AnalyticsError::InvalidData(format!(
            "{}: return at {} is undefined because the previous close is {}",
            series.symbol, timestamps[bad + 1], closes[bad]
        )));
    }

    let mean = stats::mean(&returns)
        .ok_or_else(|| AnalyticsError::NotEnoughData("no returns".to_string()))?;
    let std_dev = stats::sample_std(&returns);
    let (min, max) = min_max(&returns);

    let summary = ReturnSummary {
        observations: returns.len(),
        mean,
        std_dev,
        skewness: stats::skewness(&returns),
        excess_kurtosis: stats::excess_kurtosis(&returns),
        min,
        max,
        annualized_volatility: std_dev
            .map(|s| s * series.interval.periods_per_year().sqrt()),
        max_drawdown: max_drawdown(&closes, &timestamps),
    };

    let rolling_volatility = stats::rolling_std(&returns, params.rolling_window)
        .into_iter()
        .zip(&timestamps[1..])
        .map(|(volatility, ts)| VolatilityPoint {
            timestamp: *ts,
            volatility,
        })
        .collect();

    let mut warnings = Vec::new();
    let normal_fit = match std_dev {
        Some(std) if std >= MIN_FIT_STD => Some(normal_fit(mean, std, min, max, params.normal_fit_points)),
        _ => {
            let message = format!(
                "Could not reliably fit a normal distribution for {} (mean: {:.2}%, std: {}) - std is undefined or too small.",
                series.symbol,
                mean,
                std_dev.map_or_else(|| "n/a".to_string(), |s| format!("{:.2}%", s)),
            );
            tracing::warn!(symbol = %series.symbol, "{}", message);
            warnings.push(message);
            None
        }
    };

    let report = ReturnRiskReport {
        symbol: series.symbol.clone(),
        interval: series.interval,
        params: *params,
        summary,
        returns: returns
            .iter()
            .zip(&timestamps[1..])
            .map(|(r, ts)| ReturnPoint {
                timestamp: *ts,
                return_pct: *r,
            })
            .collect(),
        rolling_volatility,
        histogram: histogram(&returns, params.histogram_bins, min, max),
        normal_fit,
        warnings,
    };

    tracing::debug!(
        symbol = %report.symbol,
        observations = report.summary.observations,
        "Return/risk summary computed"
    );
    Ok(report)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

fn max_drawdown(closes: &[f64], timestamps: &[DateTime<Utc>]) -> Drawdown {
    let mut peak_idx = 0;
    let mut worst = Drawdown {
        pct: 0.0,
        peak_time: timestamps[0],
        trough_time: timestamps[0],
    };

    for (i, close) in closes.iter().enumerate() {
        if *close > closes[peak_idx] {
            peak_idx = i;
        }
        let peak = closes[peak_idx];
        if peak > 0.0 {
            let pct = (peak - close) / peak * 100.0;
            if pct > worst.pct {
                worst = Drawdown {
                    pct,
                    peak_time: timestamps[peak_idx],
                    trough_time: timestamps[i],
                };
            }
        }
    }
    worst
}

fn histogram(values: &[f64], bins: usize, min: f64, max: f64) -> Histogram {
    let n = values.len() as f64;
    let range = max - min;

    if range <= 0.0 {
        let half = DEGENERATE_BIN_WIDTH / 2.0;
        return Histogram {
            bin_edges: vec![min - half, min + half],
            density: vec![1.0 / DEGENERATE_BIN_WIDTH],
        };
    }

    let width = range / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        // The last bin is closed on the right.
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let mut bin_edges: Vec<f64> = (0..=bins).map(|i| min + i as f64 * width).collect();
    bin_edges[bins] = max;

    Histogram {
        bin_edges,
        density: counts.iter().map(|c| *c as f64 / (n * width)).collect(),
    }
}

fn normal_fit(mean: f64, std: f64, min: f64, max: f64, points: usize) -> NormalFit {
    let step = (max - min) / (points - 1) as f64;
    let x: Vec<f64> = (0..points).map(|i| min + i as f64 * step).collect();
    let norm = 1.0 / (std * (2.0 * PI).sqrt());
    let pdf = x
        .iter()
        .map(|xi| {
            let z = (xi - mean) / std;
            norm * (-0.5 * z * z).exp()
        })
        .collect();
    NormalFit { x, pdf }
}
