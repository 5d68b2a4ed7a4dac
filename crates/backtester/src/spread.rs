use crate::error::BacktestError;
use crate::ledger::TradeLedger;
use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::SpreadParams;
use core_types::{Interval, PricePanel, Trade, TradeDirection, TradeStatus, decimal_from_f64};
use indicators::stats;
use rust_decimal::Decimal;
use serde::Serialize;

/// One bar of the spread analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadBar {
    pub timestamp: DateTime<Utc>,
    pub price1: f64,
    pub price2: f64,
    pub spread: f64,
    pub spread_mean: Option<f64>,
    pub spread_std: Option<f64>,
    pub zscore: Option<f64>,
    /// +1 long the spread, -1 short the spread, 0 flat (at this bar's close).
    pub position: i8,
    pub daily_pnl: Decimal,
    pub cumulative_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadBacktestResult {
    pub symbol1: String,
    pub symbol2: String,
    pub interval: Interval,
    pub params: SpreadParams,
    /// OLS slope of the second symbol on the first.
    pub hedge_ratio: f64,
    pub bars: Vec<SpreadBar>,
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
}

/// Pairs backtest on the z-score of `spread = price2 - hedge_ratio * price1`.
///
/// Long the spread when z falls below `entry_lower`, short when it rises
/// above `entry_upper`, flat once `|z| < exit_band`. Crossing the opposite
/// entry level flips the position directly.
#[derive(Debug)]
pub struct PairsBacktester {
    params: SpreadParams,
    analytics_engine: AnalyticsEngine,
}

impl PairsBacktester {
    pub fn new(params: SpreadParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            params,
            analytics_engine: AnalyticsEngine::new(),
        })
    }

    /// The position after seeing `z`, given the position held before.
    /// An undefined z-score keeps the current position.
    pub fn next_position(&self, current: i8, z: Option<f64>) -> i8 {
        let Some(z) = z else { return current };
        let p = &self.params;
        match current {
            0 if z < p.entry_lower => 1,
            0 if z > p.entry_upper => -1,
            1 if z > p.entry_upper => -1,
            -1 if z < p.entry_lower => 1,
            1 | -1 if z.abs() < p.exit_band => 0,
            other => other,
        }
    }

    pub fn run(&self, panel: &PricePanel) -> Result<SpreadBacktestResult, BacktestError> {
        if panel.symbols.len() != 2 {
            return Err(BacktestError::NotAPair(panel.symbols.len()));
        }
        indicators::ensure_len(panel.len(), self.params.window.max(2))?;

        let (x, y) = (&panel.columns()[0], &panel.columns()[1]);
        let hedge_ratio = stats::ols_slope(x, y).ok_or_else(|| {
            BacktestError::Calculation(format!(
                "hedge ratio is undefined: {} has no price variation",
                panel.symbols[0]
            ))
        })?;

        let spread: Vec<f64> = x.iter().zip(y).map(|(xi, yi)| yi - hedge_ratio * xi).collect();
        let means = stats::rolling_mean(&spread, self.params.window);
        let stds = stats::rolling_std(&spread, self.params.window);

        let mut ledger = TradeLedger::new(panel.symbols.clone());
        let mut bars = Vec::with_capacity(spread.len());
        let mut position: i8 = 0;
        let mut cumulative = Decimal::ZERO;
        let mut prev_spread: Option<Decimal> = None;

        for (i, s) in spread.iter().enumerate() {
            let timestamp = panel.timestamps[i];
            let value = decimal_from_f64(*s, "spread")?;
            let daily_pnl = match prev_spread {
                Some(prev) => (value - prev) * Decimal::from(position),
                None => Decimal::ZERO,
            };
            cumulative += daily_pnl;

            let z = stats::zscore(*s, means[i], stds[i]);
            let next = self.next_position(position, z);
            if next != position {
                match TradeDirection::from_position(next) {
                    Some(direction) => ledger.open(direction, timestamp, value, z),
                    None => ledger.close(timestamp, value, z, TradeStatus::Closed),
                }
                position = next;
            }

            bars.push(SpreadBar {
                timestamp,
                price1: x[i],
                price2: y[i],
                spread: *s,
                spread_mean: means[i],
                spread_std: stds[i],
                zscore: z,
                position,
                daily_pnl,
                cumulative_pnl: cumulative,
            });
            prev_spread = Some(value);
        }

        let trades = match (bars.last(), prev_spread) {
            (Some(last), Some(value)) => ledger.finish(last.timestamp, value, last.zscore),
            _ => Vec::new(),
        };

        let pnl_curve: Vec<(DateTime<Utc>, Decimal)> =
            bars.iter().map(|b| (b.timestamp, b.cumulative_pnl)).collect();
        let report = self.analytics_engine.calculate(&trades, &pnl_curve)?;

        tracing::info!(
            symbol1 = %panel.symbols[0],
            symbol2 = %panel.symbols[1],
            hedge_ratio,
            trades = trades.len(),
            net_pnl = %report.total_net_pnl,
            "Spread backtest complete"
        );

        Ok(SpreadBacktestResult {
            symbol1: panel.symbols[0].clone(),
            symbol2: panel.symbols[1].clone(),
            interval: panel.interval,
            params: self.params,
            hedge_ratio,
            bars,
            trades,
            report,
        })
    }
}
