use crate::error::BacktestError;
use crate::ledger::TradeLedger;
use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::RsiParams;
use core_types::{Interval, PriceSeries, Trade, TradeDirection, TradeStatus, decimal_from_f64};
use rust_decimal::Decimal;
use serde::Serialize;

const SHORT_MA_PERIOD: usize = 20;
const LONG_MA_PERIOD: usize = 50;

/// One bar of the RSI analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiBar {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub rsi: Option<f64>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    /// 1 while holding the instrument at this bar's close, else 0.
    pub position: u8,
    pub daily_pnl: Decimal,
    pub cumulative_pnl: Decimal,
    /// The close at which a position was opened on this bar.
    pub buy_marker: Option<f64>,
    /// The close at which the position was closed on this bar.
    pub sell_marker: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiBacktestResult {
    pub symbol: String,
    pub interval: Interval,
    pub params: RsiParams,
    pub bars: Vec<RsiBar>,
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
}

/// Long-only RSI mean-reversion backtest.
///
/// Buys one unit at the close when flat and RSI drops below `oversold`,
/// sells at the close when RSI rises above `overbought`. A position still
/// held at the last bar is closed there with `OpenAtEnd` status.
#[derive(Debug)]
pub struct RsiBacktester {
    params: RsiParams,
    analytics_engine: AnalyticsEngine,
}

impl RsiBacktester {
    pub fn new(params: RsiParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            params,
            analytics_engine: AnalyticsEngine::new(),
        })
    }

    pub fn run(&self, series: &PriceSeries) -> Result<RsiBacktestResult, BacktestError> {
        indicators::ensure_len(series.len(), 1)?;

        let closes = series.closes();
        let rsi = indicators::rsi(&closes, self.params.window)?;
        let ma20 = indicators::sma(&closes, SHORT_MA_PERIOD)?;
        let ma50 = indicators::sma(&closes, LONG_MA_PERIOD)?;

        let mut ledger = TradeLedger::new(vec![series.symbol.clone()]);
        let mut bars = Vec::with_capacity(series.len());
        let mut in_position = false;
        let mut cumulative = Decimal::ZERO;
        let mut prev_price: Option<Decimal> = None;

        for (i, point) in series.points().iter().enumerate() {
            let price = decimal_from_f64(point.close, "close")?;

            // P&L accrues to the position held over the previous close.
            let daily_pnl = match prev_price {
                Some(prev) if in_position => price - prev,
                _ => Decimal::ZERO,
            };
            cumulative += daily_pnl;

            let mut buy_marker = None;
            let mut sell_marker = None;
            if let Some(value) = rsi[i] {
                if !in_position && value < self.params.oversold {
                    ledger.open(TradeDirection::Long, point.timestamp, price, Some(value));
                    in_position = true;
                    buy_marker = Some(point.close);
                } else if in_position && value > self.params.overbought {
                    ledger.close(point.timestamp, price, Some(value), TradeStatus::Closed);
                    in_position = false;
                    sell_marker = Some(point.close);
                }
            }

            bars.push(RsiBar {
                timestamp: point.timestamp,
                price: point.close,
                rsi: rsi[i],
                ma20: ma20[i],
                ma50: ma50[i],
                position: u8::from(in_position),
                daily_pnl,
                cumulative_pnl: cumulative,
                buy_marker,
                sell_marker,
            });
            prev_price = Some(price);
        }

        let trades = match (bars.last(), prev_price) {
            (Some(last), Some(price)) => ledger.finish(last.timestamp, price, last.rsi),
            _ => Vec::new(),
        };

        let pnl_curve: Vec<(DateTime<Utc>, Decimal)> =
            bars.iter().map(|b| (b.timestamp, b.cumulative_pnl)).collect();
        let report = self.analytics_engine.calculate(&trades, &pnl_curve)?;

        tracing::info!(
            symbol = %series.symbol,
            bars = bars.len(),
            trades = trades.len(),
            net_pnl = %report.total_net_pnl,
            "RSI backtest complete"
        );

        Ok(RsiBacktestResult {
            symbol: series.symbol.clone(),
            interval: series.interval,
            params: self.params,
            bars,
            trades,
            report,
        })
    }
}
