use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::Trade;
use rust_decimal::Decimal;

/// A stateless calculator for deriving performance metrics from backtest activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - Every trade of the run, including one still open at the end.
    /// * `pnl_curve` - The cumulative P&L after each bar.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PerformanceReport` or an `AnalyticsError`.
    pub fn calculate(
        &self,
        trades: &[Trade],
        pnl_curve: &[(DateTime<Utc>, Decimal)],
    ) -> Result<PerformanceReport, AnalyticsError> {
        let mut report = PerformanceReport::new();

        // The drawdown is a property of the curve and is reported even for a
        // run without trades (it is then zero).
        self.calculate_drawdown(pnl_curve, &mut report);

        if trades.is_empty() {
            return Ok(report);
        }

        self.calculate_profitability(trades, &mut report);
        self.calculate_time_metrics(trades, &mut report)?;

        Ok(report)
    }

    /// Calculates all profitability-related metrics.
    ///
    /// Break-even trades count towards the total but are neither winners nor losers.
    fn calculate_profitability(&self, trades: &[Trade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();

        for trade in trades {
            report.total_net_pnl += trade.pnl;

            if trade.is_winner() {
                report.gross_profit += trade.pnl;
                report.winning_trades += 1;
            } else if trade.pnl < Decimal::ZERO {
                report.gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
            }
        }

        // --- Ratios ---
        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }

        report.win_rate_pct = Some(
            (Decimal::from(report.winning_trades) / Decimal::from(report.total_trades))
                * Decimal::ONE_HUNDRED,
        );

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            report.payoff_ratio = Some(report.average_win / report.average_loss);
        }
    }

    /// Calculates maximum drawdown from the cumulative P&L curve, which starts at zero.
    fn calculate_drawdown(
        &self,
        pnl_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) {
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;

        for &(_timestamp, pnl) in pnl_curve {
            if pnl > peak {
                peak = pnl;
            }
            let drawdown = peak - pnl;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        report.max_drawdown = max_drawdown;
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(
        &self,
        trades: &[Trade],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        let total_duration_secs: i64 = trades.iter().map(|t| t.duration().num_seconds()).sum();

        let avg_secs = total_duration_secs / trades.len() as i64;
        report.average_holding_period = u64::try_from(avg_secs)
            .map(std::time::Duration::from_secs)
            .map_err(|_| {
                AnalyticsError::Calculation(format!(
                    "negative average holding period of {}s",
                    avg_secs
                ))
            })?;

        Ok(())
    }
}
