//! Terminal rendering of analysis results.

use analytics::{PerformanceReport, ReturnRiskReport};
use backtester::{RsiBacktestResult, SpreadBacktestResult};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use core_types::Trade;
use correlation::{CorrelationMatrix, RollingCorrelationResult};

/// Rows shown from the tail of long per-bar tables.
const TAIL_ROWS: usize = 10;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/// Values that are already expressed in percent.
fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => "-".to_string(),
    }
}

fn tail<T>(rows: &[T]) -> &[T] {
    &rows[rows.len().saturating_sub(TAIL_ROWS)..]
}

fn print_trades(trades: &[Trade]) {
    if trades.is_empty() {
        println!("No trades were generated.");
        return;
    }
    let mut table = new_table();
    table.set_header(vec![
        "Direction", "Entry", "Entry Price", "Exit", "Exit Price", "P&L", "Status",
    ]);
    for trade in trades {
        table.add_row(vec![
            Cell::new(format!("{:?}", trade.direction)),
            Cell::new(trade.entry_time.format("%Y-%m-%d %H:%M")),
            Cell::new(trade.entry_price.round_dp(4)).set_alignment(CellAlignment::Right),
            Cell::new(trade.exit_time.format("%Y-%m-%d %H:%M")),
            Cell::new(trade.exit_price.round_dp(4)).set_alignment(CellAlignment::Right),
            Cell::new(trade.pnl.round_dp(4)).set_alignment(CellAlignment::Right),
            Cell::new(trade.status),
        ]);
    }
    println!("{table}");
}

fn print_report(report: &PerformanceReport) {
    let dec = |v: Option<rust_decimal::Decimal>| match v {
        Some(v) => v.round_dp(2).to_string(),
        None => "-".to_string(),
    };
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Total Trades".to_string(), report.total_trades.to_string()]);
    table.add_row(vec![
        "Winning / Losing".to_string(),
        format!("{} / {}", report.winning_trades, report.losing_trades),
    ]);
    table.add_row(vec!["Win Rate %".to_string(), dec(report.win_rate_pct)]);
    table.add_row(vec!["Net P&L".to_string(), report.total_net_pnl.round_dp(4).to_string()]);
    table.add_row(vec!["Gross Profit".to_string(), report.gross_profit.round_dp(4).to_string()]);
    table.add_row(vec!["Gross Loss".to_string(), report.gross_loss.round_dp(4).to_string()]);
    table.add_row(vec!["Profit Factor".to_string(), dec(report.profit_factor)]);
    table.add_row(vec!["Payoff Ratio".to_string(), dec(report.payoff_ratio)]);
    table.add_row(vec!["Max Drawdown".to_string(), report.max_drawdown.round_dp(4).to_string()]);
    table.add_row(vec![
        "Avg Holding Period".to_string(),
        format!("{:.1} days", report.average_holding_period.as_secs_f64() / 86_400.0),
    ]);
    println!("{table}");
}

pub fn print_rsi(result: &RsiBacktestResult) {
    println!(
        "\nRSI({}) for {} [{}]  oversold {} / overbought {}",
        result.params.window,
        result.symbol,
        result.interval,
        result.params.oversold,
        result.params.overbought
    );

    let mut table = new_table();
    table.set_header(vec!["Date", "Close", "RSI", "MA20", "MA50", "Position", "Cum. P&L"]);
    for bar in tail(&result.bars) {
        table.add_row(vec![
            bar.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.2}", bar.price),
            opt(bar.rsi, 2),
            opt(bar.ma20, 2),
            opt(bar.ma50, 2),
            bar.position.to_string(),
            bar.cumulative_pnl.round_dp(4).to_string(),
        ]);
    }
    println!("{table}");

    print_trades(&result.trades);
    print_report(&result.report);
}

pub fn print_return_risk(report: &ReturnRiskReport) {
    let s = &report.summary;
    println!("\nReturn & risk for {} [{}]", report.symbol, report.interval);

    let mut table = new_table();
    table.set_header(vec!["Statistic", "Value"]);
    table.add_row(vec!["Observations".to_string(), s.observations.to_string()]);
    table.add_row(vec!["Mean Return".to_string(), pct(Some(s.mean))]);
    table.add_row(vec!["Std. Deviation".to_string(), pct(s.std_dev)]);
    table.add_row(vec!["Skewness".to_string(), opt(s.skewness, 4)]);
    table.add_row(vec!["Excess Kurtosis".to_string(), opt(s.excess_kurtosis, 4)]);
    table.add_row(vec!["Worst Return".to_string(), pct(Some(s.min))]);
    table.add_row(vec!["Best Return".to_string(), pct(Some(s.max))]);
    table.add_row(vec!["Annualized Volatility".to_string(), pct(s.annualized_volatility)]);
    table.add_row(vec![
        "Max Drawdown".to_string(),
        format!(
            "{} ({} -> {})",
            pct(Some(s.max_drawdown.pct)),
            s.max_drawdown.peak_time.format("%Y-%m-%d"),
            s.max_drawdown.trough_time.format("%Y-%m-%d")
        ),
    ]);
    println!("{table}");

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
}

pub fn print_correlation_matrix(result: &CorrelationMatrix) {
    println!(
        "\nCorrelation of {} over {} observations",
        result.basis, result.observations
    );
    if !result.dropped.is_empty() {
        println!("Dropped (no data): {}", result.dropped.join(", "));
    }

    let mut table = new_table();
    let mut header = vec![String::new()];
    header.extend(result.symbols.iter().cloned());
    table.set_header(header);
    for (symbol, row) in result.symbols.iter().zip(&result.matrix) {
        let mut cells = vec![Cell::new(symbol)];
        cells.extend(
            row.iter()
                .map(|v| Cell::new(opt(*v, 3)).set_alignment(CellAlignment::Right)),
        );
        table.add_row(cells);
    }
    println!("{table}");
}

pub fn print_rolling_correlation(result: &RollingCorrelationResult) {
    let s = &result.summary;
    println!(
        "\n{}-bar rolling correlation of {} and {} ({})",
        result.params.window, result.symbol1, result.symbol2, result.params.basis
    );
    println!(
        "latest {}  mean {}  min {}  max {}  full sample {}",
        opt(s.latest, 3),
        opt(s.mean, 3),
        opt(s.min, 3),
        opt(s.max, 3),
        opt(s.full_sample, 3)
    );
    println!(
        "signals: {} unusually high, {} unusually low{}",
        s.high_signals,
        s.low_signals,
        if s.expanding_bands {
            " (expanding bands)"
        } else {
            ""
        }
    );

    let mut table = new_table();
    table.set_header(vec!["Date", "Correlation", "Lower", "Mean", "Upper", "Signal"]);
    for row in tail(&result.rows) {
        table.add_row(vec![
            row.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.3}", row.correlation),
            opt(row.lower_band, 3),
            opt(row.band_mean, 3),
            opt(row.upper_band, 3),
            row.signal.value().to_string(),
        ]);
    }
    println!("{table}");
}

pub fn print_spread(result: &SpreadBacktestResult) {
    println!(
        "\nSpread {} - {:.4} x {}  (window {})",
        result.symbol2, result.hedge_ratio, result.symbol1, result.params.window
    );

    let mut table = new_table();
    table.set_header(vec!["Date", "Spread", "Mean", "Std", "Z-Score", "Position", "Cum. P&L"]);
    for bar in tail(&result.bars) {
        table.add_row(vec![
            bar.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.4}", bar.spread),
            opt(bar.spread_mean, 4),
            opt(bar.spread_std, 4),
            opt(bar.zscore, 2),
            bar.position.to_string(),
            bar.cumulative_pnl.round_dp(4).to_string(),
        ]);
    }
    println!("{table}");

    print_trades(&result.trades);
    print_report(&result.report);
}
