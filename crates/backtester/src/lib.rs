//! # QuantLens Backtester
//!
//! Replays a threshold rule bar by bar over historical closes and hands the
//! resulting trades and P&L curve to the `AnalyticsEngine`.
//!
//! - `RsiBacktester`: long-only RSI oversold/overbought rule on one series,
//!   together with the RSI and moving-average overlays.
//! - `PairsBacktester`: spread z-score rule on an aligned pair of series.
//!
//! Every trade is one unit of the instrument (or of the spread); fills happen
//! at the close of the bar that produced the signal.

pub mod error;
mod ledger;
pub mod rsi;
pub mod spread;

pub use error::BacktestError;
pub use rsi::{RsiBacktestResult, RsiBacktester, RsiBar};
pub use spread::{PairsBacktester, SpreadBacktestResult, SpreadBar};
