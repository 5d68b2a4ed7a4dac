//! # QuantLens Core Types
//!
//! The shared vocabulary of the workspace: price series, aligned panels,
//! intervals and backtest trades. Every other crate depends on this one and
//! this one depends on nothing inside the workspace.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{CorrelationBasis, Interval, TradeDirection, TradeStatus};
pub use error::CoreError;
pub use structs::{decimal_from_f64, pct_returns, PricePanel, PricePoint, PriceSeries, Trade};
