//! # QuantLens Analytics
//!
//! This crate turns raw results into numbers a human can judge: the
//! `PerformanceReport` of a backtest and the return/risk summary of a single
//! price series.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types`, `configuration` and `indicators`.
//! - **Stateless Calculation:** The `AnalyticsEngine` is a stateless calculator. It takes
//!   trades and a P&L curve as input and produces a `PerformanceReport` as output.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The backtest performance calculator.
//! - `PerformanceReport`: The standardized struct that holds the trade metrics.
//! - `analyze_return_risk`: Distribution, drawdown and volatility of one series.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
pub mod return_risk;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
pub use return_risk::{
    Drawdown, Histogram, NormalFit, ReturnPoint, ReturnRiskReport, ReturnSummary,
    VolatilityPoint, analyze_return_risk,
};
