use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid backtest parameters: {0}")]
    InvalidParameters(#[from] configuration::ConfigError),

    #[error("Indicator calculation error: {0}")]
    Indicator(#[from] indicators::IndicatorError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Invalid price data: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Backtest expects a pair of symbols, got {0}")]
    NotAPair(usize),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
