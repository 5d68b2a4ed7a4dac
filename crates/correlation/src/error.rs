use configuration::ConfigError;
use core_types::CoreError;
use indicators::IndicatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("Correlation requires at least {required} symbols, got {got}")]
    TooFewSymbols { required: usize, got: usize },

    #[error("Not enough overlapping data: {0}")]
    NotEnoughData(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ConfigError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Invalid input data: {0}")]
    InvalidData(String),
}
