use configuration::ConfigError;
use core_types::CoreError;
use indicators::IndicatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Invalid input data: {0}")]
    InvalidData(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ConfigError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
