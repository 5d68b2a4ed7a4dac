use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Indicator received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Not enough data: at least {required} observations are required, got {got}")]
    InsufficientData { required: usize, got: usize },
}
