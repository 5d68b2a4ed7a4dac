use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Unknown interval '{0}' (expected one of 1h, 1d, 1wk, 1mo)")]
    UnknownInterval(String),

    #[error("Calculation error: {0}")]
    Calculation(String),
}
