use core_types::{CoreError, Interval};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP request to the data provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The data provider returned an error: {0}")]
    Provider(String),

    #[error("Failed to deserialize the provider response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from provider: {0}")]
    InvalidData(String),

    #[error("No price data available for {symbol} ({interval}) in the requested period")]
    DataUnavailable { symbol: String, interval: Interval },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid symbol '{0}': expected letters, digits and . ^ = -")]
    InvalidSymbol(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid price series: {0}")]
    Core(#[from] CoreError),
}

impl MarketDataError {
    /// True when the request was well-formed but there is simply no data.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, MarketDataError::DataUnavailable { .. })
    }
}
