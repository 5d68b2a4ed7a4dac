use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use analytics::AnalyticsError;
use backtester::BacktestError;
use configuration::ConfigError;
use correlation::CorrelationError;
use market_data::MarketDataError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MarketData(#[from] MarketDataError),
    #[error("{0}")]
    Analytics(#[from] AnalyticsError),
    #[error("{0}")]
    Correlation(#[from] CorrelationError),
    #[error("{0}")]
    Backtest(#[from] BacktestError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MarketData(e) => match e {
                MarketDataError::DataUnavailable { .. } => StatusCode::NOT_FOUND,
                MarketDataError::InvalidRange(_) | MarketDataError::InvalidSymbol(_) => {
                    StatusCode::BAD_REQUEST
                }
                MarketDataError::Io { .. } | MarketDataError::Csv { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Analytics(e) => match e {
                AnalyticsError::NotEnoughData(_)
                | AnalyticsError::InvalidData(_)
                | AnalyticsError::InvalidParameters(_)
                | AnalyticsError::Indicator(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Correlation(e) => match e {
                CorrelationError::TooFewSymbols { .. }
                | CorrelationError::NotEnoughData(_)
                | CorrelationError::InvalidData(_)
                | CorrelationError::InvalidParameters(_)
                | CorrelationError::Indicator(_) => StatusCode::BAD_REQUEST,
                CorrelationError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Backtest(e) => match e {
                BacktestError::InvalidParameters(_)
                | BacktestError::Indicator(_)
                | BacktestError::NotAPair(_)
                | BacktestError::Calculation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status.is_server_error() {
            tracing::error!(error = ?self, %status, "Request failed.");
            match status {
                StatusCode::BAD_GATEWAY => format!("The market data provider failed: {}", self),
                _ => "An internal error occurred during analysis".to_string(),
            }
        } else {
            tracing::debug!(error = %self, %status, "Request rejected.");
            self.to_string()
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
