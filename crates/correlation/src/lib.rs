//! # QuantLens Correlation
//!
//! Co-movement of several price series: the static Pearson correlation
//! matrix over N symbols, and the rolling correlation of a pair with
//! mean-reversion bands around it.
//!
//! Both analyses take an aligned `PricePanel`, so every observation used is
//! present for every symbol.

pub mod error;
pub mod matrix;
pub mod rolling;

// Re-export the key components to create a clean, public-facing API.
pub use error::CorrelationError;
pub use matrix::{CorrelationMatrix, correlation_matrix};
pub use rolling::{
    CorrelationSignal, RollingCorrelationResult, RollingCorrelationRow, RollingCorrelationSummary,
    rolling_correlation,
};

use core_types::{CorrelationBasis, PricePanel, pct_returns};

/// The columns of `panel` on the requested basis. Returns are one row
/// shorter than prices.
pub(crate) fn basis_columns(
    panel: &PricePanel,
    basis: CorrelationBasis,
) -> Result<Vec<Vec<f64>>, CorrelationError> {
    match basis {
        CorrelationBasis::Prices => Ok(panel.columns().to_vec()),
        CorrelationBasis::Returns => panel
            .columns()
            .iter()
            .zip(&panel.symbols)
            .map(|(column, symbol)| {
                let returns = pct_returns(column);
                if returns.iter().any(|r| !r.is_finite()) {
                    return Err(CorrelationError::InvalidData(format!(
                        "{} has a zero close, so its returns are undefined",
                        symbol
                    )));
                }
                Ok(returns)
            })
            .collect(),
    }
}
