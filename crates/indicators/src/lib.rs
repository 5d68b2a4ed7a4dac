//! # QuantLens Indicators
//!
//! Pure numeric building blocks shared by every analysis: the Wilder RSI and
//! moving-average overlays, plus the descriptive, rolling and correlation
//! statistics the higher-level crates are assembled from.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** No I/O, no configuration, no async. Inputs are plain
//!   `f64` slices so the functions can be reused for prices, returns or
//!   spreads alike.
//! - **No NaN:** Every value that cannot be computed (warm-up, zero variance)
//!   is reported as `None`.
//! - **`ta` compatible:** Streaming indicators implement `ta::Next`,
//!   `ta::Reset` and `ta::Period`.

pub mod error;
pub mod moving_average;
pub mod rsi;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use error::IndicatorError;
pub use moving_average::{MovingAverage, sma};
pub use rsi::{WilderRsi, rsi};

/// Fails with `InsufficientData` when fewer than `required` observations exist.
pub fn ensure_len(got: usize, required: usize) -> Result<(), IndicatorError> {
    if got < required {
        return Err(IndicatorError::InsufficientData { required, got });
    }
    Ok(())
}
