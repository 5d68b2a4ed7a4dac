use crate::error::ConfigError;
use core_types::{CorrelationBasis, Interval};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty (or missing) `config.toml` is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub rsi: RsiParams,
    pub return_risk: ReturnRiskParams,
    pub correlation: CorrelationParams,
    pub rolling_correlation: RollingCorrelationParams,
    pub spread: SpreadParams,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates every section. Called by the loaders after deserialisation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data.validate()?;
        self.rsi.validate()?;
        self.return_risk.validate()?;
        self.rolling_correlation.validate()?;
        self.spread.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

/// Where price data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DataSourceKind {
    /// The public Yahoo Finance chart API.
    #[default]
    Yahoo,
    /// A directory of `{SYMBOL}.csv` files.
    Csv,
}

/// Settings for the market data layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source: DataSourceKind,
    /// Base URL of the chart API.
    pub base_url: String,
    /// Directory searched by the CSV source.
    pub csv_dir: PathBuf,
    /// Interval used when a request does not name one.
    pub default_interval: Interval,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Prefer split/dividend adjusted closes when the provider reports them.
    pub adjusted: bool,
    /// Length of the date range, ending today, used when a request gives no start.
    pub default_lookback_days: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: DataSourceKind::Yahoo,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            csv_dir: PathBuf::from("data"),
            default_interval: Interval::Daily,
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (compatible; quantlens/0.1)".to_string(),
            adjusted: true,
            default_lookback_days: 365,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source == DataSourceKind::Yahoo && self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "data.base_url must be set when data.source is 'yahoo'".to_string(),
            ));
        }
        if self.default_lookback_days == 0 {
            return Err(ConfigError::ValidationError(
                "data.default_lookback_days must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "data.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for the RSI analyzer and its long-only backtest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RsiParams {
    /// RSI lookback in bars.
    pub window: usize,
    /// Buy trigger: enter when RSI falls below this level.
    pub oversold: f64,
    /// Sell trigger: exit when RSI rises above this level.
    pub overbought: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            window: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "rsi.window must be at least 2, got {}",
                self.window
            )));
        }
        if !(0.0..=100.0).contains(&self.oversold) || !(0.0..=100.0).contains(&self.overbought) {
            return Err(ConfigError::ValidationError(
                "rsi levels must lie within [0, 100]".to_string(),
            ));
        }
        if self.oversold >= self.overbought {
            return Err(ConfigError::ValidationError(format!(
                "rsi.oversold ({}) must be below rsi.overbought ({})",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }
}

/// Parameters for the return/risk summary.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReturnRiskParams {
    /// Window of the rolling volatility series, in returns.
    pub rolling_window: usize,
    pub histogram_bins: usize,
    /// Number of points sampled for the fitted normal curve.
    pub normal_fit_points: usize,
}

impl Default for ReturnRiskParams {
    fn default() -> Self {
        Self {
            rolling_window: 21,
            histogram_bins: 50,
            normal_fit_points: 500,
        }
    }
}

impl ReturnRiskParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "return_risk.rolling_window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::ValidationError(
                "return_risk.histogram_bins must be greater than zero".to_string(),
            ));
        }
        if self.normal_fit_points < 2 {
            return Err(ConfigError::ValidationError(
                "return_risk.normal_fit_points must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for the static correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationParams {
    pub basis: CorrelationBasis,
}

/// Parameters for the rolling correlation analysis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RollingCorrelationParams {
    /// Window of the rolling Pearson correlation.
    pub window: usize,
    /// Window of the moving average/std that forms the bands.
    pub band_window: usize,
    /// Band half-width in standard deviations.
    pub band_std_dev: f64,
    pub basis: CorrelationBasis,
}

impl Default for RollingCorrelationParams {
    fn default() -> Self {
        Self {
            window: 30,
            band_window: 100,
            band_std_dev: 1.0,
            basis: CorrelationBasis::Prices,
        }
    }
}

impl RollingCorrelationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "rolling_correlation.window must be at least 2, got {}",
                self.window
            )));
        }
        if self.band_window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "rolling_correlation.band_window must be at least 2, got {}",
                self.band_window
            )));
        }
        if !self.band_std_dev.is_finite() || self.band_std_dev <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "rolling_correlation.band_std_dev must be a positive number, got {}",
                self.band_std_dev
            )));
        }
        Ok(())
    }
}

/// Parameters for the spread z-score analysis and pairs backtest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpreadParams {
    /// Lookback of the rolling mean/std of the spread.
    pub window: usize,
    /// Enter short the spread above this z-score.
    pub entry_upper: f64,
    /// Enter long the spread below this z-score.
    pub entry_lower: f64,
    /// Exit when |z| falls below this level.
    pub exit_band: f64,
}

impl Default for SpreadParams {
    fn default() -> Self {
        Self {
            window: 60,
            entry_upper: 1.5,
            entry_lower: -1.5,
            exit_band: 0.5,
        }
    }
}

impl SpreadParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "spread.window must be at least 2, got {}",
                self.window
            )));
        }
        let finite = [self.entry_upper, self.entry_lower, self.exit_band]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.entry_lower >= 0.0 || self.entry_upper <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "spread bands must satisfy entry_lower < 0 < entry_upper, got {} / {}",
                self.entry_lower, self.entry_upper
            )));
        }
        let widest_exit = self.entry_upper.min(-self.entry_lower);
        if self.exit_band < 0.0 || self.exit_band >= widest_exit {
            return Err(ConfigError::ValidationError(format!(
                "spread.exit_band must lie in [0, {}), got {}",
                widest_exit, self.exit_band
            )));
        }
        Ok(())
    }
}

/// Where the HTTP API listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `host` may be an IP address or a hostname; it is resolved when binding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "quantlens.log".to_string(),
        }
    }
}
