use std::collections::HashMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{
    Config, CorrelationParams, DataConfig, DataSourceKind, LoggingConfig, ReturnRiskParams,
    RollingCorrelationParams, RsiParams, ServerConfig, SpreadParams,
};

/// Prefix of environment variables that override file values,
/// e.g. `QUANTLENS__RSI__WINDOW=21`.
pub const ENV_PREFIX: &str = "QUANTLENS";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file at
/// `path` (optional; a missing file is not an error), then `QUANTLENS__*`
/// environment variables. The result is validated before it is returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_env(path, None)
}

/// Like [`load_config`], but reads overrides from `env` instead of the
/// process environment when it is `Some`.
pub fn load_config_with_env(
    path: &Path,
    env: Option<HashMap<String, String>>,
) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}
