use analytics::analyze_return_risk;
use backtester::{PairsBacktester, RsiBacktester};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use configuration::{
    Config, CorrelationParams, DataSourceKind, ReturnRiskParams, RollingCorrelationParams,
    RsiParams, SpreadParams,
};
use core_types::{CorrelationBasis, Interval, PricePanel, PriceSeries};
use correlation::{correlation_matrix, rolling_correlation};
use indicatif::{ProgressBar, ProgressStyle};
use market_data::{MarketDataSource, fetch_pair, fetch_panel, normalize_symbol};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod tables;

/// The main entry point for the QuantLens analysis toolkit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = configuration::load_config(&cli.config)?;
    if let Some(source) = cli.source {
        config.data.source = source;
    }
    if let Some(dir) = cli.csv_dir {
        config.data.csv_dir = dir;
    }
    let _log_guard = configuration::init_tracing(&config.logging)?;
    tracing::debug!(config = ?cli.config, source = ?config.data.source, "Configuration loaded");

    // Execute the appropriate command
    match cli.command {
        Commands::Rsi(args) => handle_rsi(args, &config).await,
        Commands::ReturnRisk(args) => handle_return_risk(args, &config).await,
        Commands::CorrelationMatrix(args) => handle_correlation_matrix(args, &config).await,
        Commands::RollingCorrelation(args) => handle_rolling_correlation(args, &config).await,
        Commands::Spread(args) => handle_spread(args, &config).await,
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            web_server::run_server(config).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Technical, risk and correlation analysis of historical price series.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the TOML configuration file (optional).
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `data.source` from the configuration.
    #[arg(long, global = true, value_enum)]
    source: Option<DataSourceKind>,

    /// Overrides `data.csv_dir` from the configuration.
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// RSI with MA20/MA50 overlays and a long-only RSI backtest.
    Rsi(RsiArgs),
    /// Return distribution, drawdown and volatility of one symbol.
    ReturnRisk(ReturnRiskArgs),
    /// Pearson correlation matrix over two or more symbols.
    CorrelationMatrix(CorrelationMatrixArgs),
    /// Rolling correlation of a pair with bands and signals.
    RollingCorrelation(RollingCorrelationArgs),
    /// Spread z-score of a pair and the pairs-trading backtest.
    Spread(SpreadArgs),
    /// Serve every analysis as a JSON HTTP API.
    Serve(ServeArgs),
}

/// Options shared by every analysis command.
#[derive(Args)]
struct RangeArgs {
    /// First day to include (format: YYYY-MM-DD). Defaults to `data.default_lookback_days` before --to.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to include (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Bar interval: 1h, 1d, 1wk or 1mo. Defaults to `data.default_interval`.
    #[arg(long)]
    interval: Option<Interval>,

    /// Print the full result as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RsiArgs {
    /// The symbol to analyse (e.g., "AAPL").
    #[arg(long)]
    symbol: String,
    #[arg(long)]
    window: Option<usize>,
    #[arg(long)]
    oversold: Option<f64>,
    #[arg(long)]
    overbought: Option<f64>,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct ReturnRiskArgs {
    #[arg(long)]
    symbol: String,
    /// Window of the rolling volatility, in returns.
    #[arg(long)]
    rolling_window: Option<usize>,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct CorrelationMatrixArgs {
    /// Comma separated symbols (e.g., "AAPL,MSFT,SPY").
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    symbols: Vec<String>,
    /// Correlate prices or returns.
    #[arg(long)]
    basis: Option<CorrelationBasis>,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct RollingCorrelationArgs {
    #[arg(long)]
    symbol1: String,
    #[arg(long)]
    symbol2: String,
    #[arg(long)]
    window: Option<usize>,
    #[arg(long)]
    band_window: Option<usize>,
    #[arg(long)]
    band_std_dev: Option<f64>,
    #[arg(long)]
    basis: Option<CorrelationBasis>,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct SpreadArgs {
    /// The regressor leg (x).
    #[arg(long)]
    symbol1: String,
    /// The dependent leg (y).
    #[arg(long)]
    symbol2: String,
    #[arg(long)]
    window: Option<usize>,
    #[arg(long, allow_hyphen_values = true)]
    entry_upper: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    entry_lower: Option<f64>,
    #[arg(long)]
    exit_band: Option<f64>,
    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct ServeArgs {
    /// Overrides `server.host`.
    #[arg(long)]
    host: Option<String>,
    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Resolved interval and UTC bounds of a request.
struct Window {
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RangeArgs {
    fn resolve(&self, config: &Config) -> anyhow::Result<Window> {
        let today = Utc::now().date_naive();
        let (start, end) = market_data::resolve_range(
            self.from,
            self.to,
            config.data.default_lookback_days,
            today,
        )?;
        Ok(Window {
            interval: self.interval.unwrap_or(config.data.default_interval),
            start,
            end,
        })
    }
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn source(config: &Config) -> anyhow::Result<Arc<dyn MarketDataSource>> {
    Ok(market_data::build_source(&config.data)?)
}

async fn load_series(config: &Config, symbol: &str, window: &Window) -> anyhow::Result<PriceSeries> {
    let source = source(config)?;
    let pb = spinner(format!("Fetching {} ({}) from {}...", symbol, window.interval, source.name()))?;
    let result = source
        .fetch_series(symbol, window.interval, window.start, window.end)
        .await;
    pb.finish_and_clear();
    let series = result?;
    tracing::info!(symbol, bars = series.len(), "Price series loaded");
    Ok(series)
}

async fn load_pair(
    config: &Config,
    symbol1: &str,
    symbol2: &str,
    window: &Window,
) -> anyhow::Result<PricePanel> {
    let source = source(config)?;
    let pb = spinner(format!("Fetching {} and {} ({})...", symbol1, symbol2, window.interval))?;
    let result = fetch_pair(
        source.as_ref(),
        symbol1,
        symbol2,
        window.interval,
        window.start,
        window.end,
    )
    .await;
    pb.finish_and_clear();
    Ok(result?)
}

/// Both legs of a pair analysis, normalised; they must differ.
fn pair_symbols(symbol1: &str, symbol2: &str) -> anyhow::Result<(String, String)> {
    let first = normalize_symbol(symbol1)?;
    let second = normalize_symbol(symbol2)?;
    if first == second {
        anyhow::bail!("--symbol1 and --symbol2 must differ, both are {}", first);
    }
    Ok((first, second))
}

fn print_json(value: Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn handle_rsi(args: RsiArgs, config: &Config) -> anyhow::Result<()> {
    let params = RsiParams {
        window: args.window.unwrap_or(config.rsi.window),
        oversold: args.oversold.unwrap_or(config.rsi.oversold),
        overbought: args.overbought.unwrap_or(config.rsi.overbought),
    };
    let backtester = RsiBacktester::new(params)?;
    let window = args.range.resolve(config)?;
    let series = load_series(config, &normalize_symbol(&args.symbol)?, &window).await?;

    let result = backtester.run(&series)?;
    if args.range.json {
        return print_json(serde_json::to_value(&result)?);
    }
    tables::print_rsi(&result);
    Ok(())
}

async fn handle_return_risk(args: ReturnRiskArgs, config: &Config) -> anyhow::Result<()> {
    let params = ReturnRiskParams {
        rolling_window: args.rolling_window.unwrap_or(config.return_risk.rolling_window),
        ..config.return_risk
    };
    params.validate()?;
    let window = args.range.resolve(config)?;
    let series = load_series(config, &normalize_symbol(&args.symbol)?, &window).await?;

    let report = analyze_return_risk(&series, &params)?;
    if args.range.json {
        return print_json(serde_json::to_value(&report)?);
    }
    tables::print_return_risk(&report);
    Ok(())
}

async fn handle_correlation_matrix(
    args: CorrelationMatrixArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let params = CorrelationParams {
        basis: args.basis.unwrap_or(config.correlation.basis),
    };
    let mut symbols: Vec<String> = Vec::new();
    for raw in args.symbols.iter().filter(|s| !s.trim().is_empty()) {
        let symbol = normalize_symbol(raw)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.len() < 2 {
        anyhow::bail!(
            "Correlation matrix requires at least two symbols. You selected {}.",
            symbols.len()
        );
    }

    let window = args.range.resolve(config)?;
    let source = source(config)?;
    let pb = spinner(format!("Fetching {} symbols ({})...", symbols.len(), window.interval))?;
    let result = fetch_panel(
        source.as_ref(),
        &symbols,
        window.interval,
        window.start,
        window.end,
    )
    .await;
    pb.finish_and_clear();
    let panel = result?;

    let matrix = correlation_matrix(&panel, &params)?;
    if args.range.json {
        return print_json(serde_json::to_value(&matrix)?);
    }
    tables::print_correlation_matrix(&matrix);
    Ok(())
}

async fn handle_rolling_correlation(
    args: RollingCorrelationArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let defaults = config.rolling_correlation;
    let params = RollingCorrelationParams {
        window: args.window.unwrap_or(defaults.window),
        band_window: args.band_window.unwrap_or(defaults.band_window),
        band_std_dev: args.band_std_dev.unwrap_or(defaults.band_std_dev),
        basis: args.basis.unwrap_or(defaults.basis),
    };
    params.validate()?;
    let window = args.range.resolve(config)?;
    let (symbol1, symbol2) = pair_symbols(&args.symbol1, &args.symbol2)?;
    let panel = load_pair(config, &symbol1, &symbol2, &window).await?;

    let result = rolling_correlation(&panel, &params)?;
    if args.range.json {
        return print_json(serde_json::to_value(&result)?);
    }
    tables::print_rolling_correlation(&result);
    Ok(())
}

async fn handle_spread(args: SpreadArgs, config: &Config) -> anyhow::Result<()> {
    let defaults = config.spread;
    let params = SpreadParams {
        window: args.window.unwrap_or(defaults.window),
        entry_upper: args.entry_upper.unwrap_or(defaults.entry_upper),
        entry_lower: args.entry_lower.unwrap_or(defaults.entry_lower),
        exit_band: args.exit_band.unwrap_or(defaults.exit_band),
    };
    let backtester = PairsBacktester::new(params)?;
    let window = args.range.resolve(config)?;
    let (symbol1, symbol2) = pair_symbols(&args.symbol1, &args.symbol2)?;
    let panel = load_pair(config, &symbol1, &symbol2, &window).await?;

    let result = backtester.run(&panel)?;
    if args.range.json {
        return print_json(serde_json::to_value(&result)?);
    }
    tables::print_spread(&result);
    Ok(())
}
