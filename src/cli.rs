//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::series_csv_report::SeriesCsvReport;
use crate::adapters::svg_chart_report::SvgChartReport;
use crate::domain::backtest::{BacktestConfig, BacktestResult, Engine};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::strategies::{build_strategy, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "barsim", about = "Single-instrument bar-by-bar backtester")]
pub struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        /// Strategy name, overriding [strategy] name
        #[arg(long)]
        strategy: Option<String>,
        /// Portfolio series CSV output, overriding [report] series_path
        #[arg(long)]
        series_out: Option<PathBuf>,
        /// SVG chart output, overriding [report] chart_path
        #[arg(long)]
        chart_out: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List available symbols on an exchange
    ListSymbols {
        #[arg(long)]
        exchange: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for a symbol, or every symbol on the exchange
    Info {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a single backtest run needs once configuration is resolved.
#[derive(Debug, Clone)]
pub struct BacktestRequest {
    pub exchange: String,
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub config: BacktestConfig,
    pub strategy: StrategyParams,
    pub series_out: Option<PathBuf>,
    pub chart_out: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), BacktestError> {
    match command {
        Command::Backtest {
            config,
            ticker,
            exchange,
            strategy,
            series_out,
            chart_out,
            dry_run,
        } => {
            let overrides = Overrides {
                ticker,
                exchange,
                strategy,
                series_out,
                chart_out,
            };
            run_backtest(&config, overrides, dry_run)
        }
        Command::ListSymbols { exchange, config } => run_list_symbols(&exchange, &config),
        Command::Info {
            ticker,
            exchange,
            config,
        } => run_info(ticker.as_deref(), exchange.as_deref(), &config),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries command
/// output only. Repeated calls are no-ops.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    FileConfigAdapter::from_file(path)
}

struct Overrides {
    ticker: Option<String>,
    exchange: Option<String>,
    strategy: Option<String>,
    series_out: Option<PathBuf>,
    chart_out: Option<PathBuf>,
}

/// Config view with command-line values layered over the file. Only string
/// keys are ever overridden; numeric lookups go straight to the file.
struct LayeredConfig<'a> {
    base: &'a dyn ConfigPort,
    values: Vec<(&'static str, &'static str, String)>,
}

impl<'a> LayeredConfig<'a> {
    fn new(base: &'a dyn ConfigPort) -> Self {
        LayeredConfig {
            base,
            values: Vec::new(),
        }
    }

    fn set(&mut self, section: &'static str, key: &'static str, value: Option<String>) {
        if let Some(v) = value {
            self.values.push((section, key, v));
        }
    }
}

impl ConfigPort for LayeredConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .iter()
            .find(|(s, k, _)| *s == section && *k == key)
            .map(|(_, _, v)| v.clone())
            .or_else(|| self.base.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.base.get_int(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.base.get_double(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.base.get_bool(section, key, default)
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        initial_cash: adapter.get_double("backtest", "initial_cash", defaults.initial_cash),
        trading_days: adapter.get_int("backtest", "trading_days", 252) as f64,
        days_in_year: adapter.get_int("backtest", "days_in_year", 365) as f64,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    }
}

fn period(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, BacktestError> {
    let raw = adapter.get_int("strategy", key, default as i64);
    usize::try_from(raw).map_err(|_| BacktestError::ConfigInvalid {
        section: "strategy".into(),
        key: key.into(),
        reason: format!("{raw} is not a valid period"),
    })
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<StrategyParams, BacktestError> {
    let defaults = StrategyParams::default();
    Ok(StrategyParams {
        name: adapter
            .get_string("strategy", "name")
            .map(|n| n.trim().to_string())
            .unwrap_or(defaults.name),
        size: adapter.get_double("strategy", "size", defaults.size),
        fast_period: period(adapter, "fast_period", defaults.fast_period)?,
        slow_period: period(adapter, "slow_period", defaults.slow_period)?,
        discount_pct: adapter.get_double("strategy", "discount_pct", defaults.discount_pct),
        markup_pct: adapter.get_double("strategy", "markup_pct", defaults.markup_pct),
    })
}

fn required(adapter: &dyn ConfigPort, section: &str, key: &str) -> Result<String, BacktestError> {
    adapter
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

/// Validate the whole file and resolve it into a request. CLI overrides
/// take precedence over config values.
fn resolve_request(
    file: &dyn ConfigPort,
    overrides: Overrides,
) -> Result<BacktestRequest, BacktestError> {
    let mut adapter = LayeredConfig::new(file);
    adapter.set("backtest", "ticker", overrides.ticker);
    adapter.set("backtest", "exchange", overrides.exchange);
    adapter.set("strategy", "name", overrides.strategy);

    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let report_path = |key: &str| adapter.get_string("report", key).map(PathBuf::from);

    Ok(BacktestRequest {
        exchange: required(&adapter, "backtest", "exchange")?.to_uppercase(),
        ticker: required(&adapter, "backtest", "ticker")?.to_uppercase(),
        start_date: parse_date(
            adapter.get_string("backtest", "start_date").as_deref(),
            "start_date",
        )?,
        end_date: parse_date(
            adapter.get_string("backtest", "end_date").as_deref(),
            "end_date",
        )?,
        config: build_backtest_config(&adapter),
        strategy: build_strategy_params(&adapter)?,
        series_out: overrides.series_out.or_else(|| report_path("series_path")),
        chart_out: overrides.chart_out.or_else(|| report_path("chart_path")),
    })
}

#[cfg(any(not(feature = "sqlite"), not(feature = "postgres")))]
fn missing_feature(source: &str) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: "data".into(),
        key: "source".into(),
        reason: format!("built without the {source} feature"),
    }
}

/// Open the configured bar source (`[data] source`).
pub fn open_data_port(adapter: &dyn ConfigPort) -> Result<Box<dyn DataPort>, BacktestError> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "csv" => {
            let dir = required(adapter, "data", "csv_dir")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            Ok(Box::new(SqliteAdapter::from_config(adapter)?))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            use crate::adapters::postgres_adapter::PostgresAdapter;
            Ok(Box::new(PostgresAdapter::from_config(adapter)?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(missing_feature("sqlite")),
        #[cfg(not(feature = "postgres"))]
        "postgres" => Err(missing_feature("postgres")),
        other => Err(BacktestError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{other}'"),
        }),
    }
}

fn run_backtest(
    config_path: &Path,
    overrides: Overrides,
    dry_run: bool,
) -> Result<(), BacktestError> {
    eprintln!("Loading config from {}", config_path.display());
    let file = load_config(config_path)?;
    let request = resolve_request(&file, overrides)?;

    if dry_run {
        print_plan(&request);
        eprintln!("\nDry run complete: configuration is valid");
        return Ok(());
    }

    let data_port = open_data_port(&file)?;
    run_backtest_pipeline(data_port.as_ref(), &request)?;
    Ok(())
}

fn print_plan(request: &BacktestRequest) {
    let s = &request.strategy;
    eprintln!("\nInstrument:     {}.{}", request.ticker, request.exchange);
    eprintln!("Period:         {} to {}", request.start_date, request.end_date);
    eprintln!("Initial cash:   {:.2}", request.config.initial_cash);
    eprintln!("Strategy:       {}", s.name);
    match s.name.as_str() {
        "sma_cross" => eprintln!(
            "  fast_period={} slow_period={} size={}",
            s.fast_period, s.slow_period, s.size
        ),
        "limit_dip" => eprintln!(
            "  discount_pct={} markup_pct={} size={}",
            s.discount_pct, s.markup_pct, s.size
        ),
        _ => {}
    }
    if let Some(p) = &request.series_out {
        eprintln!("Series output:  {}", p.display());
    }
    if let Some(p) = &request.chart_out {
        eprintln!("Chart output:   {}", p.display());
    }
}

/// Fetch bars, run the engine, print the summary and write any requested
/// reports.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    request: &BacktestRequest,
) -> Result<BacktestResult, BacktestError> {
    let bars = data_port.fetch_ohlcv(
        &request.exchange,
        &request.ticker,
        request.start_date,
        request.end_date,
    )?;
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => {
            return Err(BacktestError::NoBars {
                ticker: request.ticker.clone(),
                exchange: request.exchange.clone(),
            });
        }
    };
    if first > request.start_date || last < request.end_date {
        warn!(
            requested_start = %request.start_date,
            requested_end = %request.end_date,
            %first,
            %last,
            "data does not cover the full requested period"
        );
    }

    let strategy = build_strategy(&request.ticker, &request.strategy)?;
    eprintln!(
        "Running backtest: {} on {}.{}, {} bars, {} to {}",
        strategy.name(),
        request.ticker,
        request.exchange,
        bars.len(),
        first,
        last,
    );

    let mut engine = Engine::new(request.config.clone());
    engine.add_data(bars)?;
    engine.add_strategy(strategy);
    let result = engine.run()?;

    print_summary(&result);

    if let Some(path) = &request.series_out {
        SeriesCsvReport.write(&result, path)?;
        info!(path = %path.display(), "wrote portfolio series");
        eprintln!("Series written to: {}", path.display());
    }
    if let Some(path) = &request.chart_out {
        SvgChartReport.write(&result, path)?;
        info!(path = %path.display(), "wrote chart");
        eprintln!("Chart written to: {}", path.display());
    }

    Ok(result)
}

fn print_summary(result: &BacktestResult) {
    eprintln!("\n=== {} ===", result.strategy_name);
    eprintln!("Trades:                    {}", result.trades.len());
    eprintln!("Final cash:                {:.2}", result.final_cash);
    eprintln!("Position:                  {}", result.position_size);
    if let Some(last) = result.portfolio.last() {
        eprintln!("Final AUM:                 {:.2}", last.total_aum);
    }
    eprintln!();
    for (name, value) in result.report.entries() {
        eprintln!("{:<26}{:.7}", format!("{name}:"), value);
    }
}

fn run_list_symbols(exchange: &str, config_path: &Path) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let symbols = open_data_port(&config)?.list_symbols(exchange)?;

    if symbols.is_empty() {
        eprintln!("No symbols found for exchange {}", exchange);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(
    ticker: Option<&str>,
    exchange: Option<&str>,
    config_path: &Path,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;

    let exchange = match exchange {
        Some(e) => e.trim().to_uppercase(),
        None => required(&config, "backtest", "exchange")?.to_uppercase(),
    };

    let data_port = open_data_port(&config)?;
    let tickers = match ticker {
        Some(t) => vec![t.to_uppercase()],
        None => data_port.list_symbols(&exchange)?,
    };

    for t in &tickers {
        match data_port.get_data_range(&exchange, t) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}.{}: {} bars, {} to {}", t, exchange, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}.{}: no data found", t, exchange),
            Err(e) => warn!(ticker = %t, %exchange, error = %e, "skipping symbol"),
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    let params = build_strategy_params(&config)?;
    let ticker = required(&config, "backtest", "ticker")?;
    let strategy = build_strategy(&ticker, &params)?;

    eprintln!("Strategy: {}", strategy.name());
    eprintln!("Configuration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[backtest]
exchange = asx
ticker = bhp
start_date = 2024-01-01
end_date = 2024-06-30
initial_cash = 5000
risk_free_rate = 0.02

[data]
source = csv
csv_dir = ./data

[strategy]
name = sma_cross
fast_period = 3
slow_period = 8
size = 10

[report]
series_path = out/series.csv
"#;

    fn no_overrides() -> Overrides {
        Overrides {
            ticker: None,
            exchange: None,
            strategy: None,
            series_out: None,
            chart_out: None,
        }
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "barsim", "-v", "backtest", "-c", "cfg.ini", "--ticker", "CBA", "--dry-run",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Backtest {
                config,
                ticker,
                dry_run,
                ..
            } => {
                assert_eq!(config, PathBuf::from("cfg.ini"));
                assert_eq!(ticker.as_deref(), Some("CBA"));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn list_symbols_requires_exchange() {
        assert!(Cli::try_parse_from(["barsim", "list-symbols", "-c", "cfg.ini"]).is_err());
    }

    #[test]
    fn resolve_request_reads_file() {
        let file = FileConfigAdapter::from_string(CONFIG).unwrap();
        let request = resolve_request(&file, no_overrides()).unwrap();
        assert_eq!(request.ticker, "BHP");
        assert_eq!(request.exchange, "ASX");
        assert_eq!(request.config.initial_cash, 5000.0);
        assert_eq!(request.config.trading_days, 252.0);
        assert_eq!(request.strategy.name, "sma_cross");
        assert_eq!(request.strategy.fast_period, 3);
        assert_eq!(request.series_out, Some(PathBuf::from("out/series.csv")));
        assert_eq!(request.chart_out, None);
    }

    #[test]
    fn overrides_win_over_file() {
        let file = FileConfigAdapter::from_string(CONFIG).unwrap();
        let overrides = Overrides {
            ticker: Some("cba".into()),
            strategy: Some("buy_and_hold".into()),
            chart_out: Some(PathBuf::from("chart.svg")),
            ..no_overrides()
        };
        let request = resolve_request(&file, overrides).unwrap();
        assert_eq!(request.ticker, "CBA");
        assert_eq!(request.exchange, "ASX");
        assert_eq!(request.strategy.name, "buy_and_hold");
        assert_eq!(request.chart_out, Some(PathBuf::from("chart.svg")));
    }

    #[test]
    fn layered_config_only_shadows_set_keys() {
        let file = FileConfigAdapter::from_string(CONFIG).unwrap();
        let mut layered = LayeredConfig::new(&file);
        layered.set("backtest", "ticker", Some("CBA".into()));
        layered.set("backtest", "exchange", None);

        assert_eq!(layered.get_string("backtest", "ticker"), Some("CBA".into()));
        assert_eq!(layered.get_string("backtest", "exchange"), Some("ASX".into()));
        assert_eq!(layered.get_string("strategy", "ticker"), None);
        assert_eq!(layered.get_int("strategy", "fast_period", 0), 3);
    }

    #[test]
    fn bad_strategy_override_is_rejected() {
        let file = FileConfigAdapter::from_string(CONFIG).unwrap();
        let overrides = Overrides {
            strategy: Some("nope".into()),
            ..no_overrides()
        };
        assert!(matches!(
            resolve_request(&file, overrides),
            Err(BacktestError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn open_data_port_rejects_unknown_source() {
        let file = FileConfigAdapter::from_string("[data]\nsource = parquet\n").unwrap();
        assert!(matches!(
            open_data_port(&file),
            Err(BacktestError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn strategy_params_defaults() {
        let file = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(build_strategy_params(&file).unwrap(), StrategyParams::default());
    }

    #[test]
    fn negative_period_rejected() {
        let file = FileConfigAdapter::from_string("[strategy]\nfast_period = -2\n").unwrap();
        assert!(build_strategy_params(&file).is_err());
    }
}
