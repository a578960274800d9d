//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_factor_cache::CsvFactorCache;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::{parse_codes, validate_config, RunConfig};
use crate::domain::equity::EquityCurve;
use crate::domain::error::FactorError;
use crate::domain::pipeline::{
    active_signal_rows, build_factor_table, equity_and_metrics, load_price_table,
    normalize_and_signal, prepare_and_aggregate,
};
use crate::domain::signal::Signal;
use crate::domain::table::{z_column, ObservationTable, CLOSE, SIGNAL};
use crate::ports::data_port::DataPort;
use crate::ports::factor_cache_port::FactorCachePort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_TAIL: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "factortrader", about = "Factor signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and print performance metrics
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the equity curve (and a metrics file next to it) as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated codes overriding [data] codes
        #[arg(long)]
        codes: Option<String>,
        /// Number of trailing equity rows to print
        #[arg(long, default_value_t = DEFAULT_TAIL)]
        tail: usize,
    },
    /// Print rows with a long or short signal
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        codes: Option<String>,
    },
    /// Validate a configuration file without reading any data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List codes with a price file in the data directory
    ListCodes {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            codes,
            tail,
        } => run_backtest(&config, output.as_deref(), codes.as_deref(), tail),
        Command::Signals { config, codes } => run_signals(&config, codes.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListCodes { config } => run_list_codes(&config),
    }
}

fn fail(err: FactorError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Loads and validates the config, applying a `--codes` override.
pub fn load_run_config(path: &Path, codes_override: Option<&str>) -> Result<RunConfig, FactorError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let mut run = validate_config(&adapter)?;
    if let Some(codes) = codes_override {
        run.data.codes = parse_codes(codes)?;
    }
    Ok(run)
}

/// Prices, factors and signals: the table every command starts from.
pub fn build_signal_table(
    data_port: &dyn DataPort,
    run: &RunConfig,
) -> Result<ObservationTable, FactorError> {
    let data = &run.data;
    eprintln!(
        "Loading {} codes, {} to {}",
        data.codes.len(),
        data.start_date,
        data.end_date
    );
    let prices = load_price_table(data_port, &data.codes, data.start_date, data.end_date)?;

    let cache = run.factors.cache_dir.clone().map(CsvFactorCache::new);
    let factors = build_factor_table(
        &prices,
        &run.factors.factors,
        cache.as_ref().map(|c| c as &dyn FactorCachePort),
        data.start_date,
        data.end_date,
    )?;

    normalize_and_signal(&factors, &run.factors.column_names(), &run.signal)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    run: &RunConfig,
    output_path: Option<&Path>,
    tail: usize,
) -> Result<EquityCurve, FactorError> {
    let signals = build_signal_table(data_port, run)?;
    let (_, returns) = prepare_and_aggregate(&signals, run.backtest.aggregation)?;
    let (curve, metrics) = equity_and_metrics(
        &returns,
        run.backtest.initial_capital,
        run.backtest.risk_free_rate,
    );

    println!("{metrics}");
    if tail > 0 && !curve.is_empty() {
        println!("\n{:<12} {:>16} {:>14}", "datetime", "portfolio_return", "equity");
        for point in curve.tail(tail) {
            let ret = point
                .portfolio_return
                .map(|r| format!("{r:.6}"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<12} {:>16} {:>14.6}",
                point.datetime.to_string(),
                ret,
                point.equity
            );
        }
    }

    if let Some(path) = output_path {
        CsvReportAdapter::new().write(&curve, &metrics, &path.to_string_lossy())?;
        eprintln!("\nReport written to: {}", path.display());
    }

    Ok(curve)
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    codes_override: Option<&str>,
    tail: usize,
) -> ExitCode {
    let run = match load_run_config(config_path, codes_override) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let data_port = CsvAdapter::new(run.data.path.clone());

    match run_backtest_pipeline(&data_port, &run, output_path, tail) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

/// Formats the non-flat rows of a signal table, one line per row.
pub fn format_signal_rows(
    table: &ObservationTable,
    factor_columns: &[String],
) -> Result<Vec<String>, FactorError> {
    let close_col = table.column_index(CLOSE)?;
    let signal_col = table.column_index(SIGNAL)?;
    let z_names: Vec<String> = factor_columns.iter().map(|c| z_column(c)).collect();
    let z_cols = table.require_columns(&z_names)?;

    let fmt_value = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".into());

    let mut lines = Vec::new();
    let mut header = format!("{:<8} {:<12} {:>10} {:>6}", "code", "datetime", CLOSE, SIGNAL);
    for name in &z_names {
        header.push_str(&format!(" {:>10}", name));
    }
    lines.push(header);

    let sorted = table.sorted();
    for i in active_signal_rows(&sorted)? {
        let row = &sorted.rows()[i];
        let mut line = format!(
            "{:<8} {:<12} {:>10} {:>6}",
            row.code,
            row.datetime.to_string(),
            fmt_value(row.value(close_col)),
            row.value(signal_col)
                .and_then(Signal::from_value)
                .unwrap_or(Signal::Flat)
                .to_string(),
        );
        for &col in &z_cols {
            line.push_str(&format!(" {:>10}", fmt_value(row.value(col))));
        }
        lines.push(line);
    }
    Ok(lines)
}

fn run_signals(config_path: &Path, codes_override: Option<&str>) -> ExitCode {
    let run = match load_run_config(config_path, codes_override) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let data_port = CsvAdapter::new(run.data.path.clone());

    let signals = match build_signal_table(&data_port, &run) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let lines = match format_signal_rows(&signals, &run.factors.column_names()) {
        Ok(l) => l,
        Err(e) => return fail(e),
    };

    for line in &lines {
        println!("{line}");
    }
    eprintln!("{} active signals in {} rows", lines.len() - 1, signals.len());
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    let run = match load_run_config(config_path, None) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    println!("{run}");
    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

pub fn run_list_codes(config_path: &Path) -> ExitCode {
    let run = match load_run_config(config_path, None) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let data_port = CsvAdapter::new(run.data.path.clone());

    let codes = match data_port.list_codes() {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if codes.is_empty() {
        eprintln!("No price files found in {}", run.data.path.display());
    } else {
        for code in &codes {
            println!("{code}");
        }
        eprintln!("{} codes found", codes.len());
    }
    ExitCode::SUCCESS
}
