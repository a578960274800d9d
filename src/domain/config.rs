//! Run configuration: validation and resolved settings.
//!
//! Every field is checked before any data is read. Identifiers (factors,
//! signal rule, aggregation) are parsed here so a typo fails up front.

use crate::domain::error::FactorError;
use crate::domain::factor::FactorSpec;
use crate::domain::normalize::WinsorBounds;
use crate::domain::pipeline::SignalSettings;
use crate::domain::portfolio::Aggregation;
use crate::domain::signal::SignalRule;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: PathBuf,
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorSettings {
    pub factors: Vec<FactorSpec>,
    pub cache_dir: Option<PathBuf>,
}

impl FactorSettings {
    pub fn column_names(&self) -> Vec<String> {
        self.factors.iter().map(FactorSpec::column_name).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub aggregation: Aggregation,
    pub risk_free_rate: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 1.0,
            aggregation: Aggregation::default(),
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data: DataSettings,
    pub factors: FactorSettings,
    pub signal: SignalSettings,
    pub backtest: BacktestSettings,
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factors: Vec<String> = self.factors.column_names();
        writeln!(f, "Data path:        {}", self.data.path.display())?;
        writeln!(f, "Codes:            {}", self.data.codes.join(", "))?;
        writeln!(f, "Date range:       {} to {}", self.data.start_date, self.data.end_date)?;
        writeln!(f, "Factors:          {}", factors.join(", "))?;
        match &self.factors.cache_dir {
            Some(dir) => writeln!(f, "Factor cache:     {}", dir.display())?,
            None => writeln!(f, "Factor cache:     disabled")?,
        }
        writeln!(f, "Signal rule:      {}", self.signal.rule)?;
        writeln!(
            f,
            "Winsor bounds:    [{}, {}]",
            self.signal.bounds.lower, self.signal.bounds.upper
        )?;
        writeln!(f, "Initial capital:  {:.2}", self.backtest.initial_capital)?;
        writeln!(f, "Aggregation:      {}", self.backtest.aggregation)?;
        write!(f, "Risk-free rate:   {}", self.backtest.risk_free_rate)
    }
}

fn missing(section: &str, key: &str) -> FactorError {
    FactorError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FactorError {
    FactorError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, FactorError> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(section, key))
}

/// Numeric field with a default; present but unparsable is an error rather
/// than a silent fallback.
fn optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, FactorError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(section, key, format!("{:?} is not a number", raw))),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, FactorError> {
    let value = required(config, "data", key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| invalid("data", key, format!("invalid {} format, expected YYYY-MM-DD", key)))
}

/// Trims and upper-cases a comma-separated code list, rejecting empty tokens
/// and duplicates.
pub fn parse_codes(input: &str) -> Result<Vec<String>, FactorError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("data", "codes", "empty token in code list"));
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(invalid("data", "codes", format!("duplicate code: {}", code)));
        }
        codes.push(code);
    }

    Ok(codes)
}

fn validate_data(config: &dyn ConfigPort) -> Result<DataSettings, FactorError> {
    let path = PathBuf::from(required(config, "data", "path")?);
    let codes = parse_codes(&required(config, "data", "codes")?)?;
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }

    Ok(DataSettings {
        path,
        codes,
        start_date,
        end_date,
    })
}

fn validate_factors(config: &dyn ConfigPort) -> Result<FactorSettings, FactorError> {
    let names = config.get_list("factors", "names");
    if names.is_empty() {
        return Err(missing("factors", "names"));
    }

    let mut factors: Vec<FactorSpec> = Vec::with_capacity(names.len());
    for name in &names {
        let spec: FactorSpec = name.parse()?;
        if factors.contains(&spec) {
            return Err(invalid("factors", "names", format!("duplicate factor: {}", spec)));
        }
        factors.push(spec);
    }

    Ok(FactorSettings {
        factors,
        cache_dir: config.get_string("factors", "cache_dir").map(PathBuf::from),
    })
}

fn validate_signal(config: &dyn ConfigPort) -> Result<SignalSettings, FactorError> {
    let rule = match config.get_string("signal", "rule") {
        Some(name) => name.parse()?,
        None => SignalRule::default(),
    };

    let defaults = WinsorBounds::default();
    let bounds = WinsorBounds {
        lower: optional_f64(config, "signal", "winsor_lower", defaults.lower)?,
        upper: optional_f64(config, "signal", "winsor_upper", defaults.upper)?,
    };
    if !bounds.is_valid() {
        return Err(invalid(
            "signal",
            "winsor_lower",
            "winsor bounds must satisfy 0 <= winsor_lower < winsor_upper <= 1",
        ));
    }

    Ok(SignalSettings { rule, bounds })
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<BacktestSettings, FactorError> {
    let defaults = BacktestSettings::default();

    let initial_capital =
        optional_f64(config, "backtest", "initial_capital", defaults.initial_capital)?;
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be a positive finite number"));
    }

    let aggregation = match config.get_string("backtest", "aggregation") {
        Some(name) => name.parse()?,
        None => defaults.aggregation,
    };

    let risk_free_rate =
        optional_f64(config, "backtest", "risk_free_rate", defaults.risk_free_rate)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid("backtest", "risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }

    Ok(BacktestSettings {
        initial_capital,
        aggregation,
        risk_free_rate,
    })
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<RunConfig, FactorError> {
    Ok(RunConfig {
        data: validate_data(config)?,
        factors: validate_factors(config)?,
        signal: validate_signal(config)?,
        backtest: validate_backtest(config)?,
    })
}
