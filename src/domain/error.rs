//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for factortrader.
#[derive(Debug, thiserror::Error)]
pub enum FactorError {
    #[error("missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("unsupported signal rule: {0}")]
    UnsupportedRule(String),

    #[error("unsupported aggregation method: {0}")]
    UnsupportedAggregation(String),

    #[error("unknown factor: {0}")]
    UnknownFactor(String),

    #[error("duplicate row for {code} on {datetime}")]
    DuplicateKey { code: String, datetime: NaiveDate },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FactorError {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FactorError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&FactorError> for std::process::ExitCode {
    fn from(err: &FactorError) -> Self {
        let code: u8 = match err {
            FactorError::Io(_) => 1,
            FactorError::ConfigParse { .. }
            | FactorError::ConfigMissing { .. }
            | FactorError::ConfigInvalid { .. } => 2,
            FactorError::Data { .. } | FactorError::DuplicateKey { .. } => 3,
            FactorError::Schema { .. }
            | FactorError::UnsupportedRule(_)
            | FactorError::UnsupportedAggregation(_)
            | FactorError::UnknownFactor(_) => 4,
            FactorError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
