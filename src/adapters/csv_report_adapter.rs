//! CSV report adapter.
//!
//! Writes the equity curve to the requested path and the metrics row to a
//! sibling `<stem>_metrics.csv`.

use crate::domain::equity::EquityCurve;
use crate::domain::error::FactorError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;
use std::path::{Path, PathBuf};

pub const EQUITY_HEADER: [&str; 3] = ["datetime", "portfolio_return", "equity"];
pub const METRICS_HEADER: [&str; 6] = [
    "label",
    "Total Return",
    "Annual Return",
    "Annual Volatility",
    "Sharpe Ratio",
    "Max Drawdown",
];

#[derive(Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn metrics_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        output_path.with_file_name(format!("{stem}_metrics.csv"))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> FactorError {
    FactorError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn write_equity(path: &Path, curve: &EquityCurve) -> Result<(), FactorError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(EQUITY_HEADER).map_err(|e| csv_error(path, e))?;
    for point in &curve.points {
        let ret = point
            .portfolio_return
            .map(|r| r.to_string())
            .unwrap_or_default();
        wtr.write_record([point.datetime.to_string(), ret, point.equity.to_string()])
            .map_err(|e| csv_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_metrics(path: &Path, metrics: &Metrics) -> Result<(), FactorError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(METRICS_HEADER).map_err(|e| csv_error(path, e))?;
    wtr.write_record([
        metrics.label.clone(),
        metrics.total_return.to_string(),
        metrics.annual_return.to_string(),
        metrics.annual_volatility.to_string(),
        metrics.sharpe_ratio.to_string(),
        metrics.max_drawdown.to_string(),
    ])
    .map_err(|e| csv_error(path, e))?;
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        curve: &EquityCurve,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), FactorError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        write_equity(path, curve)?;
        let metrics_path = Self::metrics_path(path);
        write_metrics(&metrics_path, metrics)?;

        tracing::info!(
            equity = %path.display(),
            metrics = %metrics_path.display(),
            rows = curve.len(),
            "wrote report"
        );
        Ok(())
    }
}
