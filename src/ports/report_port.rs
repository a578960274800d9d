//! Report generation port trait.

use crate::domain::equity::EquityCurve;
use crate::domain::error::FactorError;
use crate::domain::metrics::Metrics;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        curve: &EquityCurve,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), FactorError>;
}
