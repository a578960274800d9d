//! Performance metrics from the portfolio return series and equity curve.
//!
//! Degenerate inputs (empty series, zero start, non-positive elapsed time,
//! zero deviation) produce 0.0 instead of an error or a non-finite value.

use crate::domain::equity::EquityCurve;
use crate::domain::portfolio::PortfolioReturns;
use crate::domain::stats::{mean, sample_std};
use chrono::NaiveDate;
use std::fmt;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub label: String,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl Metrics {
    pub fn compute(returns: &PortfolioReturns, curve: &EquityCurve, risk_free_rate: f64) -> Self {
        let equity = curve.equity();
        let dates = curve.dates();
        let values = returns.values();

        Metrics {
            label: "Strategy".to_string(),
            total_return: total_return(&equity),
            annual_return: annual_return(&equity, Some(&dates)),
            annual_volatility: annual_volatility(&values),
            sharpe_ratio: sharpe_ratio(&values, risk_free_rate),
            max_drawdown: max_drawdown(&equity),
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.label)?;
        writeln!(f, "Total Return:       {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Annual Return:      {:.2}%", self.annual_return * 100.0)?;
        writeln!(f, "Annual Volatility:  {:.2}%", self.annual_volatility * 100.0)?;
        writeln!(f, "Sharpe Ratio:       {:.2}", self.sharpe_ratio)?;
        write!(f, "Max Drawdown:       {:.2}%", self.max_drawdown * 100.0)
    }
}

/// Drops NaN entries, keeping dates aligned with their values.
fn finite_points(equity: &[f64], dates: Option<&[NaiveDate]>) -> (Vec<f64>, Option<Vec<NaiveDate>>) {
    match dates {
        Some(d) if d.len() == equity.len() => {
            let (v, d): (Vec<f64>, Vec<NaiveDate>) = equity
                .iter()
                .zip(d)
                .filter(|(e, _)| !e.is_nan())
                .map(|(e, d)| (*e, *d))
                .unzip();
            (v, Some(d))
        }
        _ => (equity.iter().copied().filter(|e| !e.is_nan()).collect(), None),
    }
}

/// `equity[last] / equity[first] - 1`.
pub fn total_return(equity: &[f64]) -> f64 {
    let (equity, _) = finite_points(equity, None);
    match (equity.first(), equity.last()) {
        (Some(&start), Some(&end)) if start != 0.0 => end / start - 1.0,
        _ => 0.0,
    }
}

/// Compound annual growth.
///
/// With two or more dates, the year count is elapsed calendar days / 365.25.
/// Without usable dates the series is assumed to be trading days and is
/// annualized by observation count.
pub fn annual_return(equity: &[f64], dates: Option<&[NaiveDate]>) -> f64 {
    let (equity, dates) = finite_points(equity, dates);
    let (Some(&start), Some(&end)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if start == 0.0 {
        return 0.0;
    }
    let growth = end / start;

    if let Some(dates) = dates.filter(|d| d.len() >= 2) {
        let days = (dates[dates.len() - 1] - dates[0]).num_days() as f64;
        let years = days / CALENDAR_DAYS_PER_YEAR;
        if years <= 0.0 {
            return 0.0;
        }
        return annualize(growth, 1.0 / years);
    }

    let n = equity.len();
    if n < 2 {
        return 0.0;
    }
    annualize(growth, TRADING_DAYS_PER_YEAR / n as f64)
}

/// A wiped-out curve (growth <= 0) has no real root; report it as -100%.
fn annualize(growth: f64, exponent: f64) -> f64 {
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(exponent) - 1.0
}

/// Sample standard deviation of period returns, annualized by sqrt(252).
pub fn annual_volatility(returns: &[f64]) -> f64 {
    sample_std(returns)
        .map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
        .unwrap_or(0.0)
}

/// Annualized Sharpe ratio of returns in excess of the per-period risk-free rate.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();

    match (mean(&excess), sample_std(&excess)) {
        (Some(m), Some(sd)) if sd != 0.0 => m / sd * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    }
}

/// Worst `equity / running_peak - 1`; 0.0 if equity never falls below its peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &e in equity.iter().filter(|e| !e.is_nan()) {
        if e > peak {
            peak = e;
        } else if peak > 0.0 {
            worst = worst.min(e / peak - 1.0);
        }
    }

    worst
}
