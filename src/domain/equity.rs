//! Equity curve: compounded portfolio returns.

use crate::domain::portfolio::PortfolioReturns;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub datetime: NaiveDate,
    pub portfolio_return: Option<f64>,
    pub equity: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.datetime).collect()
    }

    /// Last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> &[EquityPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }
}

/// `equity[t] = initial_capital * prod(1 + r[i] for i <= t)`.
///
/// A missing return is a zero-return step: equity carries over unchanged.
pub fn build_equity_curve(returns: &PortfolioReturns, initial_capital: f64) -> EquityCurve {
    let mut ordered: Vec<_> = returns.points().to_vec();
    ordered.sort_by_key(|p| p.datetime);

    let mut growth = 1.0;
    let points = ordered
        .into_iter()
        .map(|p| {
            growth *= 1.0 + p.portfolio_return.unwrap_or(0.0);
            EquityPoint {
                datetime: p.datetime,
                portfolio_return: p.portfolio_return,
                equity: initial_capital * growth,
            }
        })
        .collect();

    EquityCurve { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::ReturnPoint;
    use approx::assert_relative_eq;

    fn series(values: &[Option<f64>]) -> PortfolioReturns {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PortfolioReturns::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &r)| ReturnPoint {
                    datetime: start + chrono::Duration::days(i as i64),
                    portfolio_return: r,
                })
                .collect(),
        )
    }

    #[test]
    fn compounds_returns() {
        let curve = build_equity_curve(&series(&[Some(0.01), Some(-0.02), Some(0.03)]), 1.0);
        let equity = curve.equity();
        assert_relative_eq!(equity[0], 1.01, epsilon = 1e-12);
        assert_relative_eq!(equity[1], 0.9898, epsilon = 1e-12);
        assert_relative_eq!(equity[2], 1.019494, epsilon = 1e-12);
    }

    #[test]
    fn scales_by_initial_capital() {
        let curve = build_equity_curve(&series(&[Some(0.1), Some(0.1)]), 1000.0);
        assert_relative_eq!(curve.equity()[1], 1210.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_return_keeps_equity_flat() {
        let curve = build_equity_curve(&series(&[None, Some(0.05), None]), 2.0);
        let equity = curve.equity();
        assert_eq!(equity[0], 2.0);
        assert_relative_eq!(equity[1], 2.1, epsilon = 1e-12);
        assert_relative_eq!(equity[2], 2.1, epsilon = 1e-12);
        assert_eq!(curve.points[0].portfolio_return, None);
    }

    #[test]
    fn one_point_per_input_date() {
        let returns = series(&[Some(0.0), Some(0.0), Some(0.0), Some(0.0)]);
        let curve = build_equity_curve(&returns, 1.0);
        assert_eq!(curve.len(), returns.len());
        assert!(curve.dates().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_series_gives_empty_curve() {
        let curve = build_equity_curve(&PortfolioReturns::default(), 1.0);
        assert!(curve.is_empty());
    }

    #[test]
    fn tail_returns_last_points() {
        let curve = build_equity_curve(&series(&[Some(0.01); 10]), 1.0);
        assert_eq!(curve.tail(3).len(), 3);
        assert_eq!(curve.tail(3)[2], curve.points[9]);
        assert_eq!(curve.tail(50).len(), 10);
    }
}
