//! Integration tests for the signal-to-performance pipeline.
//!
//! Tests cover:
//! - Full pipeline with mock data port, from prices to metrics
//! - Hand-computed multi-instrument example through every stage
//! - Partial universe (failing or empty codes skipped, others proceed)
//! - Factor cache round trip through the CSV cache adapter
//! - Factor cache recomputed when the code list grows
//! - Report adapter output matching the in-memory curve

mod common;

use approx::assert_relative_eq;
use common::*;
use factortrader::adapters::csv_factor_cache::CsvFactorCache;
use factortrader::adapters::csv_report_adapter::CsvReportAdapter;
use factortrader::domain::error::FactorError;
use factortrader::domain::factor::parse_factor_list;
use factortrader::domain::pipeline::{
    build_factor_table, equity_and_metrics, load_price_table, normalize_and_signal,
    prepare_and_aggregate, SignalSettings,
};
use factortrader::domain::portfolio::Aggregation;
use factortrader::domain::table::{Observation, ObservationTable, CLOSE, POSITION, SIGNAL};
use factortrader::ports::factor_cache_port::FactorCachePort;
use factortrader::ports::report_port::ReportPort;

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

mod full_pipeline {
    use super::*;

    fn two_code_port() -> MockDataPort {
        MockDataPort::new()
            .with_bars("AAPL", wave_bars("AAPL", "2024-01-01", 40, 100.0, 0.0))
            .with_bars("MSFT", wave_bars("MSFT", "2024-01-01", 40, 300.0, 1.5))
    }

    #[test]
    fn full_pipeline_with_mock_data_port() {
        let port = two_code_port();
        let prices = load_price_table(
            &port,
            &codes(&["AAPL", "MSFT"]),
            date(2024, 1, 1),
            date(2024, 12, 31),
        )
        .unwrap();
        assert_eq!(prices.len(), 80);

        let specs = parse_factor_list("SMA_5,MOM_5").unwrap();
        let factors = build_factor_table(&prices, &specs, None, date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        let names: Vec<String> = specs.iter().map(|s| s.column_name()).collect();
        let signals = normalize_and_signal(&factors, &names, &SignalSettings::default()).unwrap();

        for s in signals.column(SIGNAL).unwrap() {
            assert!(matches!(s, Some(v) if v == -1.0 || v == 0.0 || v == 1.0));
        }
        // warmup rows have no factor values and therefore stay flat
        let sorted = signals.sorted();
        let sig_col = sorted.column_index(SIGNAL).unwrap();
        assert_eq!(sorted.rows()[0].value(sig_col), Some(0.0));

        let (prepared, returns) = prepare_and_aggregate(&signals, Aggregation::EqualWeight).unwrap();
        assert_eq!(returns.len(), 40);

        let pos_col = prepared.column_index(POSITION).unwrap();
        let sig_col = prepared.column_index(SIGNAL).unwrap();
        for pair in prepared.rows().windows(2) {
            if pair[0].code == pair[1].code {
                assert_eq!(pair[1].value(pos_col), pair[0].value(sig_col));
            } else {
                assert_eq!(pair[1].value(pos_col), Some(0.0));
            }
        }

        let (curve, metrics) = equity_and_metrics(&returns, 1000.0, 0.02);
        assert_eq!(curve.len(), returns.len());
        assert_eq!(curve.points[0].equity, 1000.0);
        let equity = curve.equity();
        assert_relative_eq!(
            metrics.total_return,
            equity[equity.len() - 1] / equity[0] - 1.0,
            epsilon = 1e-12
        );
        assert!(metrics.max_drawdown <= 0.0);
        assert!(metrics.annual_volatility >= 0.0);
        assert!(metrics.sharpe_ratio.is_finite());
    }

    #[test]
    fn hand_computed_two_instrument_example() {
        let d = |day| date(2024, 3, day);
        let table = ObservationTable::from_rows(
            vec![CLOSE.into(), SIGNAL.into()],
            vec![
                Observation::new("MSFT", d(3), vec![Some(51.0), Some(0.0)]),
                Observation::new("AAPL", d(1), vec![Some(100.0), Some(1.0)]),
                Observation::new("AAPL", d(2), vec![Some(102.0), Some(1.0)]),
                Observation::new("MSFT", d(1), vec![Some(50.0), Some(-1.0)]),
                Observation::new("AAPL", d(3), vec![Some(101.0), Some(0.0)]),
                Observation::new("MSFT", d(2), vec![Some(50.5), Some(0.0)]),
            ],
        )
        .unwrap();

        let (_, returns) = prepare_and_aggregate(&table, Aggregation::EqualWeight).unwrap();
        let points = returns.points();
        assert_eq!(points[0].portfolio_return, None);
        assert_relative_eq!(points[1].portfolio_return.unwrap(), 0.005, epsilon = 1e-12);
        let day3 = ((101.0 / 102.0 - 1.0) + 0.0) / 2.0;
        assert_relative_eq!(points[2].portfolio_return.unwrap(), day3, epsilon = 1e-12);

        let (curve, metrics) = equity_and_metrics(&returns, 1.0, 0.0);
        let equity = curve.equity();
        assert_eq!(equity[0], 1.0);
        assert_relative_eq!(equity[1], 1.005, epsilon = 1e-12);
        assert_relative_eq!(equity[2], 1.005 * (1.0 + day3), epsilon = 1e-12);
        assert_relative_eq!(metrics.max_drawdown, day3, epsilon = 1e-12);
    }

    #[test]
    fn constant_prices_give_flat_curve_and_zero_metrics() {
        let port = MockDataPort::new().with_bars(
            "FLAT",
            (1..=20)
                .map(|i| make_bar("FLAT", &format!("2024-02-{i:02}"), 10.0))
                .collect(),
        );
        let prices =
            load_price_table(&port, &codes(&["FLAT"]), date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        let specs = parse_factor_list("MOM_3").unwrap();
        let factors =
            build_factor_table(&prices, &specs, None, date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        let signals =
            normalize_and_signal(&factors, &["MOM_3"], &SignalSettings::default()).unwrap();

        assert!(signals.column(SIGNAL).unwrap().iter().all(|s| *s == Some(0.0)));

        let (_, returns) = prepare_and_aggregate(&signals, Aggregation::EqualWeight).unwrap();
        let (curve, metrics) = equity_and_metrics(&returns, 1.0, 0.05);
        assert!(curve.equity().iter().all(|&e| e == 1.0));
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.annual_volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }
}

mod partial_universe {
    use super::*;

    #[test]
    fn failing_code_is_skipped() {
        let port = MockDataPort::new()
            .with_bars("AAPL", generate_bars("AAPL", "2024-01-01", 10, 100.0))
            .with_error("BAD", "corrupt file");
        let table = load_price_table(
            &port,
            &codes(&["AAPL", "BAD", "NONE"]),
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap();
        assert_eq!(table.codes(), vec!["AAPL"]);
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn no_bars_anywhere_is_no_data() {
        let port = MockDataPort::new()
            .with_bars("AAPL", generate_bars("AAPL", "2023-01-01", 10, 100.0));
        let err = load_price_table(
            &port,
            &codes(&["AAPL", "MSFT"]),
            date(2024, 1, 1),
            date(2024, 1, 31),
        )
        .unwrap_err();
        assert!(matches!(err, FactorError::NoData { code } if code == "AAPL,MSFT"));
    }
}

mod factor_cache {
    use super::*;

    #[test]
    fn csv_cache_is_filled_then_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = CsvFactorCache::new(dir.path().join("cache"));
        let port_ref: &dyn FactorCachePort = &cache;
        let (start, end) = (date(2024, 1, 1), date(2024, 3, 31));

        let port = MockDataPort::new()
            .with_bars("AAPL", wave_bars("AAPL", "2024-01-01", 30, 50.0, 0.3))
            .with_bars("MSFT", wave_bars("MSFT", "2024-01-01", 30, 80.0, 2.0));
        let prices = load_price_table(&port, &codes(&["AAPL", "MSFT"]), start, end).unwrap();
        let specs = parse_factor_list("SMA_3,MOM_2").unwrap();

        let computed = build_factor_table(&prices, &specs, Some(port_ref), start, end).unwrap();
        assert!(cache.cache_path("SMA_3", start, end).exists());
        assert!(cache.cache_path("MOM_2", start, end).exists());

        let cached = build_factor_table(&prices, &specs, Some(port_ref), start, end).unwrap();
        for name in ["SMA_3", "MOM_2"] {
            let a = computed.column(name).unwrap();
            let b = cached.column(name).unwrap();
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                match (x, y) {
                    (Some(x), Some(y)) => assert_relative_eq!(x, y, epsilon = 1e-12),
                    (None, None) => {}
                    other => panic!("cache mismatch in {name}: {other:?}"),
                }
            }
        }

        let loaded = cache.load("SMA_3", start, end).unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 60);
    }
}

mod factor_cache_growth {
    use super::*;

    #[test]
    fn cache_from_smaller_universe_is_recomputed() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = CsvFactorCache::new(dir.path().join("cache"));
        let port_ref: &dyn FactorCachePort = &cache;
        let (start, end) = (date(2024, 1, 1), date(2024, 3, 31));

        let port = MockDataPort::new()
            .with_bars("AAPL", wave_bars("AAPL", "2024-01-01", 30, 50.0, 0.3))
            .with_bars("MSFT", wave_bars("MSFT", "2024-01-01", 30, 80.0, 2.0));
        let specs = parse_factor_list("SMA_3").unwrap();

        let aapl = load_price_table(&port, &codes(&["AAPL"]), start, end).unwrap();
        build_factor_table(&aapl, &specs, Some(port_ref), start, end).unwrap();

        let both = load_price_table(&port, &codes(&["AAPL", "MSFT"]), start, end).unwrap();
        let out = build_factor_table(&both, &specs, Some(port_ref), start, end).unwrap();

        let sma = out.column_index("SMA_3").unwrap();
        let msft_with_values = out
            .rows()
            .iter()
            .filter(|r| r.code == "MSFT" && r.value(sma).is_some())
            .count();
        assert_eq!(msft_with_values, 28);

        // the cache file now covers both codes
        let reloaded = cache.load("SMA_3", start, end).unwrap().unwrap();
        assert_eq!(reloaded.entries.len(), 60);
    }
}

mod report_generation {
    use super::*;

    #[test]
    fn report_matches_curve() {
        let port = MockDataPort::new()
            .with_bars("AAPL", wave_bars("AAPL", "2024-01-01", 25, 100.0, 0.0));
        let prices =
            load_price_table(&port, &codes(&["AAPL"]), date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let specs = parse_factor_list("MOM_2").unwrap();
        let factors =
            build_factor_table(&prices, &specs, None, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let signals =
            normalize_and_signal(&factors, &["MOM_2"], &SignalSettings::default()).unwrap();
        let (_, returns) = prepare_and_aggregate(&signals, Aggregation::EqualWeight).unwrap();
        let (curve, metrics) = equity_and_metrics(&returns, 1.0, 0.0);

        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("equity.csv");
        CsvReportAdapter::new()
            .write(&curve, &metrics, out.to_str().unwrap())
            .unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "datetime,portfolio_return,equity");
        assert_eq!(lines.len(), curve.len() + 1);
        assert!(lines[1].starts_with("2024-01-01,,"));
        assert!(dir.path().join("equity_metrics.csv").exists());
    }
}
