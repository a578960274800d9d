#![allow(dead_code)]

use chrono::NaiveDate;
use factortrader::domain::error::FactorError;
pub use factortrader::domain::bar::PriceBar;
use factortrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, FactorError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(FactorError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_codes(&self) -> Result<Vec<String>, FactorError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> PriceBar {
    PriceBar::from_close(code, NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), close)
}

/// Daily bars with a steady drift.
pub fn generate_bars(code: &str, start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            PriceBar::from_close(
                code,
                start + chrono::Duration::days(i as i64),
                start_price + i as f64,
            )
        })
        .collect()
}

/// Daily bars oscillating around a drift, so factors change sign over time.
pub fn wave_bars(code: &str, start_date: &str, count: usize, start_price: f64, phase: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price * (1.0 + 0.08 * (t / 4.0 + phase).sin()) + 0.05 * t;
            PriceBar::from_close(code, start + chrono::Duration::days(i as i64), close)
        })
        .collect()
}

/// Writes bars as `<dir>/<CODE>.csv` in the price file layout.
pub fn write_price_csv(dir: &Path, code: &str, bars: &[PriceBar]) {
    let mut content = String::from("datetime,open,close,volume\n");
    for b in bars {
        content.push_str(&format!("{},{},{},0\n", b.date, b.close, b.close));
    }
    fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
