//! CSV file price data adapter.
//!
//! One file per instrument at `<base>/<CODE>.csv`. Columns are found by
//! header name; only the date and close are read, so extra columns
//! (`open`, `volume`, `adjusted close`) are ignored.

use crate::domain::bar::PriceBar;
use crate::domain::error::FactorError;
use crate::domain::table::{CLOSE, DATETIME};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    close: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, FactorError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let date = find(&["date", DATETIME]);
        let close = find(&[CLOSE]);
        match (date, close) {
            (Some(date), Some(close)) => Ok(Self { date, close }),
            _ => {
                let mut missing = Vec::new();
                if date.is_none() {
                    missing.push(DATETIME);
                }
                if close.is_none() {
                    missing.push(CLOSE);
                }
                Err(FactorError::schema(missing))
            }
        }
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_date(value: &str) -> Result<NaiveDate, FactorError> {
    let day = value
        .trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| FactorError::Data {
        reason: format!("invalid date {:?}: {}", value, e),
    })
}

fn parse_field(record: &csv::StringRecord, col: usize, name: &str) -> Result<Option<f64>, FactorError> {
    let raw = record.get(col).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|e| FactorError::Data {
        reason: format!("invalid {} value {:?}: {}", name, raw, e),
    })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, FactorError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| FactorError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| FactorError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let cols = Columns::locate(headers)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FactorError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date = parse_date(record.get(cols.date).unwrap_or(""))?;
            if date < start_date || date > end_date {
                continue;
            }

            let Some(close) = parse_field(&record, cols.close, CLOSE)? else {
                tracing::warn!(code, %date, "skipping bar without close");
                continue;
            };
            bars.push(PriceBar::from_close(code, date, close));
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(code, bars = bars.len(), "loaded price bars");
        Ok(bars)
    }

    fn list_codes(&self) -> Result<Vec<String>, FactorError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FactorError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FactorError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(code) = name_str.strip_suffix(".csv") {
                codes.push(code.to_string());
            }
        }

        codes.sort();
        Ok(codes)
    }
}
