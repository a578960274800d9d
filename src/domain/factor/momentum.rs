//! Momentum: fractional change of close over n rows.
//!
//! MOM(n)[i] = C[i] / C[i-n] - 1
//! Warmup: first n rows are missing. A missing or zero base close is missing.

pub fn calculate_momentum(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            match (closes[i - window], closes[i]) {
                (Some(base), Some(curr)) if base != 0.0 => Some(curr / base - 1.0),
                _ => None,
            }
        })
        .collect()
}
