//! Simple moving average of closes.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) rows are missing. A missing close inside the window
//! makes that row missing.

pub fn calculate_sma(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }
    (0..closes.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &closes[i + 1 - window..=i];
            let sum = slice.iter().try_fold(0.0, |acc, c| c.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}
