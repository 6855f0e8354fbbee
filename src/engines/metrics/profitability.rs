// src/engines/metrics/profitability.rs
use crate::types::*;

pub struct ProfitabilityMetrics;

impl ProfitabilityMetrics {
    /// Fraction of closed trades with a positive net return, 0 without trades.
    pub fn win_rate(trades: &[Trade]) -> f64 {
        if trades.is_empty() {
            return 0.0;
        }
        let winners = trades.iter().filter(|t| t.return_pct() > 0.0).count();
        winners as f64 / trades.len() as f64
    }
}
