// src/engines/metrics/engine.rs
use crate::types::*;
use crate::engines::metrics::{ProfitabilityMetrics, RiskMetrics};
use serde::{Deserialize, Serialize};

/// Performance of one simulated trading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub sharpe_ratio: f64,
    /// Non-positive fraction, 0 when equity never fell below a prior peak.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub total_return: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            win_rate: 0.0,
            trade_count: 0,
            total_return: 0.0,
        }
    }
}

impl PerformanceMetrics {
    /// Component-wise mean; trade count is rounded to the nearest trade.
    pub fn average(samples: &[PerformanceMetrics]) -> PerformanceMetrics {
        if samples.is_empty() {
            return PerformanceMetrics::default();
        }
        let n = samples.len() as f64;
        let mean = |f: fn(&PerformanceMetrics) -> f64| samples.iter().map(f).sum::<f64>() / n;
        PerformanceMetrics {
            sharpe_ratio: mean(|m| m.sharpe_ratio),
            max_drawdown: mean(|m| m.max_drawdown),
            win_rate: mean(|m| m.win_rate),
            trade_count: mean(|m| m.trade_count as f64).round() as usize,
            total_return: mean(|m| m.total_return),
        }
    }
}

pub struct MetricsEngine {
    periods_per_year: f64,
}

impl MetricsEngine {
    pub fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    pub fn calculate_all(&self, equity_curve: &[f64], trades: &[Trade]) -> PerformanceMetrics {
        let returns = RiskMetrics::calculate_returns(equity_curve);

        let total_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        PerformanceMetrics {
            sharpe_ratio: RiskMetrics::sharpe_ratio(&returns, self.periods_per_year),
            max_drawdown: RiskMetrics::max_drawdown(equity_curve),
            win_rate: ProfitabilityMetrics::win_rate(trades),
            trade_count: trades.len(),
            total_return: if total_return.is_finite() { total_return } else { 0.0 },
        }
    }
}
