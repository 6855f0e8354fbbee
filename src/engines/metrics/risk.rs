// src/engines/metrics/risk.rs

pub struct RiskMetrics;

impl RiskMetrics {
    /// Annualised Sharpe ratio of per-bar returns, risk-free rate 0.
    ///
    /// Returns 0 when there are fewer than two returns, the returns never move,
    /// or the arithmetic is not finite.
    pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(returns);
        let volatility = Self::std_dev(returns);
        if volatility <= f64::EPSILON {
            return 0.0;
        }
        let sharpe = mean / volatility * periods_per_year.sqrt();
        if sharpe.is_finite() {
            sharpe
        } else {
            0.0
        }
    }

    /// Deepest peak-to-trough decline as a non-positive fraction (-0.25 = 25% below peak).
    pub fn max_drawdown(equity: &[f64]) -> f64 {
        let Some(&first) = equity.first() else {
            return 0.0;
        };
        let mut peak = first;
        let mut max_dd: f64 = 0.0;

        for &value in equity {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                let dd = value / peak - 1.0;
                if dd < max_dd {
                    max_dd = dd;
                }
            }
        }

        if max_dd.is_finite() {
            max_dd.min(0.0)
        } else {
            0.0
        }
    }

    pub fn calculate_returns(equity: &[f64]) -> Vec<f64> {
        equity
            .windows(2)
            .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
            .collect()
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    pub fn std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        let mean = Self::mean(values);
        let variance = values.iter()
            .map(|&v| (v - mean).powi(2))
            .sum::<f64>() / values.len() as f64;

        variance.sqrt()
    }
}
