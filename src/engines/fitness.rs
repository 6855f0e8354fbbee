use crate::config::{FitnessWeights, PerformanceThresholds};
use crate::engines::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scored outcome of one genome for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessResult {
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    /// Negative infinity whenever the gate failed.
    #[serde(with = "score_serde")]
    pub composite_score: f64,
    pub gate_passed: bool,
}

impl FitnessResult {
    /// Worst possible result, used when a genome could not be evaluated.
    pub fn gate_failure() -> Self {
        Self {
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            win_rate: 0.0,
            trade_count: 0,
            composite_score: f64::NEG_INFINITY,
            gate_passed: false,
        }
    }
}

/// Total order on composite scores: NaN below everything, then -inf, then finite values.
pub fn compare_scores(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Maps performance metrics to a gated composite score.
#[derive(Debug, Clone)]
pub struct FitnessFunction {
    thresholds: PerformanceThresholds,
    weights: FitnessWeights,
}

impl FitnessFunction {
    pub fn new(thresholds: PerformanceThresholds, weights: FitnessWeights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    /// Weighted mean of the normalised components, or -inf when any gate fails.
    ///
    /// Components: `sharpe / (1 + |sharpe|)`, `clamp(1 + drawdown, 0, 1)` and
    /// `win_rate`. A NaN metric never passes the gate.
    pub fn score(&self, metrics: &PerformanceMetrics) -> FitnessResult {
        let t = &self.thresholds;
        let gate_passed = metrics.sharpe_ratio >= t.min_sharpe_ratio
            && metrics.max_drawdown >= t.max_drawdown
            && metrics.win_rate >= t.min_win_rate;

        let composite_score = if gate_passed {
            let w = &self.weights;
            let sharpe = metrics.sharpe_ratio / (1.0 + metrics.sharpe_ratio.abs());
            let drawdown = (1.0 + metrics.max_drawdown).clamp(0.0, 1.0);
            let win_rate = metrics.win_rate.clamp(0.0, 1.0);
            (w.sharpe * sharpe + w.drawdown * drawdown + w.win_rate * win_rate) / w.total()
        } else {
            f64::NEG_INFINITY
        };

        FitnessResult {
            sharpe_ratio: metrics.sharpe_ratio,
            max_drawdown: metrics.max_drawdown,
            win_rate: metrics.win_rate,
            trade_count: metrics.trade_count,
            composite_score,
            gate_passed,
        }
    }
}

/// JSON has no infinities: a failed score is written as `null` and read back as -inf.
mod score_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_some(score)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}
