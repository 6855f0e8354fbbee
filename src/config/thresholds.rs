use super::traits::{check_unit_interval, ConfigSection};
use crate::error::AqnheError;
use serde::{Deserialize, Serialize};

/// Hard admission bar a strategy must clear before it can be ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub min_sharpe_ratio: f64,
    /// Deepest tolerated drawdown, expressed as a non-positive fraction.
    pub max_drawdown: f64,
    pub min_win_rate: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            min_sharpe_ratio: 1.0,
            max_drawdown: -0.2,
            min_win_rate: 0.55,
        }
    }
}

impl ConfigSection for PerformanceThresholds {
    fn section_name() -> &'static str {
        "thresholds"
    }

    fn validate(&self) -> Result<(), AqnheError> {
        if !self.min_sharpe_ratio.is_finite() {
            return Err(AqnheError::Configuration(
                "min_sharpe_ratio must be finite".to_string(),
            ));
        }
        if !(-1.0..=0.0).contains(&self.max_drawdown) {
            return Err(AqnheError::Configuration(format!(
                "max_drawdown must be in [-1, 0], got {}",
                self.max_drawdown
            )));
        }
        check_unit_interval(Self::section_name(), "min_win_rate", self.min_win_rate)
    }
}

/// Relative weights of the composite score components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub sharpe: f64,
    pub drawdown: f64,
    pub win_rate: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            sharpe: 1.0,
            drawdown: 1.0,
            win_rate: 1.0,
        }
    }
}

impl FitnessWeights {
    pub fn total(&self) -> f64 {
        self.sharpe + self.drawdown + self.win_rate
    }
}

impl ConfigSection for FitnessWeights {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), AqnheError> {
        let weights = [self.sharpe, self.drawdown, self.win_rate];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AqnheError::Configuration(
                "Fitness weights must be non-negative numbers".to_string(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(AqnheError::Configuration(
                "At least one fitness weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_validation() {
        assert!(PerformanceThresholds::default().validate().is_ok());
        let positive_drawdown = PerformanceThresholds {
            max_drawdown: 0.2,
            ..Default::default()
        };
        assert!(positive_drawdown.validate().is_err());
        let bad_win_rate = PerformanceThresholds {
            min_win_rate: 1.2,
            ..Default::default()
        };
        assert!(bad_win_rate.validate().is_err());
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let weights = FitnessWeights {
            sharpe: 0.0,
            drawdown: 0.0,
            win_rate: 0.0,
        };
        assert!(weights.validate().is_err());
    }
}
