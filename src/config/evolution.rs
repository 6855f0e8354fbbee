use super::traits::{check_unit_interval, ConfigSection};
use crate::error::AqnheError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest amplitude vector the codec can split into parameter fields.
pub const MAX_QUANTUM_BITS: usize = 64;
/// Three parameter fields need at least one bit each.
pub const MIN_QUANTUM_BITS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub quantum_bits: usize,
    pub neuro_layers: Vec<usize>,
    /// Fraction of the population copied unchanged into the next generation.
    pub elitism_rate: f64,
    pub tournament_size: usize,
    pub crossover_points: usize,
    /// Standard deviation of the Gaussian noise added to a mutated amplitude.
    pub amplitude_sigma: f64,
    /// Mutation noise for a weight, relative to the weight's magnitude.
    pub weight_sigma_fraction: f64,
    /// Collapses averaged per genome evaluation.
    pub collapse_samples: usize,
    pub stagnation_window: usize,
    pub convergence_epsilon: f64,
    /// Stop as soon as a generation's best composite score exceeds this.
    pub promotion_ceiling: Option<f64>,
    /// Re-score elites every generation instead of carrying their fitness.
    pub reevaluate_elites: bool,
    /// Per-genome evaluation budget in milliseconds, 0 disables the timeout.
    pub evaluation_timeout_ms: u64,
    /// Evaluation worker threads, 0 uses every available core.
    pub workers: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            quantum_bits: 10,
            neuro_layers: vec![64, 32, 16, 8],
            elitism_rate: 0.04,
            tournament_size: 3,
            crossover_points: 2,
            amplitude_sigma: 0.1,
            weight_sigma_fraction: 0.1,
            collapse_samples: 3,
            stagnation_window: 10,
            convergence_epsilon: 1e-6,
            promotion_ceiling: None,
            reevaluate_elites: false,
            evaluation_timeout_ms: 30_000,
            workers: 0,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Number of genomes carried unchanged into the next generation.
    pub fn elite_count(&self) -> usize {
        let raw = (self.population_size as f64 * self.elitism_rate).round() as usize;
        raw.clamp(1, self.population_size.max(1))
    }

    pub fn evaluation_timeout(&self) -> Option<Duration> {
        if self.evaluation_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.evaluation_timeout_ms))
        }
    }

    /// Total weights and biases implied by `neuro_layers`.
    pub fn weight_count(&self) -> usize {
        self.neuro_layers
            .windows(2)
            .map(|w| w[0] * w[1] + w[1])
            .sum()
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), AqnheError> {
        let section = Self::section_name();
        if self.population_size < 2 {
            return Err(AqnheError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(AqnheError::Configuration(
                "Generations must be at least 1".to_string(),
            ));
        }
        check_unit_interval(section, "mutation_rate", self.mutation_rate)?;
        check_unit_interval(section, "crossover_rate", self.crossover_rate)?;
        check_unit_interval(section, "elitism_rate", self.elitism_rate)?;
        if !(MIN_QUANTUM_BITS..=MAX_QUANTUM_BITS).contains(&self.quantum_bits) {
            return Err(AqnheError::Configuration(format!(
                "quantum_bits must be between {} and {}, got {}",
                MIN_QUANTUM_BITS, MAX_QUANTUM_BITS, self.quantum_bits
            )));
        }
        if self.neuro_layers.len() < 2 {
            return Err(AqnheError::Configuration(
                "neuro_layers needs an input and an output layer".to_string(),
            ));
        }
        if self.neuro_layers.iter().any(|&n| n == 0) {
            return Err(AqnheError::Configuration(
                "neuro_layers must not contain empty layers".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(AqnheError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if self.crossover_points == 0 {
            return Err(AqnheError::Configuration(
                "crossover_points must be at least 1".to_string(),
            ));
        }
        if !self.amplitude_sigma.is_finite() || self.amplitude_sigma < 0.0 {
            return Err(AqnheError::Configuration(
                "amplitude_sigma must be a non-negative number".to_string(),
            ));
        }
        if !self.weight_sigma_fraction.is_finite() || self.weight_sigma_fraction < 0.0 {
            return Err(AqnheError::Configuration(
                "weight_sigma_fraction must be a non-negative number".to_string(),
            ));
        }
        if self.collapse_samples == 0 {
            return Err(AqnheError::Configuration(
                "collapse_samples must be at least 1".to_string(),
            ));
        }
        if self.stagnation_window == 0 {
            return Err(AqnheError::Configuration(
                "stagnation_window must be at least 1".to_string(),
            ));
        }
        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon < 0.0 {
            return Err(AqnheError::Configuration(
                "convergence_epsilon must be a non-negative number".to_string(),
            ));
        }
        if let Some(ceiling) = self.promotion_ceiling {
            if !ceiling.is_finite() {
                return Err(AqnheError::Configuration(
                    "promotion_ceiling must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weight_count(), 64 * 32 + 32 + 32 * 16 + 16 + 16 * 8 + 8);
        assert_eq!(config.elite_count(), 2);
    }

    #[test]
    fn test_rates_outside_unit_interval_rejected() {
        let config = EvolutionConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AqnheError::Configuration(_))));

        let config = EvolutionConfig {
            crossover_rate: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layer_shape_rejected() {
        let config = EvolutionConfig {
            neuro_layers: vec![8],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EvolutionConfig {
            neuro_layers: vec![8, 0, 1],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_elite_count_never_zero() {
        let config = EvolutionConfig {
            population_size: 10,
            elitism_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(config.elite_count(), 1);
    }
}
