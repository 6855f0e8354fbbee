//! Hybrid genome: a probability-amplitude vector plus a neural weight vector.
//!
//! Each amplitude is the probability that its bit collapses to 1 when the
//! genome is measured (see `GenomeCodec::collapse`). The weight vector holds
//! the dense layers of the strategy network, laid out per consecutive layer
//! pair `(inputs, outputs)` as `outputs * inputs` row-major weights (one row
//! per output neuron) followed by `outputs` biases.
//!
//! A genome never changes after construction. Reproduction operators build
//! new genomes with fresh ids; elites keep theirs.
use crate::error::{AqnheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeId(pub u64);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Sequential id source, owned by whoever creates genomes for a run.
#[derive(Debug, Default)]
pub struct GenomeIdGenerator {
    next: u64,
}

impl GenomeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> GenomeId {
        let id = GenomeId(self.next);
        self.next += 1;
        id
    }
}

/// Expected vector sizes for every genome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeShape {
    pub quantum_bits: usize,
    pub layer_sizes: Vec<usize>,
}

impl GenomeShape {
    pub fn new(quantum_bits: usize, layer_sizes: Vec<usize>) -> Self {
        Self {
            quantum_bits,
            layer_sizes,
        }
    }

    pub fn weight_count(&self) -> usize {
        self.layer_sizes.windows(2).map(|w| w[0] * w[1] + w[1]).sum()
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    pub fn check(&self, genome: &Genome) -> Result<()> {
        if genome.amplitudes.len() != self.quantum_bits {
            return Err(AqnheError::InvalidGenomeShape {
                context: "amplitude vector",
                expected: self.quantum_bits,
                actual: genome.amplitudes.len(),
            });
        }
        let expected = self.weight_count();
        if genome.weights.len() != expected {
            return Err(AqnheError::InvalidGenomeShape {
                context: "weight vector",
                expected,
                actual: genome.weights.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    id: GenomeId,
    amplitudes: Vec<f64>,
    weights: Vec<f64>,
    parents: Vec<GenomeId>,
}

impl Genome {
    /// Build a genome, checking both vectors against `shape`. Amplitudes must
    /// lie in [0, 1] and weights must be finite.
    pub fn new(
        id: GenomeId,
        amplitudes: Vec<f64>,
        weights: Vec<f64>,
        parents: Vec<GenomeId>,
        shape: &GenomeShape,
    ) -> Result<Self> {
        if let Some(bad) = amplitudes.iter().find(|a| !(0.0..=1.0).contains(*a)) {
            return Err(AqnheError::InvalidGenome(format!(
                "amplitude {} outside [0, 1] in genome {}",
                bad, id
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(AqnheError::InvalidGenome(format!(
                "non-finite weight in genome {}",
                id
            )));
        }
        let genome = Self {
            id,
            amplitudes,
            weights,
            parents,
        };
        shape.check(&genome)?;
        Ok(genome)
    }

    pub fn id(&self) -> GenomeId {
        self.id
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn parents(&self) -> &[GenomeId] {
        &self.parents
    }

    /// Same vectors as `other`, regardless of identity or lineage.
    pub fn same_genes(&self, other: &Genome) -> bool {
        self.amplitudes == other.amplitudes && self.weights == other.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> GenomeShape {
        GenomeShape::new(3, vec![2, 2, 1])
    }

    #[test]
    fn test_weight_count() {
        assert_eq!(shape().weight_count(), 2 * 2 + 2 + 2 * 1 + 1);
        assert_eq!(GenomeShape::new(10, vec![64, 32, 16, 8]).weight_count(), 2744);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Genome::new(GenomeId(0), vec![0.5; 2], vec![0.0; 9], vec![], &shape()).unwrap_err();
        assert!(matches!(
            err,
            AqnheError::InvalidGenomeShape { expected: 3, actual: 2, .. }
        ));

        let err = Genome::new(GenomeId(0), vec![0.5; 3], vec![0.0; 8], vec![], &shape()).unwrap_err();
        assert!(matches!(
            err,
            AqnheError::InvalidGenomeShape { expected: 9, actual: 8, .. }
        ));
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut ids = GenomeIdGenerator::new();
        assert_eq!(ids.next_id(), GenomeId(0));
        assert_eq!(ids.next_id(), GenomeId(1));
        assert_eq!(GenomeId(7).to_string(), "g7");
    }
}
