use crate::engines::fitness::{compare_scores, FitnessResult};
use crate::engines::generation::genome::Genome;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EliteStrategy {
    pub genome: Genome,
    pub fitness: FitnessResult,
    /// Generation in which the genome was first admitted.
    pub generation: usize,
}

/// Best distinct gate-passing genomes seen during a run, best first.
pub struct HallOfFame {
    strategies: Vec<EliteStrategy>,
    max_size: usize,
    seen_signatures: HashSet<Vec<u64>>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            strategies: Vec::new(),
            max_size,
            seen_signatures: HashSet::new(),
        }
    }

    /// Attempt to add a strategy. Gate failures and genomes whose genes are
    /// already present are rejected. Returns whether the strategy is held
    /// after trimming to `max_size`.
    pub fn try_add(&mut self, strategy: EliteStrategy) -> bool {
        if !strategy.fitness.gate_passed || !strategy.fitness.composite_score.is_finite() {
            return false;
        }
        let signature = gene_signature(&strategy.genome);
        if self.seen_signatures.contains(&signature) {
            return false;
        }

        self.strategies.push(strategy);
        self.seen_signatures.insert(signature.clone());

        // Stable sort keeps the earlier admission first on equal scores.
        self.strategies.sort_by(|a, b| {
            compare_scores(b.fitness.composite_score, a.fitness.composite_score)
        });

        while self.strategies.len() > self.max_size {
            if let Some(removed) = self.strategies.pop() {
                self.seen_signatures.remove(&gene_signature(&removed.genome));
            }
        }

        self.seen_signatures.contains(&signature)
    }

    pub fn get_all(&self) -> &[EliteStrategy] {
        &self.strategies
    }

    pub fn get_top_n(&self, n: usize) -> &[EliteStrategy] {
        &self.strategies[..n.min(self.strategies.len())]
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Bit patterns of both gene vectors; equal signatures mean identical genes.
fn gene_signature(genome: &Genome) -> Vec<u64> {
    genome
        .amplitudes()
        .iter()
        .chain(genome.weights())
        .map(|v| v.to_bits())
        .collect()
}
