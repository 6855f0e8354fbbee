use crate::{
    config::{ConfigSection, EvolutionConfig},
    engines::fitness::{compare_scores, FitnessResult},
    engines::generation::{
        codec::GenomeCodec,
        genome::{Genome, GenomeId, GenomeIdGenerator, GenomeShape},
        operators::{
            interference_crossover, k_point_crossover, mutate_amplitudes, mutate_weights,
            tournament_selection,
        },
    },
    error::{AqnheError, Result},
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A genome and, once evaluated, its fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Genome,
    pub fitness: Option<FitnessResult>,
}

impl Individual {
    pub fn unscored(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
        }
    }

    /// Composite score, -inf while unscored.
    pub fn score(&self) -> f64 {
        self.fitness
            .as_ref()
            .map_or(f64::NEG_INFINITY, |f| f.composite_score)
    }
}

pub type Population = Vec<Individual>;

/// Creates the first generation and breeds every later one.
pub struct PopulationManager {
    config: EvolutionConfig,
    codec: GenomeCodec,
    ids: GenomeIdGenerator,
}

impl PopulationManager {
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        config.validate()?;
        let shape = GenomeShape::new(config.quantum_bits, config.neuro_layers.clone());
        Ok(Self {
            config,
            codec: GenomeCodec::new(shape),
            ids: GenomeIdGenerator::new(),
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn codec(&self) -> &GenomeCodec {
        &self.codec
    }

    /// `population_size` random, unscored genomes.
    pub fn seed<R: Rng>(&mut self, rng: &mut R) -> Result<Population> {
        (0..self.config.population_size)
            .map(|_| {
                let id = self.ids.next_id();
                self.codec.initialize_random(id, rng).map(Individual::unscored)
            })
            .collect()
    }

    /// Breed the next generation from a fully scored one.
    ///
    /// The best `elite_count` genomes are carried over unchanged, keeping their
    /// fitness unless elites are re-evaluated. The rest is filled by tournament
    /// selection followed by crossover (or cloning) and mutation. The result
    /// always has exactly `population_size` members.
    pub fn next_generation<R: Rng>(&mut self, scored: &[Individual], rng: &mut R) -> Result<Population> {
        if scored.is_empty() {
            return Err(AqnheError::EmptyPopulation);
        }
        let size = self.config.population_size;
        let scores: Vec<f64> = scored.iter().map(Individual::score).collect();

        let mut ranked: Vec<usize> = (0..scored.len()).collect();
        ranked.sort_by(|&a, &b| compare_scores(scores[b], scores[a]));

        let mut next: Population = Vec::with_capacity(size);
        for &idx in ranked.iter().take(self.config.elite_count().min(scored.len())) {
            let elite = &scored[idx];
            next.push(Individual {
                genome: elite.genome.clone(),
                fitness: if self.config.reevaluate_elites {
                    None
                } else {
                    elite.fitness.clone()
                },
            });
        }

        while next.len() < size {
            if rng.gen::<f64>() < self.config.crossover_rate {
                let p1 = tournament_selection(&scores, self.config.tournament_size, rng);
                let p2 = tournament_selection(&scores, self.config.tournament_size, rng);
                let (c1, c2) = self.crossover(&scored[p1], &scored[p2], rng)?;
                next.push(Individual::unscored(c1));
                if next.len() < size {
                    next.push(Individual::unscored(c2));
                }
            } else {
                let p = tournament_selection(&scores, self.config.tournament_size, rng);
                let parent = &scored[p].genome;
                let child = self.offspring(
                    parent.amplitudes().to_vec(),
                    parent.weights().to_vec(),
                    vec![parent.id()],
                    rng,
                )?;
                next.push(Individual::unscored(child));
            }
        }

        next.truncate(size);
        Ok(next)
    }

    fn crossover<R: Rng>(
        &mut self,
        a: &Individual,
        b: &Individual,
        rng: &mut R,
    ) -> Result<(Genome, Genome)> {
        let (amps1, amps2) = interference_crossover(
            a.genome.amplitudes(),
            b.genome.amplitudes(),
            a.score(),
            b.score(),
            rng,
        );
        let (weights1, weights2) = k_point_crossover(
            a.genome.weights(),
            b.genome.weights(),
            self.config.crossover_points,
            rng,
        );
        let parents = vec![a.genome.id(), b.genome.id()];
        let child1 = self.offspring(amps1, weights1, parents.clone(), rng)?;
        let child2 = self.offspring(amps2, weights2, parents, rng)?;
        Ok((child1, child2))
    }

    fn offspring<R: Rng>(
        &mut self,
        mut amplitudes: Vec<f64>,
        mut weights: Vec<f64>,
        parents: Vec<GenomeId>,
        rng: &mut R,
    ) -> Result<Genome> {
        mutate_amplitudes(&mut amplitudes, self.config.mutation_rate, self.config.amplitude_sigma, rng);
        mutate_weights(&mut weights, self.config.mutation_rate, self.config.weight_sigma_fraction, rng);
        Genome::new(self.ids.next_id(), amplitudes, weights, parents, self.codec.shape())
    }
}
