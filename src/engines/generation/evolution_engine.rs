use crate::{
    config::AppConfig,
    data::MarketData,
    engines::evaluation::{
        backtester::StrategyEvaluator,
        budget::CancellationToken,
        pool::{EvaluationPool, EvaluationTask},
    },
    engines::fitness::{compare_scores, FitnessFunction, FitnessResult},
    engines::generation::{
        codec::StrategyParameters,
        genome::Genome,
        hall_of_fame::{EliteStrategy, HallOfFame},
        population::{Individual, Population, PopulationManager},
        progress::ProgressCallback,
        sink::ResultSink,
    },
    error::{AqnheError, Result},
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Where the controller currently is in its generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Seeding,
    Evaluating,
    Reproducing,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    MaxGenerationsReached,
    Converged,
    ThresholdExceeded,
    Cancelled,
}

/// Summary of one generation's composite scores. Gate failures carry -inf
/// scores, so the moments are taken over finite scores only and are `None`
/// when no genome passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub best: Option<f64>,
    pub passed: usize,
    pub evaluated: usize,
}

impl GenerationStats {
    pub fn from_population(population: &[Individual], evaluated: usize) -> Self {
        let mut scores: Vec<f64> = population
            .iter()
            .map(Individual::score)
            .filter(|s| s.is_finite())
            .collect();
        let passed = population
            .iter()
            .filter(|i| i.fitness.as_ref().is_some_and(|f| f.gate_passed))
            .count();

        if scores.is_empty() {
            return Self {
                mean: None,
                median: None,
                std_dev: None,
                best: None,
                passed,
                evaluated,
            };
        }

        scores.sort_by(|a, b| compare_scores(*a, *b));
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let mid = scores.len() / 2;
        let median = if scores.len() % 2 == 0 {
            (scores[mid - 1] + scores[mid]) / 2.0
        } else {
            scores[mid]
        };

        Self {
            mean: Some(mean),
            median: Some(median),
            std_dev: Some(variance.sqrt()),
            best: scores.last().copied(),
            passed,
            evaluated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub population: Population,
    pub best_genome: Genome,
    pub best_fitness: FitnessResult,
    pub stats: GenerationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionResult {
    pub best_genome: Genome,
    pub best_fitness: FitnessResult,
    pub best_generation: usize,
    pub termination: TerminationReason,
    pub generations_completed: usize,
    pub seed: u64,
    /// Parameters of the best genome collapsed to each bit's likelier state.
    pub best_parameters: StrategyParameters,
    pub hall_of_fame: Vec<EliteStrategy>,
}

impl EvolutionResult {
    /// Strategies cleared for promotion: gate-passing hall of fame members.
    pub fn promotable(&self) -> impl Iterator<Item = &EliteStrategy> {
        self.hall_of_fame.iter().filter(|e| e.fitness.gate_passed)
    }
}

struct BestEver {
    genome: Genome,
    fitness: FitnessResult,
    generation: usize,
}

/// Drives the generation loop: seed, evaluate, record, check termination,
/// reproduce.
pub struct EvolutionController<E: StrategyEvaluator, S: ResultSink> {
    config: AppConfig,
    evaluator: E,
    population: PopulationManager,
    sink: S,
    pool: EvaluationPool,
    fitness: FitnessFunction,
    hall_of_fame: HallOfFame,
    rng: StdRng,
    seed: u64,
    phase: Phase,
    records: Vec<GenerationRecord>,
    cancel: CancellationToken,
    best: Option<BestEver>,
    stagnant_generations: usize,
}

impl<E: StrategyEvaluator, S: ResultSink> EvolutionController<E, S> {
    /// Validate `config` and wire the run. Without a configured seed one is
    /// drawn from the OS and logged so the run can be replayed.
    pub fn new(config: AppConfig, evaluator: E, population: PopulationManager, sink: S) -> Result<Self> {
        config.validate()?;
        let seed = config.evolution.seed.unwrap_or_else(rand::random);
        if config.evolution.seed.is_none() {
            info!("No seed configured, using {}", seed);
        }

        let cancel = CancellationToken::new();
        let pool = EvaluationPool::from_config(&config.evolution, cancel.clone())?;
        let fitness = FitnessFunction::new(config.thresholds.clone(), config.fitness.clone());
        let hall_of_fame = HallOfFame::new(config.trading.max_strategies);

        Ok(Self {
            config,
            evaluator,
            population,
            sink,
            pool,
            fitness,
            hall_of_fame,
            rng: StdRng::seed_from_u64(seed),
            seed,
            phase: Phase::Idle,
            records: Vec::new(),
            cancel,
            best: None,
            stagnant_generations: 0,
        })
    }

    /// Run until a termination condition holds.
    ///
    /// Fails before seeding when `data` is too short for the evaluator, and
    /// with `Cancelled` when cancellation arrives before any generation
    /// completed.
    pub fn run<C: ProgressCallback + ?Sized>(
        &mut self,
        data: Arc<MarketData>,
        callback: &mut C,
    ) -> Result<EvolutionResult> {
        let required = self
            .evaluator
            .min_history(self.population.codec().shape().input_size());
        if data.len() < required {
            return Err(AqnheError::InsufficientHistory {
                required,
                available: data.len(),
            });
        }

        info!(
            "Evolving {} genomes over {} bars of {} with {} workers (seed {})",
            self.config.evolution.population_size,
            data.len(),
            data.symbol(),
            self.pool.workers(),
            self.seed
        );

        self.phase = Phase::Seeding;
        let mut population = match self.population.seed(&mut self.rng) {
            Ok(p) => p,
            Err(e) => return self.abort(e),
        };

        let reason = loop {
            if self.cancel.is_cancelled() {
                break TerminationReason::Cancelled;
            }
            let generation = self.records.len();
            callback.on_generation_start(generation);

            self.phase = Phase::Evaluating;
            let started = Instant::now();
            let evaluated = match self.evaluate(&mut population, &data) {
                Ok(n) => n,
                Err(AqnheError::Cancelled) => {
                    info!("Generation {} discarded after cancellation", generation);
                    break TerminationReason::Cancelled;
                }
                Err(e) => return self.abort(e),
            };
            callback.on_strategies_evaluated(evaluated, population.len());

            let record = match self.record(generation, &population, evaluated) {
                Ok(r) => r,
                Err(e) => return self.abort(e),
            };
            self.absorb(&record);
            if let Err(e) = self.sink.record_generation(&record) {
                return self.abort(e);
            }
            info!(
                "Generation {}: best {:.4} ({}), mean {}, {}/{} passed in {} ms",
                generation,
                record.best_fitness.composite_score,
                record.best_genome.id(),
                record.stats.mean.map_or("-".to_string(), |m| format!("{:.4}", m)),
                record.stats.passed,
                population.len(),
                started.elapsed().as_millis()
            );
            callback.on_generation_complete(&record, self.hall_of_fame.len());
            let generation_best = record.best_fitness.composite_score;
            self.records.push(record);

            if let Some(reason) = self.termination(generation_best) {
                break reason;
            }

            self.phase = Phase::Reproducing;
            population = match self.population.next_generation(&population, &mut self.rng) {
                Ok(p) => p,
                Err(e) => return self.abort(e),
            };
        };

        self.finish(reason, callback)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    /// Token that stops the run from any thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Score every unscored individual. Collapse seeds are drawn here, in
    /// population order, before any work is dispatched.
    fn evaluate(&mut self, population: &mut Population, data: &MarketData) -> Result<usize> {
        let pending: Vec<usize> = population
            .iter()
            .enumerate()
            .filter(|(_, ind)| ind.fitness.is_none())
            .map(|(i, _)| i)
            .collect();
        let seeds: Vec<u64> = pending.iter().map(|_| self.rng.gen()).collect();

        let results = {
            let tasks: Vec<EvaluationTask<'_>> = pending
                .iter()
                .zip(&seeds)
                .map(|(&i, &seed)| EvaluationTask {
                    genome: &population[i].genome,
                    seed,
                })
                .collect();
            self.pool.evaluate(
                &tasks,
                self.population.codec(),
                &self.evaluator,
                data,
                &self.fitness,
            )?
        };

        for (&i, fitness) in pending.iter().zip(results) {
            debug!(
                "{}: score {:.4}, gate {}",
                population[i].genome.id(),
                fitness.composite_score,
                fitness.gate_passed
            );
            population[i].fitness = Some(fitness);
        }
        Ok(pending.len())
    }

    fn record(
        &self,
        generation: usize,
        population: &Population,
        evaluated: usize,
    ) -> Result<GenerationRecord> {
        // First of the highest scores, so ties go to the earlier genome.
        let best = population
            .iter()
            .reduce(|best, ind| {
                if compare_scores(ind.score(), best.score()) == Ordering::Greater {
                    ind
                } else {
                    best
                }
            })
            .ok_or(AqnheError::EmptyPopulation)?;

        Ok(GenerationRecord {
            generation,
            population: population.clone(),
            best_genome: best.genome.clone(),
            best_fitness: best
                .fitness
                .clone()
                .unwrap_or_else(FitnessResult::gate_failure),
            stats: GenerationStats::from_population(population, evaluated),
        })
    }

    /// Update best-ever, stagnation count and hall of fame from a finished generation.
    fn absorb(&mut self, record: &GenerationRecord) {
        let epsilon = self.config.evolution.convergence_epsilon;
        let score = record.best_fitness.composite_score;
        let improved = match &self.best {
            None => score.is_finite(),
            Some(best) => {
                let previous = best.fitness.composite_score;
                score.is_finite() && (!previous.is_finite() || score > previous + epsilon)
            }
        };
        self.stagnant_generations = if improved { 0 } else { self.stagnant_generations + 1 };

        let replace = match &self.best {
            None => true,
            Some(best) => compare_scores(score, best.fitness.composite_score) == Ordering::Greater,
        };
        if replace {
            self.best = Some(BestEver {
                genome: record.best_genome.clone(),
                fitness: record.best_fitness.clone(),
                generation: record.generation,
            });
        }

        for ind in &record.population {
            if let Some(fitness) = ind.fitness.as_ref().filter(|f| f.gate_passed) {
                self.hall_of_fame.try_add(EliteStrategy {
                    genome: ind.genome.clone(),
                    fitness: fitness.clone(),
                    generation: record.generation,
                });
            }
        }
    }

    fn termination(&self, generation_best: f64) -> Option<TerminationReason> {
        let evolution = &self.config.evolution;
        if self.records.len() >= evolution.generations {
            return Some(TerminationReason::MaxGenerationsReached);
        }
        if evolution.stagnation_window > 0 && self.stagnant_generations >= evolution.stagnation_window {
            return Some(TerminationReason::Converged);
        }
        if let Some(ceiling) = evolution.promotion_ceiling {
            if generation_best > ceiling {
                return Some(TerminationReason::ThresholdExceeded);
            }
        }
        if self.cancel.is_cancelled() {
            return Some(TerminationReason::Cancelled);
        }
        None
    }

    fn finish<C: ProgressCallback + ?Sized>(
        &mut self,
        reason: TerminationReason,
        callback: &mut C,
    ) -> Result<EvolutionResult> {
        self.phase = Phase::Terminated;
        let best = match self.best.as_ref() {
            Some(best) => best,
            None => return Err(AqnheError::Cancelled),
        };
        let best_parameters = self.population.codec().most_likely(&best.genome)?.strategy;

        let result = EvolutionResult {
            best_genome: best.genome.clone(),
            best_fitness: best.fitness.clone(),
            best_generation: best.generation,
            termination: reason,
            generations_completed: self.records.len(),
            seed: self.seed,
            best_parameters,
            hall_of_fame: self.hall_of_fame.get_all().to_vec(),
        };

        self.sink.record_result(&result)?;
        callback.on_terminated(&result);
        Ok(result)
    }

    fn abort<T>(&mut self, error: AqnheError) -> Result<T> {
        self.phase = Phase::Terminated;
        Err(error)
    }
}
