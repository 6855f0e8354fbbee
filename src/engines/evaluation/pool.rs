use crate::{
    config::EvolutionConfig,
    data::MarketData,
    engines::evaluation::{
        backtester::StrategyEvaluator,
        budget::{CancellationToken, EvalBudget},
    },
    engines::fitness::{FitnessFunction, FitnessResult},
    engines::generation::{codec::GenomeCodec, genome::Genome},
    engines::metrics::PerformanceMetrics,
    error::{AqnheError, Result},
};
use log::warn;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Duration;

/// A genome queued for evaluation with the seed of its collapse generator.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationTask<'a> {
    pub genome: &'a Genome,
    pub seed: u64,
}

/// Bounded worker pool that scores a generation in parallel.
///
/// Results come back in task order, so the outcome of a generation depends
/// only on the tasks and their seeds, never on worker scheduling.
pub struct EvaluationPool {
    pool: ThreadPool,
    timeout: Option<Duration>,
    collapse_samples: usize,
    cancel: CancellationToken,
}

impl EvaluationPool {
    /// `workers == 0` sizes the pool to the available cores.
    pub fn new(
        workers: usize,
        timeout: Option<Duration>,
        collapse_samples: usize,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("aqnhe-eval-{}", i))
            .build()
            .map_err(|e| AqnheError::Configuration(format!("Failed to start evaluation workers: {}", e)))?;

        Ok(Self {
            pool,
            timeout,
            collapse_samples: collapse_samples.max(1),
            cancel,
        })
    }

    pub fn from_config(config: &EvolutionConfig, cancel: CancellationToken) -> Result<Self> {
        Self::new(
            config.workers,
            config.evaluation_timeout(),
            config.collapse_samples,
            cancel,
        )
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Score every task. Timeouts and per-genome backtest failures become gate
    /// failures; cancellation and any other error abort the whole batch.
    pub fn evaluate<E: StrategyEvaluator + ?Sized>(
        &self,
        tasks: &[EvaluationTask<'_>],
        codec: &GenomeCodec,
        evaluator: &E,
        data: &MarketData,
        fitness: &FitnessFunction,
    ) -> Result<Vec<FitnessResult>> {
        self.pool.install(|| {
            tasks
                .par_iter()
                .map(|task| self.evaluate_one(task, codec, evaluator, data, fitness))
                .collect()
        })
    }

    fn evaluate_one<E: StrategyEvaluator + ?Sized>(
        &self,
        task: &EvaluationTask<'_>,
        codec: &GenomeCodec,
        evaluator: &E,
        data: &MarketData,
        fitness: &FitnessFunction,
    ) -> Result<FitnessResult> {
        let budget = EvalBudget::new(self.timeout, self.cancel.clone());
        match sample_metrics(
            codec,
            evaluator,
            task.genome,
            data,
            self.collapse_samples,
            task.seed,
            &budget,
        ) {
            Ok(metrics) => Ok(fitness.score(&metrics)),
            Err(e) if e.is_recoverable() => {
                warn!("{} scored as gate failure: {}", task.genome.id(), e);
                Ok(FitnessResult::gate_failure())
            }
            Err(e) => Err(e),
        }
    }
}

/// Collapse `genome` `samples` times from `seed` and average the resulting
/// metrics. The budget is checked after every sample.
pub fn sample_metrics<E: StrategyEvaluator + ?Sized>(
    codec: &GenomeCodec,
    evaluator: &E,
    genome: &Genome,
    data: &MarketData,
    samples: usize,
    seed: u64,
    budget: &EvalBudget,
) -> Result<PerformanceMetrics> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut results = Vec::with_capacity(samples);
    for _ in 0..samples.max(1) {
        budget.check()?;
        let params = codec.collapse(genome, &mut rng)?;
        results.push(evaluator.evaluate(&params, data, budget)?);
        budget.check()?;
    }
    Ok(PerformanceMetrics::average(&results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FitnessWeights, PerformanceThresholds};
    use crate::engines::generation::codec::CollapsedParameters;
    use crate::engines::generation::genome::{GenomeIdGenerator, GenomeShape};
    use std::thread;

    enum Behaviour {
        /// Sharpe equals the genome id, everything else passes.
        ById,
        Sleep(Duration),
        Broken,
        Fatal,
    }

    struct StubEvaluator(Behaviour);

    impl StrategyEvaluator for StubEvaluator {
        fn evaluate(
            &self,
            params: &CollapsedParameters,
            _data: &MarketData,
            _budget: &EvalBudget,
        ) -> Result<PerformanceMetrics> {
            match &self.0 {
                Behaviour::Sleep(d) => thread::sleep(*d),
                Behaviour::Broken => return Err(AqnheError::BacktestError("broken".into())),
                Behaviour::Fatal => return Err(AqnheError::DataLoading("gone".into())),
                Behaviour::ById => {}
            }
            Ok(PerformanceMetrics {
                sharpe_ratio: params.genome_id.0 as f64,
                max_drawdown: -0.01,
                win_rate: 0.9,
                trade_count: 10,
                total_return: 0.2,
            })
        }

        fn min_history(&self, _input_size: usize) -> usize {
            0
        }
    }

    fn setup(n: usize) -> (GenomeCodec, Vec<Genome>, MarketData, FitnessFunction) {
        let codec = GenomeCodec::new(GenomeShape::new(6, vec![2, 1]));
        let mut rng = StdRng::seed_from_u64(1);
        let mut ids = GenomeIdGenerator::new();
        let genomes = (0..n)
            .map(|_| codec.initialize_random(ids.next_id(), &mut rng).unwrap())
            .collect();
        let data = MarketData::from_closes("TEST", "1h".parse().unwrap(), &[100.0, 101.0, 102.0]).unwrap();
        let thresholds = PerformanceThresholds {
            min_sharpe_ratio: 0.0,
            max_drawdown: -0.2,
            min_win_rate: 0.5,
        };
        (codec, genomes, data, FitnessFunction::new(thresholds, FitnessWeights::default()))
    }

    fn tasks(genomes: &[Genome]) -> Vec<EvaluationTask<'_>> {
        genomes
            .iter()
            .enumerate()
            .map(|(i, genome)| EvaluationTask { genome, seed: i as u64 })
            .collect()
    }

    #[test]
    fn test_results_follow_task_order() {
        let (codec, genomes, data, fitness) = setup(16);
        let pool = EvaluationPool::new(4, None, 2, CancellationToken::new()).unwrap();
        let results = pool
            .evaluate(&tasks(&genomes), &codec, &StubEvaluator(Behaviour::ById), &data, &fitness)
            .unwrap();

        assert_eq!(results.len(), 16);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.sharpe_ratio, i as f64);
            assert!(result.gate_passed);
        }
    }

    #[test]
    fn test_slow_genome_times_out_as_gate_failure() {
        let (codec, genomes, data, fitness) = setup(2);
        let pool = EvaluationPool::new(2, Some(Duration::from_millis(5)), 1, CancellationToken::new()).unwrap();
        let evaluator = StubEvaluator(Behaviour::Sleep(Duration::from_millis(50)));
        let results = pool.evaluate(&tasks(&genomes), &codec, &evaluator, &data, &fitness).unwrap();

        assert!(results.iter().all(|r| !r.gate_passed));
        assert!(results.iter().all(|r| r.composite_score == f64::NEG_INFINITY));
    }

    #[test]
    fn test_backtest_failure_is_contained() {
        let (codec, genomes, data, fitness) = setup(3);
        let pool = EvaluationPool::new(1, None, 1, CancellationToken::new()).unwrap();
        let results = pool
            .evaluate(&tasks(&genomes), &codec, &StubEvaluator(Behaviour::Broken), &data, &fitness)
            .unwrap();
        assert_eq!(results, vec![FitnessResult::gate_failure(); 3]);
    }

    #[test]
    fn test_fatal_error_aborts_batch() {
        let (codec, genomes, data, fitness) = setup(3);
        let pool = EvaluationPool::new(1, None, 1, CancellationToken::new()).unwrap();
        let result = pool.evaluate(&tasks(&genomes), &codec, &StubEvaluator(Behaviour::Fatal), &data, &fitness);
        assert!(matches!(result, Err(AqnheError::DataLoading(_))));
    }

    #[test]
    fn test_cancelled_pool_stops() {
        let (codec, genomes, data, fitness) = setup(3);
        let token = CancellationToken::new();
        token.cancel();
        let pool = EvaluationPool::new(1, None, 1, token).unwrap();
        let result = pool.evaluate(&tasks(&genomes), &codec, &StubEvaluator(Behaviour::ById), &data, &fitness);
        assert!(matches!(result, Err(AqnheError::Cancelled)));
    }
}
