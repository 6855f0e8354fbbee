use aqnhe::config::{AppConfig, EvolutionConfig};
use aqnhe::data::MarketData;
use aqnhe::engines::evaluation::{Backtester, CancellationToken, EvalBudget, StrategyEvaluator};
use aqnhe::engines::generation::sink::read_json_lines;
use aqnhe::engines::generation::{
    ChannelProgressCallback, CollapsedParameters, EvolutionController, EvolutionResult,
    GenerationRecord, JsonLinesSink, LogProgressCallback, MemorySink, Phase, PopulationManager,
    ProgressCallback, ProgressMessage, SinkEntry, TerminationReason,
};
use aqnhe::engines::metrics::PerformanceMetrics;
use aqnhe::error::{AqnheError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::Duration;

fn test_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.evolution = EvolutionConfig {
        population_size: 8,
        generations: 3,
        quantum_bits: 6,
        neuro_layers: vec![4, 2, 1],
        collapse_samples: 2,
        stagnation_window: 100,
        workers: 2,
        seed: Some(seed),
        ..EvolutionConfig::default()
    };
    config.logging.file_path = None;
    config
}

fn market_data(bars: usize) -> Arc<MarketData> {
    let closes: Vec<f64> = (0..bars)
        .map(|i| {
            let t = i as f64;
            100.0 * (1.0 + 0.0005 * t) + 3.0 * (t * 0.17).sin() + 1.5 * (t * 0.41).cos()
        })
        .collect();
    Arc::new(MarketData::from_closes("TEST", "1h".parse().unwrap(), &closes).unwrap())
}

fn passing(sharpe_ratio: f64) -> PerformanceMetrics {
    PerformanceMetrics {
        sharpe_ratio,
        max_drawdown: -0.05,
        win_rate: 0.6,
        trade_count: 10,
        total_return: 0.1,
    }
}

fn controller<E: StrategyEvaluator>(
    config: AppConfig,
    evaluator: E,
) -> EvolutionController<E, MemorySink> {
    let population = PopulationManager::new(config.evolution.clone()).unwrap();
    EvolutionController::new(config, evaluator, population, MemorySink::new()).unwrap()
}

/// Sharpe grows with the number of set bits in the collapsed string.
struct BitCountEvaluator;

impl StrategyEvaluator for BitCountEvaluator {
    fn evaluate(&self, params: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        let ones = params.bits.iter().filter(|b| **b).count() as f64;
        Ok(passing(1.0 + ones))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}

/// Same metrics for every genome.
struct ConstantEvaluator;

impl StrategyEvaluator for ConstantEvaluator {
    fn evaluate(&self, _: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        Ok(passing(2.0))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}

/// Every call scores worse than all calls before it.
#[derive(Default)]
struct DecliningEvaluator {
    calls: AtomicUsize,
}

impl StrategyEvaluator for DecliningEvaluator {
    fn evaluate(&self, _: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
        Ok(passing(100.0 - n * 0.1))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}

struct SlowEvaluator;

impl StrategyEvaluator for SlowEvaluator {
    fn evaluate(&self, _: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        thread::sleep(Duration::from_millis(50));
        Ok(passing(5.0))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}

/// Cancels the run once it has been called `after` times.
struct CancellingEvaluator {
    calls: AtomicUsize,
    after: usize,
    token: Arc<OnceLock<CancellationToken>>,
}

impl StrategyEvaluator for CancellingEvaluator {
    fn evaluate(&self, _: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            if let Some(token) = self.token.get() {
                token.cancel();
            }
        }
        Ok(passing(2.0))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}

/// Cancels through the token as soon as the first generation completes.
struct CancelAfterFirstGeneration {
    token: CancellationToken,
}

impl ProgressCallback for CancelAfterFirstGeneration {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_strategies_evaluated(&mut self, _evaluated: usize, _total: usize) {}

    fn on_generation_complete(&mut self, _record: &GenerationRecord, _hof_size: usize) {
        self.token.cancel();
    }

    fn on_terminated(&mut self, _result: &EvolutionResult) {}
}

#[test]
fn test_same_seed_gives_identical_history() {
    let data = market_data(300);
    let mut first = controller(test_config(99), Backtester::from_config(&test_config(99).trading));
    let mut config = test_config(99);
    config.evolution.workers = 4;
    let mut second = controller(config, Backtester::from_config(&test_config(99).trading));

    let a = first.run(data.clone(), &mut LogProgressCallback).unwrap();
    let b = second.run(data, &mut LogProgressCallback).unwrap();

    assert_eq!(first.records().len(), 3);
    assert_eq!(first.records(), second.records());
    assert_eq!(a, b);
    assert_eq!(a.seed, 99);
}

#[test]
fn test_without_variation_every_generation_reuses_seeded_genes() {
    let mut config = test_config(31);
    config.evolution.population_size = 10;
    config.evolution.quantum_bits = 4;
    config.evolution.generations = 5;
    config.evolution.mutation_rate = 0.0;
    config.evolution.crossover_rate = 0.0;
    let backtester = Backtester::from_config(&config.trading);
    let mut controller = controller(config, backtester);

    let result = controller.run(market_data(300), &mut LogProgressCallback).unwrap();

    assert_eq!(result.generations_completed, 5);
    let records = controller.records();
    let seeded = &records[0].population;
    for record in &records[1..] {
        assert_eq!(record.population.len(), 10);
        for ind in &record.population {
            assert!(
                seeded.iter().any(|s| s.genome.same_genes(&ind.genome)),
                "generation {}: {} has genes not in the seeded population",
                record.generation,
                ind.genome.id()
            );
        }
    }
    assert!(seeded.iter().any(|s| s.genome.same_genes(&result.best_genome)));
}

#[test]
fn test_runs_until_max_generations() {
    let mut config = test_config(1);
    config.evolution.generations = 4;
    let mut controller = controller(config, BitCountEvaluator);
    assert_eq!(controller.phase(), Phase::Idle);

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    assert_eq!(result.termination, TerminationReason::MaxGenerationsReached);
    assert_eq!(result.generations_completed, 4);
    assert_eq!(controller.records().len(), 4);
    assert_eq!(controller.phase(), Phase::Terminated);
    assert_eq!(controller.sink().generations.len(), 4);
    assert_eq!(controller.sink().result.as_ref(), Some(&result));

    let generations: Vec<usize> = controller.records().iter().map(|r| r.generation).collect();
    assert_eq!(generations, vec![0, 1, 2, 3]);
    assert!(result.best_fitness.gate_passed);
    assert!(result.promotable().all(|e| e.fitness.gate_passed));
    assert!(result.promotable().count() > 0);
}

#[test]
fn test_elites_are_not_reevaluated() {
    let mut config = test_config(3);
    config.evolution.elitism_rate = 0.25;
    let mut controller = controller(config, BitCountEvaluator);
    controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    let records = controller.records();
    assert_eq!(records[0].stats.evaluated, 8);
    // round(8 * 0.25) = 2 elites keep their scores.
    assert_eq!(records[1].stats.evaluated, 6);
}

#[test]
fn test_stagnation_converges() {
    let mut config = test_config(2);
    config.evolution.generations = 50;
    config.evolution.stagnation_window = 2;
    let mut controller = controller(config, ConstantEvaluator);

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    assert_eq!(result.termination, TerminationReason::Converged);
    assert_eq!(result.generations_completed, 3);
    assert_eq!(result.best_generation, 0);
}

#[test]
fn test_promotion_ceiling_stops_early() {
    let mut config = test_config(2);
    config.evolution.generations = 50;
    config.evolution.promotion_ceiling = Some(0.1);
    let mut controller = controller(config, ConstantEvaluator);

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    assert_eq!(result.termination, TerminationReason::ThresholdExceeded);
    assert_eq!(result.generations_completed, 1);
}

#[test]
fn test_best_is_tracked_across_generations() {
    let mut config = test_config(4);
    config.evolution.reevaluate_elites = true;
    let mut controller = controller(config, DecliningEvaluator::default());

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    let records = controller.records();
    assert_eq!(result.best_generation, 0);
    assert_eq!(result.best_fitness, records[0].best_fitness);
    assert!(records[2].best_fitness.composite_score < records[0].best_fitness.composite_score);
}

#[test]
fn test_slow_genomes_time_out_as_gate_failures() {
    let mut config = test_config(5);
    config.evolution.generations = 1;
    config.evolution.collapse_samples = 1;
    config.evolution.evaluation_timeout_ms = 5;
    let mut controller = controller(config, SlowEvaluator);

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    let record = &controller.records()[0];
    assert_eq!(record.stats.passed, 0);
    assert_eq!(record.stats.evaluated, 8);
    assert_eq!(record.stats.best, None);
    assert!(!result.best_fitness.gate_passed);
    assert_eq!(result.promotable().count(), 0);
}

#[test]
fn test_cancel_before_run() {
    let mut controller = controller(test_config(6), ConstantEvaluator);
    controller.cancellation_token().cancel();

    let result = controller.run(market_data(50), &mut LogProgressCallback);

    assert!(matches!(result, Err(AqnheError::Cancelled)));
    assert!(controller.records().is_empty());
}

#[test]
fn test_cancel_between_generations() {
    let mut config = test_config(7);
    config.evolution.generations = 10;
    let mut controller = controller(config, ConstantEvaluator);
    let mut callback = CancelAfterFirstGeneration {
        token: controller.cancellation_token(),
    };

    let result = controller.run(market_data(50), &mut callback).unwrap();

    assert_eq!(result.termination, TerminationReason::Cancelled);
    assert_eq!(result.generations_completed, 1);
}

#[test]
fn test_generation_interrupted_by_cancellation_is_discarded() {
    let mut config = test_config(8);
    config.evolution.generations = 10;
    config.evolution.collapse_samples = 1;
    config.evolution.workers = 1;
    let token = Arc::new(OnceLock::new());
    let evaluator = CancellingEvaluator {
        calls: AtomicUsize::new(0),
        after: 10,
        token: token.clone(),
    };
    let mut controller = controller(config, evaluator);
    let _ = token.set(controller.cancellation_token());

    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();

    // Eight evaluations in the first generation; the tenth call lands in the second.
    assert_eq!(result.termination, TerminationReason::Cancelled);
    assert_eq!(result.generations_completed, 1);
    assert_eq!(controller.sink().generations.len(), 1);
}

#[test]
fn test_short_history_rejected_before_seeding() {
    let mut controller = controller(test_config(9), Backtester::from_config(&test_config(9).trading));

    let result = controller.run(market_data(40), &mut LogProgressCallback);

    assert!(matches!(
        result,
        Err(AqnheError::InsufficientHistory { required: 85, available: 40 })
    ));
    assert_eq!(controller.phase(), Phase::Idle);
}

#[test]
fn test_invalid_config_rejected() {
    let config = test_config(10);
    let population = PopulationManager::new(config.evolution.clone()).unwrap();
    let mut broken = config.clone();
    broken.thresholds.max_drawdown = 0.5;

    let result = EvolutionController::new(broken, ConstantEvaluator, population, MemorySink::new());
    assert!(matches!(result, Err(AqnheError::Configuration(_))));
}

#[test]
fn test_progress_events_reach_channel() {
    let (sender, receiver) = mpsc::channel();
    let mut controller = controller(test_config(11), BitCountEvaluator);

    controller
        .run(market_data(50), &mut ChannelProgressCallback::new(sender))
        .unwrap();

    let messages: Vec<ProgressMessage> = receiver.try_iter().collect();
    assert_eq!(messages[0], ProgressMessage::GenerationStart(0));
    assert_eq!(
        messages.last(),
        Some(&ProgressMessage::Terminated {
            reason: TerminationReason::MaxGenerationsReached,
            generations: 3,
        })
    );
    let completed = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::GenerationComplete { .. }))
        .count();
    assert_eq!(completed, 3);
}

#[test]
fn test_json_lines_sink_round_trip() {
    let dir = std::env::temp_dir().join(format!("aqnhe-sink-{}", std::process::id()));
    let path = dir.join("run.jsonl");
    let _ = std::fs::remove_file(&path);

    let config = test_config(12);
    let population = PopulationManager::new(config.evolution.clone()).unwrap();
    let sink = JsonLinesSink::create(&path).unwrap();
    let mut controller = EvolutionController::new(config, FailingEvaluator, population, sink).unwrap();
    let result = controller.run(market_data(50), &mut LogProgressCallback).unwrap();
    drop(controller);

    let entries = read_json_lines(&path).unwrap();
    assert_eq!(entries.len(), 4);
    assert!(matches!(entries[0], SinkEntry::Generation(ref r) if r.generation == 0));
    match &entries[3] {
        SinkEntry::Result(read) => {
            assert_eq!(read.seed, result.seed);
            assert_eq!(read.best_fitness.composite_score, f64::NEG_INFINITY);
        }
        other => panic!("expected result line, got {:?}", other),
    }
    let _ = std::fs::remove_dir_all(&dir);
}

/// Fails every genome as a recoverable backtest error.
struct FailingEvaluator;

impl StrategyEvaluator for FailingEvaluator {
    fn evaluate(&self, _: &CollapsedParameters, _: &MarketData, _: &EvalBudget) -> Result<PerformanceMetrics> {
        Err(AqnheError::BacktestError("degenerate equity".to_string()))
    }

    fn min_history(&self, _input_size: usize) -> usize {
        10
    }
}
