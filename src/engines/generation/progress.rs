use super::evolution_engine::{EvolutionResult, GenerationRecord, TerminationReason};
use log::info;
use std::sync::mpsc::Sender;

/// Observer of a running evolution, called from the controller's thread.
pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_strategies_evaluated(&mut self, evaluated: usize, total: usize);
    fn on_generation_complete(&mut self, record: &GenerationRecord, hall_of_fame_size: usize);
    fn on_terminated(&mut self, result: &EvolutionResult);
}

/// Reports progress through the `log` facade.
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        info!("Generation {} starting...", generation + 1);
    }

    fn on_strategies_evaluated(&mut self, evaluated: usize, total: usize) {
        info!("  Evaluated {}/{} strategies", evaluated, total);
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, hof_size: usize) {
        let best = record.stats.best.map_or("none".to_string(), |s| format!("{:.4}", s));
        info!(
            "Generation {} complete. Best score: {}, passed: {}, Hall of Fame size: {}",
            record.generation + 1,
            best,
            record.stats.passed,
            hof_size
        );
    }

    fn on_terminated(&mut self, result: &EvolutionResult) {
        info!(
            "Evolution stopped ({:?}) after {} generations; best {} from generation {}",
            result.termination,
            result.generations_completed,
            result.best_genome.id(),
            result.best_generation + 1
        );
    }
}

/// Progress events forwarded over a channel to another thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    StrategiesEvaluated { evaluated: usize, total: usize },
    GenerationComplete { generation: usize, best_score: Option<f64>, passed: usize, hof_size: usize },
    Terminated { reason: TerminationReason, generations: usize },
}

pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_strategies_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self
            .sender
            .send(ProgressMessage::StrategiesEvaluated { evaluated, total });
    }

    fn on_generation_complete(&mut self, record: &GenerationRecord, hof_size: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation: record.generation,
            best_score: record.stats.best,
            passed: record.stats.passed,
            hof_size,
        });
    }

    fn on_terminated(&mut self, result: &EvolutionResult) {
        let _ = self.sender.send(ProgressMessage::Terminated {
            reason: result.termination,
            generations: result.generations_completed,
        });
    }
}
