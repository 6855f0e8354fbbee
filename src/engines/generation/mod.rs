pub mod codec;
pub mod evolution_engine;
pub mod genome;
pub mod hall_of_fame;
pub mod operators;
pub mod population;
pub mod progress;
pub mod sink;

pub use codec::{CollapsedParameters, GenomeCodec, StrategyParameters};
pub use evolution_engine::{
    EvolutionController, EvolutionResult, GenerationRecord, GenerationStats, Phase,
    TerminationReason,
};
pub use genome::{Genome, GenomeId, GenomeShape};
pub use hall_of_fame::{EliteStrategy, HallOfFame};
pub use population::{Individual, Population, PopulationManager};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressCallback, ProgressMessage};
pub use sink::{JsonLinesSink, MemorySink, ResultSink, SinkEntry};
