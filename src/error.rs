use thiserror::Error;

#[derive(Error, Debug)]
pub enum AqnheError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid genome shape: {context} expected length {expected}, got {actual}")]
    InvalidGenomeShape {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Insufficient history: {available} bars available, {required} required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Evaluation timed out after {elapsed_ms} ms")]
    EvaluationTimeout { elapsed_ms: u128 },

    #[error("Cannot reproduce from an empty population")]
    EmptyPopulation,

    #[error("Evolution cancelled")]
    Cancelled,

    #[error("Backtest error: {0}")]
    BacktestError(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AqnheError {
    /// Failures confined to a single genome. The generation scores the genome
    /// as a gate failure and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AqnheError::EvaluationTimeout { .. } | AqnheError::BacktestError(_)
        )
    }
}

impl From<config::ConfigError> for AqnheError {
    fn from(e: config::ConfigError) -> Self {
        AqnheError::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AqnheError>;
