pub mod backtester;
pub mod budget;
pub mod features;
pub mod network;
pub mod pool;
pub mod portfolio;

pub use backtester::{BacktestReport, Backtester, StrategyEvaluator};
pub use budget::{CancellationToken, EvalBudget};
pub use network::NeuralNetwork;
pub use pool::{EvaluationPool, EvaluationTask};
pub use portfolio::Portfolio;
