pub mod traits;
pub mod evolution;
pub mod trading;
pub mod thresholds;
pub mod logging;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use trading::TradingConfig;
pub use thresholds::{FitnessWeights, PerformanceThresholds};
pub use logging::LoggingConfig;
pub use traits::ConfigSection;
