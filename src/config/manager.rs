use super::{
    evolution::EvolutionConfig,
    logging::LoggingConfig,
    thresholds::{FitnessWeights, PerformanceThresholds},
    trading::TradingConfig,
    traits::ConfigSection,
};
use crate::error::AqnheError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `AQNHE_EVOLUTION__POPULATION_SIZE=80`.
pub const ENV_PREFIX: &str = "AQNHE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub trading: TradingConfig,
    pub thresholds: PerformanceThresholds,
    pub fitness: FitnessWeights,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AqnheError> {
        self.evolution.validate()?;
        self.trading.validate()?;
        self.thresholds.validate()?;
        self.fitness.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: AppConfig,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), AqnheError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AqnheError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| AqnheError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        self.config = config;
        Ok(())
    }

    /// Layer defaults, an optional TOML file and `AQNHE_*` environment
    /// variables, in that order of precedence.
    pub fn load_layered(&mut self, path: Option<&Path>) -> Result<(), AqnheError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("evolution.neuro_layers"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        self.config = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AqnheError> {
        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| AqnheError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| AqnheError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.clone()
    }

    /// Apply `f` to a copy and keep it only if the result validates.
    pub fn update<F>(&mut self, f: F) -> Result<(), AqnheError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.config.clone();
        f(&mut candidate);
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }
}
