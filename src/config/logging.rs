use super::traits::ConfigSection;
use crate::error::AqnheError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter directive, e.g. `info` or `aqnhe=debug`.
    pub level: String,
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: Some(PathBuf::from("logs/aq_nhe.log")),
        }
    }
}

impl ConfigSection for LoggingConfig {
    fn section_name() -> &'static str {
        "logging"
    }

    fn validate(&self) -> Result<(), AqnheError> {
        if self.level.trim().is_empty() {
            return Err(AqnheError::Configuration(
                "Logging level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
