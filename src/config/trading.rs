use super::traits::ConfigSection;
use crate::error::AqnheError;
use crate::types::Timeframe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Largest position as a fraction of equity.
    pub max_position_size: f64,
    /// Size of the hall of fame handed to promotion.
    pub max_strategies: usize,
    pub backtest_days: u32,
    pub initial_capital: f64,
    /// Fee per side as a fraction of traded notional.
    pub commission: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            exchange: "binance".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::default(),
            max_position_size: 0.1,
            max_strategies: 100,
            backtest_days: 365,
            initial_capital: 10000.0,
            commission: 0.001,
        }
    }
}

impl TradingConfig {
    /// Bars covered by `backtest_days` at the configured timeframe, `None` when 0.
    pub fn backtest_bars(&self) -> Option<usize> {
        if self.backtest_days == 0 {
            return None;
        }
        let minutes = self.backtest_days as u64 * 24 * 60;
        Some((minutes / self.timeframe.minutes().max(1) as u64) as usize)
    }
}

impl ConfigSection for TradingConfig {
    fn section_name() -> &'static str {
        "trading"
    }

    fn validate(&self) -> Result<(), AqnheError> {
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            return Err(AqnheError::Configuration(format!(
                "max_position_size must be in (0, 1], got {}",
                self.max_position_size
            )));
        }
        if self.max_strategies == 0 {
            return Err(AqnheError::Configuration(
                "max_strategies must be at least 1".to_string(),
            ));
        }
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(AqnheError::Configuration(
                "Initial capital must be positive".to_string(),
            ));
        }
        if !(0.0..0.1).contains(&self.commission) {
            return Err(AqnheError::Configuration(format!(
                "commission must be in [0, 0.1), got {}",
                self.commission
            )));
        }
        Ok(())
    }
}
