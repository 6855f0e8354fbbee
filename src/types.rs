use crate::error::{AqnheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub direction: Direction,
    pub size: f64,
    pub profit: f64,
    pub exit_reason: ExitReason,
    pub fees: f64,
}

impl Trade {
    /// Net return of the trade relative to the notional committed at entry.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional > 0.0 {
            (self.profit - self.fees) / notional
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    EndOfData,
}

/// Decision emitted by the strategy network for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Long { size: f64 },
    Short { size: f64 },
    Flat,
}

impl Action {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Action::Long { .. } => Some(Direction::Long),
            Action::Short { .. } => Some(Direction::Short),
            Action::Flat => None,
        }
    }
}

/// Bar interval of the market data, e.g. `1h` or `15m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    minutes: u32,
}

const MINUTES_PER_YEAR: f64 = 365.0 * 24.0 * 60.0;

impl Timeframe {
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(AqnheError::Configuration(
                "Timeframe must be at least one minute".to_string(),
            ));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes as i64)
    }

    /// Bars per year for a market that trades around the clock.
    pub fn periods_per_year(&self) -> f64 {
        MINUTES_PER_YEAR / self.minutes as f64
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self { minutes: 60 }
    }
}

impl FromStr for Timeframe {
    type Err = AqnheError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || AqnheError::Configuration(format!("Invalid timeframe '{}'", s));
        let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        let (count, unit) = s.split_at(split);
        let count: u32 = count.parse().map_err(|_| invalid())?;
        let multiplier = match unit {
            "m" => 1,
            "h" => 60,
            "d" => 60 * 24,
            "w" => 60 * 24 * 7,
            _ => return Err(invalid()),
        };
        Self::from_minutes(count.checked_mul(multiplier).ok_or_else(invalid)?)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minutes;
        if m % (60 * 24 * 7) == 0 {
            write!(f, "{}w", m / (60 * 24 * 7))
        } else if m % (60 * 24) == 0 {
            write!(f, "{}d", m / (60 * 24))
        } else if m % 60 == 0 {
            write!(f, "{}h", m / 60)
        } else {
            write!(f, "{}m", m)
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = AqnheError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.to_string()
    }
}
