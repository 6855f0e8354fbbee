use crate::error::{AqnheError, Result};
use crate::types::Timeframe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time in epoch milliseconds, when the source provides one.
    pub timestamp: Option<i64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// A bar whose open, high, low and close all equal `price`.
    pub fn flat(price: f64) -> Self {
        Self {
            timestamp: None,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}

/// Ordered, validated OHLCV history for one symbol and timeframe.
///
/// Immutable once built; evaluations share it read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct MarketData {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    closes: Vec<f64>,
    log_returns: Vec<f64>,
    gap_count: usize,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            Self::validate_bar(i, bar)?;
        }
        let gap_count = Self::check_timestamps(&bars, timeframe)?;

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let mut log_returns = Vec::with_capacity(closes.len());
        if !closes.is_empty() {
            log_returns.push(0.0);
        }
        log_returns.extend(closes.windows(2).map(|w| (w[1] / w[0]).ln()));

        let symbol = symbol.into();
        if gap_count > 0 {
            log::warn!(
                "{} {}: {} gaps wider than one bar in market data",
                symbol, timeframe, gap_count
            );
        }

        Ok(Self {
            symbol,
            timeframe,
            bars,
            closes,
            log_returns,
            gap_count,
        })
    }

    /// Build a series from close prices only, each bar flat at its close.
    pub fn from_closes(symbol: impl Into<String>, timeframe: Timeframe, closes: &[f64]) -> Result<Self> {
        Self::new(symbol, timeframe, closes.iter().map(|&c| Bar::flat(c)).collect())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// `ln(close[t] / close[t-1])`, aligned with the bars; the first entry is 0.
    pub fn log_returns(&self) -> &[f64] {
        &self.log_returns
    }

    /// Number of timestamp gaps wider than one bar.
    pub fn gap_count(&self) -> usize {
        self.gap_count
    }

    /// The most recent `bars` bars, or everything when the series is shorter.
    pub fn tail(&self, bars: usize) -> Result<Self> {
        let start = self.bars.len().saturating_sub(bars);
        Self::new(self.symbol.clone(), self.timeframe, self.bars[start..].to_vec())
    }

    fn validate_bar(i: usize, bar: &Bar) -> Result<()> {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(AqnheError::DataLoading(format!(
                "Invalid data at row {}: prices must be positive and finite",
                i
            )));
        }
        if bar.high < bar.low {
            return Err(AqnheError::DataLoading(format!(
                "Invalid data at row {}: high ({}) < low ({})",
                i, bar.high, bar.low
            )));
        }
        if bar.high < bar.open || bar.high < bar.close {
            return Err(AqnheError::DataLoading(format!(
                "Invalid data at row {}: high ({}) < open ({}) or close ({})",
                i, bar.high, bar.open, bar.close
            )));
        }
        if bar.low > bar.open || bar.low > bar.close {
            return Err(AqnheError::DataLoading(format!(
                "Invalid data at row {}: low ({}) > open ({}) or close ({})",
                i, bar.low, bar.open, bar.close
            )));
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(AqnheError::DataLoading(format!(
                "Invalid data at row {}: volume ({}) must be non-negative",
                i, bar.volume
            )));
        }
        Ok(())
    }

    /// Timestamps must increase strictly. Returns how many steps exceed one bar.
    fn check_timestamps(bars: &[Bar], timeframe: Timeframe) -> Result<usize> {
        let step_ms = timeframe.duration().num_milliseconds();
        let mut gaps = 0;
        for (i, pair) in bars.windows(2).enumerate() {
            if let (Some(prev), Some(next)) = (pair[0].timestamp, pair[1].timestamp) {
                if next <= prev {
                    return Err(AqnheError::DataLoading(format!(
                        "Timestamps not strictly increasing at row {}",
                        i + 1
                    )));
                }
                if next - prev > step_ms {
                    gaps += 1;
                }
            }
        }
        Ok(gaps)
    }
}
