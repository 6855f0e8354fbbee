use crate::{
    config::TradingConfig,
    data::MarketData,
    engines::evaluation::{
        budget::EvalBudget,
        features::ReturnFeatures,
        network::Activations,
        Portfolio,
    },
    engines::generation::codec::{CollapsedParameters, MAX_LOOKBACK},
    engines::metrics::{MetricsEngine, PerformanceMetrics, RiskMetrics},
    error::{AqnheError, Result},
    types::{Action, Trade},
};

/// Decision bars required after warm-up for metrics to mean anything.
pub const MIN_TRADING_BARS: usize = 30;
/// Bars between budget checks inside the simulation loop.
const BUDGET_CHECK_INTERVAL: usize = 64;

/// Turns collapsed parameters into performance metrics over market history.
///
/// Implementations must be deterministic for identical inputs and must not
/// mutate the shared market data.
pub trait StrategyEvaluator: Send + Sync {
    fn evaluate(
        &self,
        params: &CollapsedParameters,
        data: &MarketData,
        budget: &EvalBudget,
    ) -> Result<PerformanceMetrics>;

    /// Shortest history that can be evaluated for a network with `input_size` inputs.
    fn min_history(&self, input_size: usize) -> usize;
}

/// Full output of one simulated session.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub metrics: PerformanceMetrics,
    pub returns: Vec<f64>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

pub struct Backtester {
    initial_balance: f64,
    commission: f64,
    max_position_size: f64,
}

impl Backtester {
    pub fn new(initial_balance: f64, commission: f64, max_position_size: f64) -> Self {
        Self {
            initial_balance,
            commission,
            max_position_size,
        }
    }

    pub fn from_config(trading: &TradingConfig) -> Self {
        Self::new(
            trading.initial_capital,
            trading.commission,
            trading.max_position_size,
        )
    }

    /// Map a network signal to an action under the collapsed thresholds.
    pub fn decide(&self, signal: f64, params: &CollapsedParameters) -> Action {
        let strategy = &params.strategy;
        let size = (self.max_position_size * strategy.position_scale * signal.abs())
            .min(self.max_position_size);
        if signal > strategy.entry_threshold {
            Action::Long { size }
        } else if signal < -strategy.entry_threshold {
            Action::Short { size }
        } else {
            Action::Flat
        }
    }

    pub fn run(
        &self,
        params: &CollapsedParameters,
        data: &MarketData,
        budget: &EvalBudget,
    ) -> Result<BacktestReport> {
        let input_size = params.network.input_size();
        let required = self.min_history(input_size);
        if data.len() < required {
            return Err(AqnheError::InsufficientHistory {
                required,
                available: data.len(),
            });
        }

        let closes = data.closes();
        let features = ReturnFeatures::new(data.log_returns(), params.strategy.lookback, input_size);
        let start = features.first_ready_bar();
        let last = closes.len() - 1;

        let mut portfolio = Portfolio::new(self.initial_balance, self.commission);
        let mut inputs = Vec::with_capacity(input_size);
        let mut buffers = Activations::default();

        for t in start..last {
            if (t - start) % BUDGET_CHECK_INTERVAL == 0 {
                budget.check()?;
            }
            features.fill(t, &mut inputs);
            let signal = params.network.signal(&inputs, &mut buffers);
            let action = self.decide(signal, params);
            portfolio.process_bar(t, action, closes[t])?;
        }
        portfolio.finish(last, closes[last])?;

        let equity_curve = portfolio.get_equity_curve().to_vec();
        let trades = portfolio.get_trades().to_vec();
        let metrics = MetricsEngine::new(data.timeframe().periods_per_year())
            .calculate_all(&equity_curve, &trades);

        log::debug!(
            "{}: sharpe {:.3} drawdown {:.3} win rate {:.2} over {} trades",
            params.genome_id,
            metrics.sharpe_ratio,
            metrics.max_drawdown,
            metrics.win_rate,
            metrics.trade_count
        );

        Ok(BacktestReport {
            metrics,
            returns: RiskMetrics::calculate_returns(&equity_curve),
            trades,
            equity_curve,
        })
    }
}

impl StrategyEvaluator for Backtester {
    fn evaluate(
        &self,
        params: &CollapsedParameters,
        data: &MarketData,
        budget: &EvalBudget,
    ) -> Result<PerformanceMetrics> {
        self.run(params, data, budget).map(|report| report.metrics)
    }

    fn min_history(&self, input_size: usize) -> usize {
        input_size + MAX_LOOKBACK + 1 + MIN_TRADING_BARS
    }
}
