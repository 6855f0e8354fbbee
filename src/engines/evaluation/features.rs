/// Largest clipped magnitude of a normalised return.
pub const FEATURE_CLIP: f64 = 5.0;

/// Volatility-normalised lagged returns fed to the strategy network.
///
/// Input `j` at bar `t` is `r[t - j] / sigma[t]`, where `r` are log returns and
/// `sigma[t]` is the population standard deviation of the `lookback` returns
/// ending at `t`. Values are clipped to `[-FEATURE_CLIP, FEATURE_CLIP]` and
/// are 0 wherever `sigma` is 0.
pub struct ReturnFeatures<'a> {
    returns: &'a [f64],
    sigma: Vec<f64>,
    width: usize,
    lookback: usize,
}

impl<'a> ReturnFeatures<'a> {
    /// `returns` must be aligned with the bars, `returns[0]` being a placeholder.
    pub fn new(returns: &'a [f64], lookback: usize, width: usize) -> Self {
        let lookback = lookback.max(2);
        Self {
            sigma: rolling_std(returns, lookback),
            returns,
            width,
            lookback,
        }
    }

    /// First bar with a full feature window and a full volatility window.
    pub fn first_ready_bar(&self) -> usize {
        warmup_bars(self.lookback, self.width)
    }

    /// Write the feature vector of bar `t` into `out`.
    pub fn fill(&self, t: usize, out: &mut Vec<f64>) {
        out.clear();
        let sigma = self.sigma.get(t).copied().unwrap_or(0.0);
        for j in 0..self.width {
            let value = match t.checked_sub(j) {
                Some(i) if i >= 1 && sigma > 0.0 => {
                    (self.returns[i] / sigma).clamp(-FEATURE_CLIP, FEATURE_CLIP)
                }
                _ => 0.0,
            };
            out.push(value);
        }
    }
}

/// Bars consumed before the first decision can be made.
pub fn warmup_bars(lookback: usize, width: usize) -> usize {
    lookback.max(2).max(width)
}

/// Rolling population standard deviation over `window` returns ending at each
/// index, skipping the placeholder at index 0. Indices without a full window
/// hold 0.
fn rolling_std(returns: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![0.0; returns.len()];
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for t in 1..returns.len() {
        let r = returns[t];
        sum += r;
        sum_sq += r * r;
        if t > window {
            let old = returns[t - window];
            sum -= old;
            sum_sq -= old * old;
        }
        if t >= window {
            let n = window as f64;
            let mean = sum / n;
            let variance = (sum_sq / n - mean * mean).max(0.0);
            out[t] = variance.sqrt();
        }
    }
    out
}
