use crate::error::{AqnheError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative stop signal shared between the controller, its workers and
/// whoever wants to interrupt a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Time and cancellation limits for a single genome evaluation.
#[derive(Debug, Clone)]
pub struct EvalBudget {
    started: Instant,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl EvalBudget {
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: timeout.map(|t| started + t),
            cancel,
        }
    }

    /// No deadline and a token nobody holds.
    pub fn unlimited() -> Self {
        Self::new(None, CancellationToken::new())
    }

    /// Fails with `Cancelled` or `EvaluationTimeout` once either limit is hit.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AqnheError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(AqnheError::EvaluationTimeout {
                    elapsed_ms: now.duration_since(self.started).as_millis(),
                });
            }
        }
        Ok(())
    }
}
