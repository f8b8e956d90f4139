use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parsync_core::WorkItem;

use crate::executor::operation::{OperationError, OperationExecutor};

/// Stand-in platform for dry runs.
///
/// Items can force an outcome with `"simulate": "fatal" | "retryable" | "hang"` in their
/// payload; otherwise failures are rolled against the configured rates.
pub struct SimulatedExecutor {
    retryable_rate: f64,
    fatal_rate: f64,
    latency: Duration,
    rng: Mutex<fastrand::Rng>,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl SimulatedExecutor {
    pub fn new(retryable_rate: f64, fatal_rate: f64) -> Self {
        Self {
            retryable_rate: retryable_rate.clamp(0.0, 1.0),
            fatal_rate: fatal_rate.clamp(0.0, 1.0),
            latency: Duration::ZERO,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            ..self
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn roll(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.f64(),
            Err(poisoned) => poisoned.into_inner().f64(),
        }
    }
}

#[async_trait]
impl OperationExecutor for SimulatedExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<(), OperationError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match item.payload.get("simulate").and_then(|v| v.as_str()) {
            Some("fatal") => {
                return Err(OperationError::fatal(format!("simulated rejection of {}", item.id)))
            }
            Some("retryable") => {
                return Err(OperationError::retryable(format!(
                    "simulated throttling of {}",
                    item.id
                )))
            }
            Some("hang") => {
                std::future::pending::<()>().await;
            }
            _ => {}
        }

        let roll = self.roll();
        if roll < self.fatal_rate {
            return Err(OperationError::fatal(format!("simulated rejection of {}", item.id)));
        }
        if roll < self.fatal_rate + self.retryable_rate {
            return Err(OperationError::retryable(format!(
                "simulated throttling of {}",
                item.id
            )));
        }
        Ok(())
    }
}
