use crate::error::{PipelineError, Result};
use crate::partition::WorkUnit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

/// The two mate files written by one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPair {
    pub first: PathBuf,
    pub second: PathBuf,
}

/// Output locations of one worker, addressed by the index of its unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub index: usize,
    pub outputs: ReadPair,
}

/// One external-process invocation per work unit (pluggable)
#[async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Run the worker for `unit` to completion and report its outputs.
    /// Output paths must be unique to the unit.
    async fn invoke(&self, unit: &WorkUnit) -> Result<ReadPair>;
}

/// A running worker's hold on the pool. Raises the stop flag before the
/// permit is released unless the worker succeeded, so a panic stops dispatch too.
struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
    failed: Arc<AtomicBool>,
    succeeded: bool,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        if !self.succeeded {
            self.failed.store(true, Ordering::SeqCst);
        }
    }
}

/// Bounded pool running one invocation per unit
pub struct WorkerPool {
    max_concurrency: usize,
}

impl WorkerPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run every unit, at most `max_concurrency` at a time, and return the
    /// results ordered by unit index.
    ///
    /// After the first failure no further unit is started; workers already
    /// running are awaited, never killed. The failure of the lowest failing
    /// index is returned.
    pub async fn execute(
        &self,
        units: Vec<WorkUnit>,
        invoker: Arc<dyn WorkerInvoker>,
    ) -> Result<Vec<WorkerResult>> {
        let total = units.len();
        // Never more slots than units
        let concurrency = self.max_concurrency.min(total.max(1));
        let slots = Arc::new(Semaphore::new(concurrency));
        let failed = Arc::new(AtomicBool::new(false));

        info!("Dispatching {} workers ({} concurrent)", total, concurrency);

        let mut tasks = Vec::with_capacity(total);
        for unit in units {
            let permit = slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Join(e.to_string()))?;

            if failed.load(Ordering::SeqCst) {
                warn!(
                    "Worker failure detected, not starting worker {} or later",
                    unit.index
                );
                break;
            }

            let invoker = invoker.clone();
            let mut slot = WorkerSlot {
                _permit: permit,
                failed: failed.clone(),
                succeeded: false,
            };
            tasks.push((
                unit.index,
                tokio::spawn(async move {
                    let result = invoker.invoke(&unit).await;
                    slot.succeeded = result.is_ok();
                    drop(slot);
                    result
                }),
            ));
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = tasks.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        // Handles are in dispatch (index) order, so the first error seen has the lowest index
        let mut first_error: Option<PipelineError> = None;
        for (index, task_result) in indices.into_iter().zip(joined) {
            let outcome = match task_result {
                Ok(outcome) => outcome,
                Err(join_err) => Err(PipelineError::Join(format!(
                    "worker {}: {}",
                    index, join_err
                ))),
            };

            match outcome {
                Ok(outputs) => results.push(WorkerResult { index, outputs }),
                Err(e) => {
                    error!("Worker {} failed: {}", index, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        results.sort_by_key(|r| r.index);
        info!("All {} workers finished", results.len());
        Ok(results)
    }
}
