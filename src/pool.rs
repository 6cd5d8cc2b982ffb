//! Bounded-concurrency issue worker pool.
//!
//! Every issue runs the same per-issue closure. At most `concurrency` of them
//! are in flight; the rest wait for a permit in input order. A failing or
//! panicking worker is counted and logged, and never cancels its siblings.
//! Only a failure of the scheduling machinery itself becomes a [`PoolError`].

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::errors::PoolError;

/// Terminal result of one issue's worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Succeeded { issue_id: String },
    Failed { issue_id: String, error: String },
}

impl WorkerOutcome {
    pub fn issue_id(&self) -> &str {
        match self {
            WorkerOutcome::Succeeded { issue_id } | WorkerOutcome::Failed { issue_id, .. } => {
                issue_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerOutcome::Succeeded { .. })
    }
}

/// Aggregate of a pool run. Outcomes are in completion order.
#[derive(Debug, Clone, Default)]
pub struct PoolSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub outcomes: Vec<WorkerOutcome>,
}

impl PoolSummary {
    pub fn all_succeeded(&self) -> bool {
        self.error_count == 0
    }

    fn record(&mut self, outcome: WorkerOutcome) {
        if outcome.is_success() {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Run `work` for every issue ID with at most `concurrency` in flight.
pub async fn process_all<F, Fut, E>(
    issue_ids: Vec<String>,
    concurrency: usize,
    work: F,
) -> Result<PoolSummary, PoolError>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    if concurrency == 0 || concurrency > Semaphore::MAX_PERMITS {
        return Err(PoolError::InvalidConcurrency(concurrency));
    }

    info!(
        "Processing {} issues with concurrency {}",
        issue_ids.len(),
        concurrency
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let summary = Arc::new(Mutex::new(PoolSummary::default()));
    let work = Arc::new(work);
    let mut tasks = JoinSet::new();
    let mut task_issues = HashMap::new();

    for issue_id in issue_ids {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::SemaphoreClosed)?;
        let work = Arc::clone(&work);
        let summary = Arc::clone(&summary);
        let id = issue_id.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            let outcome = match work(id.clone()).await {
                Ok(()) => {
                    info!("[{}] completed successfully", id);
                    WorkerOutcome::Succeeded { issue_id: id }
                }
                Err(e) => {
                    error!("[{}] failed: {}", id, e);
                    WorkerOutcome::Failed {
                        issue_id: id,
                        error: e.to_string(),
                    }
                }
            };
            summary.lock().await.record(outcome);
        });
        task_issues.insert(handle.id(), issue_id);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        let Err(join_err) = joined else { continue };
        let issue_id = task_issues.remove(&join_err.id()).unwrap_or_default();
        if join_err.is_panic() {
            error!("[{}] worker panicked", issue_id);
            summary.lock().await.record(WorkerOutcome::Failed {
                issue_id,
                error: "worker panicked".to_string(),
            });
        } else {
            return Err(PoolError::WorkerAborted {
                issue_id,
                message: join_err.to_string(),
            });
        }
    }

    let summary = std::mem::take(&mut *summary.lock().await);
    info!(
        "Processing complete: {} succeeded, {} failed",
        summary.success_count, summary.error_count
    );
    Ok(summary)
}
