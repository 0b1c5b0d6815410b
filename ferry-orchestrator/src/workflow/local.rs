//! In-process workflow engine
//!
//! Runs each operation on its own tokio task. Runs survive the request that
//! dispatched them but not a process restart; interrupted creates are picked
//! up by the reconciler instead.
//!
//! A finished run whose result nobody claimed within the await timeout is
//! dropped on the next dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{WorkflowDispatcher, WorkflowError, WorkflowHandle, WorkflowOperation, WorkflowOutput};
use crate::service::connection::{ConnectionError, ConnectionOrchestrator};

struct Run {
    task: JoinHandle<Result<WorkflowOutput, ConnectionError>>,
    dispatched_at: Instant,
}

pub struct LocalWorkflowEngine {
    orchestrator: Arc<ConnectionOrchestrator>,
    runs: Mutex<HashMap<Uuid, Run>>,
    timeout: Duration,
}

impl LocalWorkflowEngine {
    pub fn new(orchestrator: Arc<ConnectionOrchestrator>, timeout: Duration) -> Self {
        Self {
            orchestrator,
            runs: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn sweep(&self, runs: &mut HashMap<Uuid, Run>) {
        let before = runs.len();
        runs.retain(|_, run| {
            !(run.task.is_finished() && run.dispatched_at.elapsed() > self.timeout)
        });

        let swept = before - runs.len();
        if swept > 0 {
            debug!("Dropped {} unclaimed workflow results", swept);
        }
    }

    #[cfg(test)]
    async fn tracked_runs(&self) -> usize {
        self.runs.lock().await.len()
    }
}

#[async_trait]
impl WorkflowDispatcher for LocalWorkflowEngine {
    async fn dispatch(&self, operation: WorkflowOperation) -> Result<WorkflowHandle, WorkflowError> {
        let run_id = Uuid::new_v4();
        let name = operation.name();
        let orchestrator = self.orchestrator.clone();

        let task = tokio::spawn(async move { operation.execute(&orchestrator).await });

        let mut runs = self.runs.lock().await;
        self.sweep(&mut runs);
        runs.insert(
            run_id,
            Run {
                task,
                dispatched_at: Instant::now(),
            },
        );
        drop(runs);

        info!("Workflow dispatched: {} ({})", name, run_id);

        Ok(WorkflowHandle {
            run_id,
            operation: name.to_string(),
        })
    }

    async fn await_result(&self, handle: &WorkflowHandle) -> Result<WorkflowOutput, WorkflowError> {
        let run = self
            .runs
            .lock()
            .await
            .remove(&handle.run_id)
            .ok_or(WorkflowError::UnknownRun(handle.run_id))?;

        // Timing out drops the handle only; the task runs on detached
        match tokio::time::timeout(self.timeout, run.task).await {
            Err(_) => {
                warn!(
                    "Workflow {} ({}) still running after {:?}",
                    handle.operation, handle.run_id, self.timeout
                );
                Err(WorkflowError::TimedOut(handle.run_id))
            }
            Ok(Err(join_err)) => Err(WorkflowError::Dispatch(format!(
                "workflow run {} aborted: {}",
                handle.run_id, join_err
            ))),
            Ok(Ok(result)) => result.map_err(WorkflowError::from),
        }
    }
}
