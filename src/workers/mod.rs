use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{
    analysis::{AnalysisResult, TextAnalyzer},
    error::AppError,
    models::{AnalysisTask, TaskStatus},
    notify::Notice,
    store::WorkspaceStore,
    tasks::{mark_task_completed, mark_task_failed, reserve_next_task, TaskQueueError},
    workspace::Workspace,
};

pub mod analyze;

#[derive(Debug)]
pub enum TaskExecution {
    Completed(Box<AnalysisResult>),
    Failed { error: String },
}

/// Executes queued analysis tasks one at a time.
pub struct Worker<S> {
    workspace: Workspace<S>,
    analyzer: TextAnalyzer,
    poll_interval: Duration,
}

impl<S: WorkspaceStore> Worker<S> {
    pub fn new(workspace: Workspace<S>, poll_interval: Duration) -> Self {
        let analyzer = TextAnalyzer::new(workspace.settings().analyzer_id.clone());
        Self {
            workspace,
            analyzer,
            poll_interval,
        }
    }

    pub async fn run(&self) {
        info!(analyzer = %self.analyzer.analyzer_id(), "worker started");
        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => sleep(self.poll_interval).await,
                Err(err) => {
                    error!(error = %err, "worker tick failed");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Processes tasks until the queue is empty. Returns how many ran.
    pub async fn drain(&self) -> Result<usize, TaskQueueError> {
        let mut processed = 0;
        while self.tick().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Reserves and runs one task. `Ok(false)` means the queue was empty.
    pub async fn tick(&self) -> Result<bool, TaskQueueError> {
        let reserved = self
            .workspace
            .store()
            .transaction(|tx| Ok(reserve_next_task(tx)?))?;
        let Some(task) = reserved else {
            return Ok(false);
        };

        let execution = analyze::run_analysis(&self.workspace, &self.analyzer, &task).await;
        let status = match self.record(&task, execution) {
            Ok(status) => status,
            Err(err) => self.fail_unrecorded(&task, err)?,
        };

        self.workspace
            .notify(Notice::AnalysisFinished {
                task_id: task.id,
                document_id: task.document_id,
                analysis_type: task.analysis_type,
                status,
            })
            .await;
        Ok(true)
    }

    /// Writes the outcome. A completed result lands on the document and the
    /// task in the same transaction.
    fn record(
        &self,
        task: &AnalysisTask,
        execution: TaskExecution,
    ) -> Result<TaskStatus, TaskQueueError> {
        let store = self.workspace.store();
        match execution {
            TaskExecution::Completed(result) => {
                let output = serde_json::to_value(&*result).map_err(AppError::from)?;
                let status = store.transaction(|tx| {
                    let Some(mut document) = tx.lock_document(task.document_id)? else {
                        mark_task_failed(tx, task.id, "document was deleted during analysis")?;
                        return Ok(TaskStatus::Failed);
                    };
                    let mut results = match document.analysis.take() {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    let key = task.analysis_type.as_str();
                    if is_newer_than_stored(results.get(key), result.edit_version) {
                        results.insert(key.to_string(), output.clone());
                        document.analysis = Value::Object(results);
                        tx.update_document(&document)?;
                    } else {
                        debug!(
                            task_id = %task.id,
                            document_id = %task.document_id,
                            edit_version = result.edit_version,
                            "stored result is newer; keeping it"
                        );
                    }
                    mark_task_completed(tx, task.id, output)?;
                    Ok(TaskStatus::Completed)
                })?;
                info!(
                    task_id = %task.id,
                    document_id = %task.document_id,
                    analysis_type = %task.analysis_type,
                    %status,
                    "analysis task finished"
                );
                Ok(status)
            }
            TaskExecution::Failed { error } => {
                error!(
                    task_id = %task.id,
                    document_id = %task.document_id,
                    analysis_type = %task.analysis_type,
                    %error,
                    "analysis task failed"
                );
                store.transaction(|tx| Ok(mark_task_failed(tx, task.id, &error)?))?;
                Ok(TaskStatus::Failed)
            }
        }
    }

    /// Marks the task failed in a fresh transaction after its outcome could
    /// not be written. Returns the original error when that fails too.
    fn fail_unrecorded(
        &self,
        task: &AnalysisTask,
        err: TaskQueueError,
    ) -> Result<TaskStatus, TaskQueueError> {
        error!(task_id = %task.id, error = %err, "failed to record analysis outcome");
        let message = format!("failed to record analysis outcome: {err}");
        match self
            .workspace
            .store()
            .transaction(|tx| Ok(mark_task_failed(tx, task.id, &message)?))
        {
            Ok(_) => Ok(TaskStatus::Failed),
            Err(mark_err) => {
                warn!(task_id = %task.id, error = %mark_err, "could not mark task failed");
                Err(err)
            }
        }
    }
}

/// False when the stored result was computed from a later edit than
/// `edit_version`. Results stored without an edit version are replaced.
fn is_newer_than_stored(stored: Option<&Value>, edit_version: i32) -> bool {
    stored
        .and_then(|value| value.get("edit_version"))
        .and_then(Value::as_i64)
        .map_or(true, |stored| i64::from(edit_version) >= stored)
}
