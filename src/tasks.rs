use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AnalysisTask, AnalysisType, TaskStatus};
use crate::store::StoreTx;

#[derive(Debug, Error)]
pub enum TaskQueueError {
    #[error("store error: {0}")]
    Store(#[from] AppError),
    #[error("analysis task {0} not found")]
    Missing(Uuid),
    #[error("analysis task {id} is {status}, expected {expected}")]
    InvalidState {
        id: Uuid,
        status: TaskStatus,
        expected: TaskStatus,
    },
}

pub type TaskQueueResult<T> = Result<T, TaskQueueError>;

impl From<TaskQueueError> for AppError {
    fn from(value: TaskQueueError) -> Self {
        match value {
            TaskQueueError::Store(err) => err,
            TaskQueueError::Missing(_) => AppError::not_found(),
            other => AppError::conflict(other.to_string()),
        }
    }
}

/// Serialized input of an analysis task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub document_id: Uuid,
    pub analysis_type: AnalysisType,
}

impl AnalysisPayload {
    pub fn from_task(task: &AnalysisTask) -> Result<Self, serde_json::Error> {
        serde_json::from_value(task.input_payload.clone())
    }
}

pub fn enqueue_task(
    tx: &mut dyn StoreTx,
    tenant_id: Uuid,
    document_id: Uuid,
    analysis_type: AnalysisType,
    requested_by: Uuid,
) -> TaskQueueResult<AnalysisTask> {
    let now = Utc::now().naive_utc();
    let payload = AnalysisPayload {
        document_id,
        analysis_type,
    };
    let task = AnalysisTask {
        id: Uuid::new_v4(),
        tenant_id,
        document_id,
        analysis_type,
        status: TaskStatus::Pending,
        input_payload: serde_json::to_value(&payload).map_err(AppError::from)?,
        output_payload: None,
        error_message: None,
        attempts: 0,
        requested_by,
        created_at: now,
        updated_at: now,
    };
    tx.insert_task(&task)?;
    Ok(task)
}

/// Moves the oldest pending task to `PROCESSING`.
pub fn reserve_next_task(tx: &mut dyn StoreTx) -> TaskQueueResult<Option<AnalysisTask>> {
    let Some(mut task) = tx.next_pending_task()? else {
        return Ok(None);
    };
    task.status = TaskStatus::Processing;
    task.attempts += 1;
    task.updated_at = Utc::now().naive_utc();
    tx.update_task(&task)?;
    Ok(Some(task))
}

fn processing_task(tx: &mut dyn StoreTx, task_id: Uuid) -> TaskQueueResult<AnalysisTask> {
    let task = tx
        .find_task(task_id)?
        .ok_or(TaskQueueError::Missing(task_id))?;
    if task.status != TaskStatus::Processing {
        return Err(TaskQueueError::InvalidState {
            id: task_id,
            status: task.status,
            expected: TaskStatus::Processing,
        });
    }
    Ok(task)
}

pub fn mark_task_completed(
    tx: &mut dyn StoreTx,
    task_id: Uuid,
    output: Value,
) -> TaskQueueResult<AnalysisTask> {
    let mut task = processing_task(tx, task_id)?;
    task.status = TaskStatus::Completed;
    task.output_payload = Some(output);
    task.error_message = None;
    task.updated_at = Utc::now().naive_utc();
    tx.update_task(&task)?;
    Ok(task)
}

pub fn mark_task_failed(
    tx: &mut dyn StoreTx,
    task_id: Uuid,
    error_message: &str,
) -> TaskQueueResult<AnalysisTask> {
    let mut task = processing_task(tx, task_id)?;
    task.status = TaskStatus::Failed;
    task.error_message = Some(error_message.to_string());
    task.updated_at = Utc::now().naive_utc();
    tx.update_task(&task)?;
    Ok(task)
}

/// Fails `PROCESSING` tasks last touched before `cutoff`, e.g. after a worker
/// crashed mid-run.
pub fn fail_stale_tasks(
    tx: &mut dyn StoreTx,
    cutoff: NaiveDateTime,
) -> TaskQueueResult<Vec<AnalysisTask>> {
    let now = Utc::now().naive_utc();
    let mut failed = Vec::new();
    for mut task in tx.stale_processing_tasks(cutoff)? {
        task.status = TaskStatus::Failed;
        task.error_message = Some("analysis timed out while processing".to_string());
        task.updated_at = now;
        tx.update_task(&task)?;
        failed.push(task);
    }
    Ok(failed)
}
