use tokio::task;
use tracing::{debug, error};

use super::TaskExecution;
use crate::analysis::TextAnalyzer;
use crate::models::AnalysisTask;
use crate::store::WorkspaceStore;
use crate::tasks::AnalysisPayload;
use crate::workspace::Workspace;

/// Runs the analyzer for a reserved task. Every failure is folded into
/// [`TaskExecution::Failed`]; nothing here returns an error to the worker.
pub async fn run_analysis<S: WorkspaceStore>(
    workspace: &Workspace<S>,
    analyzer: &TextAnalyzer,
    task: &AnalysisTask,
) -> TaskExecution {
    let payload = match AnalysisPayload::from_task(task) {
        Ok(payload) => payload,
        Err(err) => {
            return TaskExecution::Failed {
                error: format!("invalid analysis payload: {err}"),
            }
        }
    };
    if payload.document_id != task.document_id {
        return TaskExecution::Failed {
            error: "analysis payload does not match task document".into(),
        };
    }
    if payload.analysis_type != task.analysis_type {
        return TaskExecution::Failed {
            error: format!(
                "analysis payload requests {} but task is {}",
                payload.analysis_type, task.analysis_type
            ),
        };
    }

    let document = match workspace
        .store()
        .transaction(|tx| tx.find_document(payload.document_id))
    {
        Ok(Some(document)) if document.tenant_id == task.tenant_id => document,
        Ok(_) => {
            return TaskExecution::Failed {
                error: format!("document {} not found", payload.document_id),
            }
        }
        Err(err) => {
            return TaskExecution::Failed {
                error: format!("failed to load document: {err}"),
            }
        }
    };

    debug!(
        task_id = %task.id,
        document_id = %document.id,
        analysis_type = %payload.analysis_type,
        "running analyzer"
    );
    let analyzer = analyzer.clone();
    let analysis_type = payload.analysis_type;
    match task::spawn_blocking(move || analyzer.run_document(&document, analysis_type)).await
    {
        Ok(result) => TaskExecution::Completed(Box::new(result)),
        Err(join_err) => {
            error!(task_id = %task.id, error = %join_err, "analyzer panicked");
            TaskExecution::Failed {
                error: format!("analyzer panicked: {join_err}"),
            }
        }
    }
}
