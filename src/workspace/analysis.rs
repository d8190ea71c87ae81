use tracing::{info, warn};
use uuid::Uuid;

use super::{visible_document, Workspace};
use crate::analysis::AnalysisResult;
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::{AnalysisTask, AnalysisType, Document};
use crate::store::WorkspaceStore;
use crate::tasks::enqueue_task;

/// Parses the stored result for each analysis type present on the document,
/// in analysis-type order. Entries that no longer parse are skipped.
pub fn stored_results(document: &Document) -> Vec<AnalysisResult> {
    AnalysisType::ALL
        .iter()
        .filter_map(|analysis_type| {
            let raw = document.analysis.get(analysis_type.as_str())?;
            match serde_json::from_value::<AnalysisResult>(raw.clone()) {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(
                        document_id = %document.id,
                        %analysis_type,
                        error = %err,
                        "ignoring unreadable analysis result"
                    );
                    None
                }
            }
        })
        .collect()
}

impl<S: WorkspaceStore> Workspace<S> {
    /// Queues an analysis run and returns the `PENDING` task immediately.
    pub async fn request_analysis(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        analysis_type: AnalysisType,
    ) -> AppResult<AnalysisTask> {
        let task = self.store.transaction(|tx| {
            let document = visible_document(tx, ctx, document_id, false)?;
            Ok(enqueue_task(
                tx,
                document.tenant_id,
                document.id,
                analysis_type,
                ctx.user_id,
            )?)
        })?;

        info!(
            task_id = %task.id,
            %document_id,
            %analysis_type,
            "analysis requested"
        );
        Ok(task)
    }

    pub async fn get_task(&self, ctx: &TenantContext, task_id: Uuid) -> AppResult<AnalysisTask> {
        self.store.transaction(|tx| match tx.find_task(task_id)? {
            Some(task) if ctx.owns(task.tenant_id) => Ok(task),
            _ => Err(AppError::not_found()),
        })
    }

    /// Tasks of a document, oldest first.
    pub async fn list_tasks(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Vec<AnalysisTask>> {
        self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            tx.list_tasks(document_id)
        })
    }

    /// Latest result per analysis type.
    pub async fn analysis_results(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Vec<AnalysisResult>> {
        let document = self.get_document(ctx, document_id).await?;
        Ok(stored_results(&document))
    }

    pub async fn analysis_result(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        analysis_type: AnalysisType,
    ) -> AppResult<Option<AnalysisResult>> {
        Ok(self
            .analysis_results(ctx, document_id)
            .await?
            .into_iter()
            .find(|result| result.analysis_type == analysis_type))
    }
}
