use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{AnalysisType, DocumentStatus, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Mentioned {
        document_id: Uuid,
        comment_id: Uuid,
        author_id: Uuid,
        user_ids: Vec<Uuid>,
    },
    StatusChanged {
        document_id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
        changed_by: Uuid,
    },
    AnalysisFinished {
        task_id: Uuid,
        document_id: Uuid,
        analysis_type: AnalysisType,
        status: TaskStatus,
    },
}

/// Out-of-band delivery (SMS, email, webhooks). Results are never consumed
/// by the engine beyond logging a failure.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn dispatch(&self, notice: Notice) -> Result<()>;
}

/// Writes notices to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn dispatch(&self, notice: Notice) -> Result<()> {
        match &notice {
            Notice::Mentioned {
                document_id,
                comment_id,
                user_ids,
                ..
            } => info!(%document_id, %comment_id, mentioned = user_ids.len(), "users mentioned"),
            Notice::StatusChanged {
                document_id,
                from,
                to,
                ..
            } => info!(%document_id, %from, %to, "document status changed"),
            Notice::AnalysisFinished {
                task_id,
                document_id,
                status,
                ..
            } => info!(%task_id, %document_id, %status, "analysis finished"),
        }
        Ok(())
    }
}
