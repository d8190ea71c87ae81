//! The document lifecycle engine.
//!
//! Every public operation takes the caller's [`TenantContext`] and runs as a
//! single store transaction. Records outside the caller's tenant are reported
//! as `NotFound`, exactly like records that do not exist.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::{AnalysisType, Document};
use crate::notify::{Notice, Notifier};
use crate::storage::BlobStorage;
use crate::store::{StoreTx, WorkspaceStore};
use crate::tasks::enqueue_task;

pub mod analysis;
pub mod comments;
pub mod documents;
pub mod tags;
pub mod versions;

pub use comments::{build_threads, CommentThread, NewComment};
pub use documents::{DocumentDeletion, DocumentPatch, FileUpload, NewDocument};
pub use tags::{NewTag, TagPatch, TagUsage};
pub use versions::{RestoreOutcome, VersionComparison, VersionOrder};

pub struct Workspace<S> {
    store: Arc<S>,
    blobs: Arc<dyn BlobStorage>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
}

impl<S> Clone for Workspace<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            blobs: self.blobs.clone(),
            notifier: self.notifier.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: WorkspaceStore> Workspace<S> {
    pub fn new(
        store: Arc<S>,
        blobs: Arc<dyn BlobStorage>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            blobs,
            notifier,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStorage> {
        &self.blobs
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Hands a notice to the notifier. Delivery failures are logged only.
    pub(crate) async fn notify(&self, notice: Notice) {
        if let Err(err) = self.notifier.dispatch(notice).await {
            warn!(error = %err, "failed to dispatch notice");
        }
    }
}

/// Loads a document the caller may see, locking it for the rest of the
/// transaction when `lock` is set.
pub(crate) fn visible_document(
    tx: &mut dyn StoreTx,
    ctx: &TenantContext,
    document_id: Uuid,
    lock: bool,
) -> AppResult<Document> {
    let document = if lock {
        tx.lock_document(document_id)?
    } else {
        tx.find_document(document_id)?
    };
    match document {
        Some(document) if ctx.owns(document.tenant_id) => Ok(document),
        Some(_) => {
            debug!(%document_id, tenant_id = %ctx.tenant_id, "document belongs to another tenant");
            Err(AppError::not_found())
        }
        None => Err(AppError::not_found()),
    }
}

/// Queues the automatic analysis that follows a content change.
pub(crate) fn enqueue_auto_analysis(
    tx: &mut dyn StoreTx,
    settings: &EngineSettings,
    ctx: &TenantContext,
    document: &Document,
) -> AppResult<()> {
    if !settings.auto_analyze || document.content.trim().is_empty() {
        return Ok(());
    }
    enqueue_task(
        tx,
        document.tenant_id,
        document.id,
        AnalysisType::FullAnalysis,
        ctx.user_id,
    )?;
    Ok(())
}

pub(crate) fn require_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Column widths of the bounded text fields.
pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_TAG_NAME_LEN: usize = 100;
pub const MAX_TAG_COLOR_LEN: usize = 7;

pub(crate) fn require_text_max(value: &str, field: &str, max: usize) -> AppResult<String> {
    let text = require_text(value, field)?;
    check_len(&text, field, max)?;
    Ok(text)
}

pub(crate) fn check_len(value: &str, field: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
