use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{enqueue_auto_analysis, visible_document, Workspace};
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentVersion};
use crate::store::{StoreTx, WorkspaceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrder {
    #[default]
    Ascending,
    Descending,
}

/// Two snapshots side by side. Rendering the difference is left to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionComparison {
    pub left: DocumentVersion,
    pub right: DocumentVersion,
    pub title_changed: bool,
    pub content_changed: bool,
    pub file_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreOutcome {
    pub document: Document,
    /// Snapshot of the state the restore replaced.
    pub backup: DocumentVersion,
    pub restored_from: DocumentVersion,
}

/// Appends a snapshot of `document` under the next free number and bumps its
/// snapshot counter. The caller persists `document`; the row must already be
/// locked so concurrent snapshots serialize.
fn append_snapshot(
    tx: &mut dyn StoreTx,
    document: &mut Document,
    change_description: Option<String>,
    author: Uuid,
) -> AppResult<DocumentVersion> {
    let version_number = tx.max_version_number(document.id)?.unwrap_or(0) + 1;
    let version = DocumentVersion {
        id: Uuid::new_v4(),
        document_id: document.id,
        version_number,
        title: document.title.clone(),
        content: document.content.clone(),
        file_url: document.file_url.clone(),
        change_description,
        created_by: author,
        created_at: Utc::now().naive_utc(),
    };
    tx.insert_version(&version)?;
    document.snapshot_count += 1;
    Ok(version)
}

fn visible_version(
    tx: &mut dyn StoreTx,
    ctx: &TenantContext,
    version_id: Uuid,
) -> AppResult<DocumentVersion> {
    let version = tx.find_version(version_id)?.ok_or_else(AppError::not_found)?;
    visible_document(tx, ctx, version.document_id, false)?;
    Ok(version)
}

impl<S: WorkspaceStore> Workspace<S> {
    pub async fn snapshot(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        change_description: Option<String>,
    ) -> AppResult<DocumentVersion> {
        let description = change_description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let version = self.store.transaction(|tx| {
            let mut document = visible_document(tx, ctx, document_id, true)?;
            let version = append_snapshot(tx, &mut document, description, ctx.user_id)?;
            tx.update_document(&document)?;
            Ok(version)
        })?;

        info!(
            %document_id,
            version_id = %version.id,
            version_number = version.version_number,
            "version snapshot created"
        );
        Ok(version)
    }

    pub async fn list_versions(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        order: VersionOrder,
    ) -> AppResult<Vec<DocumentVersion>> {
        let mut versions = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            tx.list_versions(document_id)
        })?;
        if order == VersionOrder::Descending {
            versions.reverse();
        }
        debug!(%document_id, count = versions.len(), "listed versions");
        Ok(versions)
    }

    pub async fn get_version(
        &self,
        ctx: &TenantContext,
        version_id: Uuid,
    ) -> AppResult<DocumentVersion> {
        self.store
            .transaction(|tx| visible_version(tx, ctx, version_id))
    }

    pub async fn compare_versions(
        &self,
        ctx: &TenantContext,
        left_id: Uuid,
        right_id: Uuid,
    ) -> AppResult<VersionComparison> {
        let (left, right) = self.store.transaction(|tx| {
            let left = visible_version(tx, ctx, left_id)?;
            let right = visible_version(tx, ctx, right_id)?;
            Ok((left, right))
        })?;

        Ok(VersionComparison {
            title_changed: left.title != right.title,
            content_changed: left.content != right.content,
            file_changed: left.file_url != right.file_url,
            left,
            right,
        })
    }

    /// Snapshots the current state, then puts the snapshot's title, content
    /// and file back onto the document. Counts as a content edit.
    pub async fn restore_version(
        &self,
        ctx: &TenantContext,
        version_id: Uuid,
    ) -> AppResult<RestoreOutcome> {
        let settings = &self.settings;
        let outcome = self.store.transaction(|tx| {
            let target = tx
                .find_version(version_id)?
                .ok_or_else(AppError::not_found)?;
            let mut document = visible_document(tx, ctx, target.document_id, true)?;

            let backup = append_snapshot(
                tx,
                &mut document,
                Some(format!(
                    "Automatic backup before restoring version {}",
                    target.version_number
                )),
                ctx.user_id,
            )?;

            let content_changed = document.content != target.content;
            if document.file_url != target.file_url {
                // snapshots do not carry checksums
                document.file_checksum = None;
            }
            document.title = target.title.clone();
            document.content = target.content.clone();
            document.file_url = target.file_url.clone();
            document.edit_version += 1;
            document.updated_at = Utc::now().naive_utc();
            tx.update_document(&document)?;
            if content_changed {
                enqueue_auto_analysis(tx, settings, ctx, &document)?;
            }

            Ok(RestoreOutcome {
                document,
                backup,
                restored_from: target,
            })
        })?;

        info!(
            document_id = %outcome.document.id,
            restored_version = outcome.restored_from.version_number,
            backup_version = outcome.backup.version_number,
            "document restored"
        );
        Ok(outcome)
    }
}
