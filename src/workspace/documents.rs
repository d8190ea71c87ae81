use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    enqueue_auto_analysis, require_text, require_text_max, tags, visible_document, Workspace,
    MAX_TITLE_LEN,
};
use crate::config::{StatusPolicy, UpdatePolicy};
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentStatus, DocumentType};
use crate::notify::Notice;
use crate::store::{DocumentFilter, WorkspaceStore};
use crate::utils::json::{trim_nullable, Nullable};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub document_type: DocumentType,
    pub case_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

/// Partial update. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Nullable<String>,
    pub content: Option<String>,
    pub document_type: Option<DocumentType>,
    pub case_id: Nullable<Uuid>,
    pub client_id: Nullable<Uuid>,
    /// Replaces the whole tag set when present.
    pub tag_ids: Option<Vec<Uuid>>,
    /// Required under the compare-and-swap update policy.
    pub expected_edit_version: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Replace the file of this document instead of creating a new one.
    pub document_id: Option<Uuid>,
    pub title: Option<String>,
    pub document_type: Option<DocumentType>,
    pub case_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentDeletion {
    pub comments: usize,
    pub versions: usize,
    pub tag_links: usize,
}

fn is_text_mime(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/")
        || matches!(
            essence.as_str(),
            "application/json" | "application/xml" | "application/rtf"
        )
}

/// Decodes text uploads; binary uploads yield `None`.
fn decode_text(bytes: &[u8], content_type: Option<&str>) -> AppResult<Option<String>> {
    if !content_type.is_some_and(is_text_mime) {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::validation("text upload is not valid UTF-8"))?;
    Ok(Some(text.trim_start_matches('\u{feff}').to_string()))
}

fn new_draft(ctx: &TenantContext, input: NewDocument) -> AppResult<(Document, Vec<Uuid>)> {
    let title = require_text_max(&input.title, "title", MAX_TITLE_LEN)?;
    let now = Utc::now().naive_utc();
    let document = Document {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        title,
        description: input
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        content: input.content,
        status: DocumentStatus::Draft,
        document_type: input.document_type,
        edit_version: 1,
        snapshot_count: 0,
        case_id: input.case_id,
        client_id: input.client_id,
        file_url: None,
        file_checksum: None,
        analysis: json!({}),
        created_by: ctx.user_id,
        created_at: now,
        updated_at: now,
    };
    Ok((document, input.tag_ids))
}

impl<S: WorkspaceStore> Workspace<S> {
    pub async fn create_document(
        &self,
        ctx: &TenantContext,
        input: NewDocument,
    ) -> AppResult<Document> {
        let (document, tag_ids) = new_draft(ctx, input)?;
        self.insert_draft(ctx, document, tag_ids).await
    }

    async fn insert_draft(
        &self,
        ctx: &TenantContext,
        document: Document,
        tag_ids: Vec<Uuid>,
    ) -> AppResult<Document> {
        let settings = &self.settings;
        self.store.transaction(|tx| {
            tx.insert_document(&document)?;
            if !tag_ids.is_empty() {
                tags::replace_document_tags(tx, ctx, document.id, &tag_ids)?;
            }
            enqueue_auto_analysis(tx, settings, ctx, &document)
        })?;

        info!(
            document_id = %document.id,
            tenant_id = %ctx.tenant_id,
            document_type = %document.document_type,
            "document created"
        );
        Ok(document)
    }

    pub async fn get_document(&self, ctx: &TenantContext, document_id: Uuid) -> AppResult<Document> {
        debug!(%document_id, "loading document");
        self.store
            .transaction(|tx| visible_document(tx, ctx, document_id, false))
    }

    /// Newest first.
    pub async fn list_documents(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
    ) -> AppResult<Vec<Document>> {
        self.store
            .transaction(|tx| tx.list_documents(ctx.tenant_id, &filter))
    }

    pub async fn update_document(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        patch: DocumentPatch,
    ) -> AppResult<Document> {
        let settings = &self.settings;
        let (document, content_changed) = self.store.transaction(|tx| {
            let mut document = visible_document(tx, ctx, document_id, true)?;

            if settings.update_policy == UpdatePolicy::CompareAndSwap {
                let expected = patch.expected_edit_version.ok_or_else(|| {
                    AppError::validation("expected_edit_version is required")
                })?;
                if expected != document.edit_version {
                    return Err(AppError::conflict(format!(
                        "document is at edit version {}, not {expected}",
                        document.edit_version
                    )));
                }
            }

            if let Some(title) = &patch.title {
                document.title = require_text_max(title, "title", MAX_TITLE_LEN)?;
            }
            document.description = trim_nullable(patch.description).apply(document.description);
            let mut content_changed = false;
            if let Some(content) = patch.content {
                if content != document.content {
                    document.content = content;
                    document.edit_version += 1;
                    content_changed = true;
                }
            }
            if let Some(document_type) = patch.document_type {
                document.document_type = document_type;
            }
            document.case_id = patch.case_id.apply(document.case_id);
            document.client_id = patch.client_id.apply(document.client_id);
            document.updated_at = Utc::now().naive_utc();
            tx.update_document(&document)?;

            if let Some(tag_ids) = &patch.tag_ids {
                tags::replace_document_tags(tx, ctx, document.id, tag_ids)?;
            }
            if content_changed {
                enqueue_auto_analysis(tx, settings, ctx, &document)?;
            }
            Ok((document, content_changed))
        })?;

        info!(
            document_id = %document.id,
            edit_version = document.edit_version,
            content_changed,
            "document updated"
        );
        Ok(document)
    }

    pub async fn update_status(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        target: DocumentStatus,
    ) -> AppResult<Document> {
        let policy = self.settings.status_policy;
        let (document, previous) = self.store.transaction(|tx| {
            let mut document = visible_document(tx, ctx, document_id, true)?;
            let previous = document.status;
            if policy == StatusPolicy::ForwardOnly && !previous.is_forward_step(target) {
                return Err(AppError::validation(format!(
                    "cannot move document from {previous} to {target}"
                )));
            }
            if previous != target {
                document.status = target;
                document.updated_at = Utc::now().naive_utc();
                tx.update_document(&document)?;
            }
            Ok((document, previous))
        })?;

        if previous != target {
            info!(%document_id, from = %previous, to = %target, "document status changed");
            self.notify(Notice::StatusChanged {
                document_id,
                from: previous,
                to: target,
                changed_by: ctx.user_id,
            })
            .await;
        }
        Ok(document)
    }

    /// Removes the document with its comments, versions and tag links.
    /// Analysis tasks are kept as history.
    pub async fn delete_document(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<DocumentDeletion> {
        let deletion = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, true)?;
            let deletion = DocumentDeletion {
                comments: tx.delete_document_comments(document_id)?,
                versions: tx.delete_versions(document_id)?,
                tag_links: tx.unlink_document_tags(document_id)?,
            };
            tx.delete_document(document_id)?;
            Ok(deletion)
        })?;

        info!(
            %document_id,
            comments = deletion.comments,
            versions = deletion.versions,
            tag_links = deletion.tag_links,
            "document deleted"
        );
        Ok(deletion)
    }

    /// Stores the file through blob storage and either creates a new draft or
    /// replaces the file (and text content) of an existing document, which
    /// moves it back to `DRAFT`.
    pub async fn upload_with_file(
        &self,
        ctx: &TenantContext,
        upload: FileUpload,
    ) -> AppResult<Document> {
        if upload.bytes.is_empty() {
            return Err(AppError::validation("file must not be empty"));
        }
        let filename = require_text(&upload.filename, "filename")?;
        let title = match (&upload.title, upload.document_id) {
            (Some(title), _) => Some(require_text_max(title, "title", MAX_TITLE_LEN)?),
            (None, None) => Some(require_text_max(&filename, "title", MAX_TITLE_LEN)?),
            (None, Some(_)) => None,
        };
        if let Some(document_id) = upload.document_id {
            self.store
                .transaction(|tx| visible_document(tx, ctx, document_id, false))?;
        }

        let content_type = upload.content_type.clone().or_else(|| {
            mime_guess::from_path(&filename)
                .first_raw()
                .map(str::to_string)
        });
        let text = decode_text(&upload.bytes, content_type.as_deref())?;
        let checksum = hex::encode(Sha256::digest(&upload.bytes));
        let file_url = self
            .blobs
            .store(upload.bytes, &filename, content_type.clone())
            .await?;
        debug!(%file_url, %checksum, "stored uploaded file");

        let Some(document_id) = upload.document_id else {
            let (mut document, tag_ids) = new_draft(
                ctx,
                NewDocument {
                    title: title.unwrap_or_else(|| filename.clone()),
                    content: text.unwrap_or_default(),
                    document_type: upload.document_type.unwrap_or_default(),
                    case_id: upload.case_id,
                    client_id: upload.client_id,
                    ..NewDocument::default()
                },
            )?;
            document.file_url = Some(file_url);
            document.file_checksum = Some(checksum);
            return self.insert_draft(ctx, document, tag_ids).await;
        };

        let settings = &self.settings;
        let (document, previous) = self.store.transaction(|tx| {
            let mut document = visible_document(tx, ctx, document_id, true)?;
            let previous = document.status;
            if let Some(title) = &title {
                document.title = title.clone();
            }
            if let Some(document_type) = upload.document_type {
                document.document_type = document_type;
            }
            if upload.case_id.is_some() {
                document.case_id = upload.case_id;
            }
            if upload.client_id.is_some() {
                document.client_id = upload.client_id;
            }
            let mut content_changed = false;
            if let Some(text) = &text {
                if *text != document.content {
                    document.content = text.clone();
                    document.edit_version += 1;
                    content_changed = true;
                }
            }
            document.file_url = Some(file_url.clone());
            document.file_checksum = Some(checksum.clone());
            document.status = DocumentStatus::Draft;
            document.updated_at = Utc::now().naive_utc();
            tx.update_document(&document)?;
            if content_changed {
                enqueue_auto_analysis(tx, settings, ctx, &document)?;
            }
            Ok((document, previous))
        })?;

        info!(%document_id, %checksum, "document file replaced");
        if previous != DocumentStatus::Draft {
            self.notify(Notice::StatusChanged {
                document_id,
                from: previous,
                to: DocumentStatus::Draft,
                changed_by: ctx.user_id,
            })
            .await;
        }
        Ok(document)
    }

    /// Short-lived URL for the document's file, if it has one.
    pub async fn presigned_file_url(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Option<String>> {
        let document = self
            .store
            .transaction(|tx| visible_document(tx, ctx, document_id, false))?;
        let Some(file_url) = document.file_url else {
            return Ok(None);
        };
        match self.blobs.presign(&file_url, self.settings.presign_ttl).await {
            Ok(signed) => Ok(Some(signed)),
            Err(err) => {
                warn!(%document_id, error = %err, "failed to presign document file");
                Err(AppError::internal(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_text_mime_types() {
        assert!(is_text_mime("text/plain; charset=utf-8"));
        assert!(is_text_mime("application/json"));
        assert!(!is_text_mime("application/pdf"));
    }

    #[test]
    fn decodes_only_text_uploads() {
        let text = decode_text("\u{feff}Hello".as_bytes(), Some("text/plain")).unwrap();
        assert_eq!(text.as_deref(), Some("Hello"));
        assert_eq!(decode_text(b"%PDF", Some("application/pdf")).unwrap(), None);
        assert_eq!(decode_text(b"data", None).unwrap(), None);

        let err = decode_text(&[0xff, 0xfe, 0x00], Some("text/plain")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }
}
