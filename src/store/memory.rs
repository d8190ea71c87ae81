use std::sync::Mutex;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::{DocumentFilter, StoreTx, WorkspaceStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisTask, Comment, Document, DocumentTag, DocumentVersion, Tag, TaskStatus,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    documents: Vec<Document>,
    versions: Vec<DocumentVersion>,
    comments: Vec<Comment>,
    tags: Vec<Tag>,
    document_tags: Vec<DocumentTag>,
    tasks: Vec<AnalysisTask>,
}

/// In-process backend. A transaction works on a copy of the state under a
/// single lock and swaps it in on success, which serializes writers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStore for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::internal("memory store lock poisoned"))?;
        let mut working = guard.clone();
        let value = f(&mut MemoryTx {
            state: &mut working,
        })?;
        *guard = working;
        Ok(value)
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

fn replace_by_id<T: Clone>(rows: &mut [T], updated: &T, id_of: impl Fn(&T) -> Uuid) {
    let id = id_of(updated);
    if let Some(row) = rows.iter_mut().find(|row| id_of(row) == id) {
        *row = updated.clone();
    }
}

impl StoreTx for MemoryTx<'_> {
    fn insert_document(&mut self, document: &Document) -> AppResult<()> {
        if self.state.documents.iter().any(|doc| doc.id == document.id) {
            return Err(AppError::conflict("document id already exists"));
        }
        self.state.documents.push(document.clone());
        Ok(())
    }

    fn find_document(&mut self, id: Uuid) -> AppResult<Option<Document>> {
        Ok(self.state.documents.iter().find(|doc| doc.id == id).cloned())
    }

    fn lock_document(&mut self, id: Uuid) -> AppResult<Option<Document>> {
        self.find_document(id)
    }

    fn update_document(&mut self, document: &Document) -> AppResult<()> {
        replace_by_id(&mut self.state.documents, document, |doc| doc.id);
        Ok(())
    }

    fn delete_document(&mut self, id: Uuid) -> AppResult<usize> {
        let before = self.state.documents.len();
        self.state.documents.retain(|doc| doc.id != id);
        Ok(before - self.state.documents.len())
    }

    fn list_documents(
        &mut self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> AppResult<Vec<Document>> {
        let links = &self.state.document_tags;
        let mut docs: Vec<Document> = self
            .state
            .documents
            .iter()
            .rev()
            .filter(|doc| doc.tenant_id == tenant_id)
            .filter(|doc| filter.status.map_or(true, |status| doc.status == status))
            .filter(|doc| {
                filter
                    .document_type
                    .map_or(true, |document_type| doc.document_type == document_type)
            })
            .filter(|doc| filter.case_id.map_or(true, |id| doc.case_id == Some(id)))
            .filter(|doc| filter.client_id.map_or(true, |id| doc.client_id == Some(id)))
            .filter(|doc| {
                filter.tag_id.map_or(true, |tag_id| {
                    links
                        .iter()
                        .any(|link| link.document_id == doc.id && link.tag_id == tag_id)
                })
            })
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    fn max_version_number(&mut self, document_id: Uuid) -> AppResult<Option<i32>> {
        Ok(self
            .state
            .versions
            .iter()
            .filter(|version| version.document_id == document_id)
            .map(|version| version.version_number)
            .max())
    }

    fn insert_version(&mut self, version: &DocumentVersion) -> AppResult<()> {
        let duplicate = self.state.versions.iter().any(|existing| {
            existing.document_id == version.document_id
                && existing.version_number == version.version_number
        });
        if duplicate {
            return Err(AppError::conflict(format!(
                "version {} already exists",
                version.version_number
            )));
        }
        self.state.versions.push(version.clone());
        Ok(())
    }

    fn find_version(&mut self, id: Uuid) -> AppResult<Option<DocumentVersion>> {
        Ok(self.state.versions.iter().find(|v| v.id == id).cloned())
    }

    fn list_versions(&mut self, document_id: Uuid) -> AppResult<Vec<DocumentVersion>> {
        let mut versions: Vec<DocumentVersion> = self
            .state
            .versions
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    fn delete_versions(&mut self, document_id: Uuid) -> AppResult<usize> {
        let before = self.state.versions.len();
        self.state.versions.retain(|v| v.document_id != document_id);
        Ok(before - self.state.versions.len())
    }

    fn insert_comment(&mut self, comment: &Comment) -> AppResult<()> {
        self.state.comments.push(comment.clone());
        Ok(())
    }

    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(self.state.comments.iter().find(|c| c.id == id).cloned())
    }

    fn update_comment(&mut self, comment: &Comment) -> AppResult<()> {
        replace_by_id(&mut self.state.comments, comment, |c| c.id);
        Ok(())
    }

    fn list_comments(&mut self, document_id: Uuid) -> AppResult<Vec<Comment>> {
        Ok(self
            .state
            .comments
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    fn child_comment_ids(&mut self, parent_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .map(|c| c.id)
            .collect())
    }

    fn delete_comments(&mut self, ids: &[Uuid]) -> AppResult<usize> {
        let before = self.state.comments.len();
        self.state.comments.retain(|c| !ids.contains(&c.id));
        Ok(before - self.state.comments.len())
    }

    fn delete_document_comments(&mut self, document_id: Uuid) -> AppResult<usize> {
        let before = self.state.comments.len();
        self.state.comments.retain(|c| c.document_id != document_id);
        Ok(before - self.state.comments.len())
    }

    fn count_unresolved_comments(&mut self, document_id: Uuid) -> AppResult<i64> {
        Ok(self
            .state
            .comments
            .iter()
            .filter(|c| c.document_id == document_id && !c.resolved)
            .count() as i64)
    }

    fn insert_tag(&mut self, tag: &Tag) -> AppResult<()> {
        let duplicate = self
            .state
            .tags
            .iter()
            .any(|existing| existing.tenant_id == tag.tenant_id && existing.name == tag.name);
        if duplicate {
            return Err(AppError::conflict("tag name already exists"));
        }
        self.state.tags.push(tag.clone());
        Ok(())
    }

    fn find_tag(&mut self, id: Uuid) -> AppResult<Option<Tag>> {
        Ok(self.state.tags.iter().find(|t| t.id == id).cloned())
    }

    fn find_tag_by_name(&mut self, tenant_id: Uuid, name: &str) -> AppResult<Option<Tag>> {
        Ok(self
            .state
            .tags
            .iter()
            .find(|t| t.tenant_id == tenant_id && t.name == name)
            .cloned())
    }

    fn update_tag(&mut self, tag: &Tag) -> AppResult<()> {
        let duplicate = self.state.tags.iter().any(|existing| {
            existing.id != tag.id && existing.tenant_id == tag.tenant_id && existing.name == tag.name
        });
        if duplicate {
            return Err(AppError::conflict("tag name already exists"));
        }
        replace_by_id(&mut self.state.tags, tag, |t| t.id);
        Ok(())
    }

    fn delete_tag(&mut self, id: Uuid) -> AppResult<usize> {
        let before = self.state.tags.len();
        self.state.tags.retain(|t| t.id != id);
        Ok(before - self.state.tags.len())
    }

    fn list_tags(&mut self, tenant_id: Uuid) -> AppResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .state
            .tags
            .iter()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn tag_usage(&mut self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, i64)>> {
        let mut usage: Vec<(Uuid, i64)> = Vec::new();
        for link in &self.state.document_tags {
            let in_tenant = self
                .state
                .tags
                .iter()
                .any(|t| t.id == link.tag_id && t.tenant_id == tenant_id);
            if !in_tenant {
                continue;
            }
            match usage.iter_mut().find(|(tag_id, _)| *tag_id == link.tag_id) {
                Some((_, count)) => *count += 1,
                None => usage.push((link.tag_id, 1)),
            }
        }
        Ok(usage)
    }

    fn list_document_tags(&mut self, document_id: Uuid) -> AppResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .state
            .document_tags
            .iter()
            .filter(|link| link.document_id == document_id)
            .filter_map(|link| self.state.tags.iter().find(|t| t.id == link.tag_id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn link_tag(&mut self, link: &DocumentTag) -> AppResult<bool> {
        let exists = self
            .state
            .document_tags
            .iter()
            .any(|l| l.document_id == link.document_id && l.tag_id == link.tag_id);
        if exists {
            return Ok(false);
        }
        self.state.document_tags.push(link.clone());
        Ok(true)
    }

    fn unlink_tag(&mut self, document_id: Uuid, tag_id: Uuid) -> AppResult<bool> {
        let before = self.state.document_tags.len();
        self.state
            .document_tags
            .retain(|l| !(l.document_id == document_id && l.tag_id == tag_id));
        Ok(self.state.document_tags.len() < before)
    }

    fn unlink_document_tags(&mut self, document_id: Uuid) -> AppResult<usize> {
        let before = self.state.document_tags.len();
        self.state
            .document_tags
            .retain(|l| l.document_id != document_id);
        Ok(before - self.state.document_tags.len())
    }

    fn unlink_tag_everywhere(&mut self, tag_id: Uuid) -> AppResult<usize> {
        let before = self.state.document_tags.len();
        self.state.document_tags.retain(|l| l.tag_id != tag_id);
        Ok(before - self.state.document_tags.len())
    }

    fn insert_task(&mut self, task: &AnalysisTask) -> AppResult<()> {
        self.state.tasks.push(task.clone());
        Ok(())
    }

    fn find_task(&mut self, id: Uuid) -> AppResult<Option<AnalysisTask>> {
        Ok(self.state.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn update_task(&mut self, task: &AnalysisTask) -> AppResult<()> {
        replace_by_id(&mut self.state.tasks, task, |t| t.id);
        Ok(())
    }

    fn next_pending_task(&mut self) -> AppResult<Option<AnalysisTask>> {
        Ok(self
            .state
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::Pending)
            .cloned())
    }

    fn list_tasks(&mut self, document_id: Uuid) -> AppResult<Vec<AnalysisTask>> {
        Ok(self
            .state
            .tasks
            .iter()
            .filter(|t| t.document_id == document_id)
            .cloned()
            .collect())
    }

    fn stale_processing_tasks(
        &mut self,
        cutoff: NaiveDateTime,
    ) -> AppResult<Vec<AnalysisTask>> {
        Ok(self
            .state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Processing && t.updated_at < cutoff)
            .cloned()
            .collect())
    }
}
