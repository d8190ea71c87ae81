//! Persistence seam of the engine.
//!
//! Every engine operation runs inside [`WorkspaceStore::transaction`] and
//! talks to records only through [`StoreTx`]. Cascades and restores are
//! composed from these primitives by the engine, so their blast radius does
//! not depend on foreign-key behaviour of a particular backend.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    AnalysisTask, Comment, Document, DocumentStatus, DocumentTag, DocumentType, DocumentVersion,
    Tag,
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub document_type: Option<DocumentType>,
    pub case_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
}

pub trait WorkspaceStore: Send + Sync + 'static {
    /// Runs `f` atomically. Changes are committed only when `f` returns `Ok`.
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>;
}

/// Record-level operations available inside a transaction. Lookups are not
/// tenant-scoped; the engine applies tenant visibility itself.
pub trait StoreTx {
    fn insert_document(&mut self, document: &Document) -> AppResult<()>;
    fn find_document(&mut self, id: Uuid) -> AppResult<Option<Document>>;
    /// Like `find_document`, but holds the row until the transaction ends.
    fn lock_document(&mut self, id: Uuid) -> AppResult<Option<Document>>;
    fn update_document(&mut self, document: &Document) -> AppResult<()>;
    fn delete_document(&mut self, id: Uuid) -> AppResult<usize>;
    fn list_documents(
        &mut self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> AppResult<Vec<Document>>;

    fn max_version_number(&mut self, document_id: Uuid) -> AppResult<Option<i32>>;
    fn insert_version(&mut self, version: &DocumentVersion) -> AppResult<()>;
    fn find_version(&mut self, id: Uuid) -> AppResult<Option<DocumentVersion>>;
    /// Oldest first.
    fn list_versions(&mut self, document_id: Uuid) -> AppResult<Vec<DocumentVersion>>;
    fn delete_versions(&mut self, document_id: Uuid) -> AppResult<usize>;

    fn insert_comment(&mut self, comment: &Comment) -> AppResult<()>;
    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>>;
    fn update_comment(&mut self, comment: &Comment) -> AppResult<()>;
    /// Creation order.
    fn list_comments(&mut self, document_id: Uuid) -> AppResult<Vec<Comment>>;
    fn child_comment_ids(&mut self, parent_id: Uuid) -> AppResult<Vec<Uuid>>;
    fn delete_comments(&mut self, ids: &[Uuid]) -> AppResult<usize>;
    fn delete_document_comments(&mut self, document_id: Uuid) -> AppResult<usize>;
    fn count_unresolved_comments(&mut self, document_id: Uuid) -> AppResult<i64>;

    fn insert_tag(&mut self, tag: &Tag) -> AppResult<()>;
    fn find_tag(&mut self, id: Uuid) -> AppResult<Option<Tag>>;
    fn find_tag_by_name(&mut self, tenant_id: Uuid, name: &str) -> AppResult<Option<Tag>>;
    fn update_tag(&mut self, tag: &Tag) -> AppResult<()>;
    fn delete_tag(&mut self, id: Uuid) -> AppResult<usize>;
    /// Sorted by name.
    fn list_tags(&mut self, tenant_id: Uuid) -> AppResult<Vec<Tag>>;
    /// Documents per tag, for tags of `tenant_id` that are in use.
    fn tag_usage(&mut self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, i64)>>;
    fn list_document_tags(&mut self, document_id: Uuid) -> AppResult<Vec<Tag>>;
    /// Returns false when the link already existed.
    fn link_tag(&mut self, link: &DocumentTag) -> AppResult<bool>;
    fn unlink_tag(&mut self, document_id: Uuid, tag_id: Uuid) -> AppResult<bool>;
    fn unlink_document_tags(&mut self, document_id: Uuid) -> AppResult<usize>;
    fn unlink_tag_everywhere(&mut self, tag_id: Uuid) -> AppResult<usize>;

    fn insert_task(&mut self, task: &AnalysisTask) -> AppResult<()>;
    fn find_task(&mut self, id: Uuid) -> AppResult<Option<AnalysisTask>>;
    fn update_task(&mut self, task: &AnalysisTask) -> AppResult<()>;
    /// Oldest pending task, locked against other reservers.
    fn next_pending_task(&mut self) -> AppResult<Option<AnalysisTask>>;
    fn list_tasks(&mut self, document_id: Uuid) -> AppResult<Vec<AnalysisTask>>;
    fn stale_processing_tasks(&mut self, cutoff: NaiveDateTime)
        -> AppResult<Vec<AnalysisTask>>;
}
