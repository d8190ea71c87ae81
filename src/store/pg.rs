use chrono::NaiveDateTime;
use diesel::dsl::{count_star, max};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use super::{DocumentFilter, StoreTx, WorkspaceStore};
use crate::db::PgPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisTask, Comment, Document, DocumentTag, DocumentVersion, Tag, TaskStatus,
};
use crate::schema::{analysis_tasks, comments, document_tags, document_versions, documents, tags};

/// Postgres backend on an r2d2 pool of diesel connections.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl WorkspaceStore for PgStore {
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut pooled = self
            .pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<T, AppError, _>(|conn| f(&mut PgTx { conn }))
    }
}

struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

impl StoreTx for PgTx<'_> {
    fn insert_document(&mut self, document: &Document) -> AppResult<()> {
        diesel::insert_into(documents::table)
            .values(document)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_document(&mut self, id: Uuid) -> AppResult<Option<Document>> {
        Ok(documents::table
            .find(id)
            .first::<Document>(self.conn)
            .optional()?)
    }

    fn lock_document(&mut self, id: Uuid) -> AppResult<Option<Document>> {
        Ok(documents::table
            .find(id)
            .for_update()
            .first::<Document>(self.conn)
            .optional()?)
    }

    fn update_document(&mut self, document: &Document) -> AppResult<()> {
        diesel::update(documents::table.find(document.id))
            .set(document)
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_document(&mut self, id: Uuid) -> AppResult<usize> {
        Ok(diesel::delete(documents::table.find(id)).execute(self.conn)?)
    }

    fn list_documents(
        &mut self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
    ) -> AppResult<Vec<Document>> {
        let mut query = documents::table
            .filter(documents::tenant_id.eq(tenant_id))
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(documents::status.eq(status));
        }
        if let Some(document_type) = filter.document_type {
            query = query.filter(documents::document_type.eq(document_type));
        }
        if let Some(case_id) = filter.case_id {
            query = query.filter(documents::case_id.eq(Some(case_id)));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(documents::client_id.eq(Some(client_id)));
        }
        if let Some(tag_id) = filter.tag_id {
            let tagged: Vec<Uuid> = document_tags::table
                .filter(document_tags::tag_id.eq(tag_id))
                .select(document_tags::document_id)
                .load(self.conn)?;
            if tagged.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(documents::id.eq_any(tagged));
        }

        Ok(query
            .order(documents::created_at.desc())
            .load::<Document>(self.conn)?)
    }

    fn max_version_number(&mut self, document_id: Uuid) -> AppResult<Option<i32>> {
        Ok(document_versions::table
            .filter(document_versions::document_id.eq(document_id))
            .select(max(document_versions::version_number))
            .first::<Option<i32>>(self.conn)?)
    }

    fn insert_version(&mut self, version: &DocumentVersion) -> AppResult<()> {
        diesel::insert_into(document_versions::table)
            .values(version)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_version(&mut self, id: Uuid) -> AppResult<Option<DocumentVersion>> {
        Ok(document_versions::table
            .find(id)
            .first::<DocumentVersion>(self.conn)
            .optional()?)
    }

    fn list_versions(&mut self, document_id: Uuid) -> AppResult<Vec<DocumentVersion>> {
        Ok(document_versions::table
            .filter(document_versions::document_id.eq(document_id))
            .order(document_versions::version_number.asc())
            .load(self.conn)?)
    }

    fn delete_versions(&mut self, document_id: Uuid) -> AppResult<usize> {
        Ok(diesel::delete(
            document_versions::table.filter(document_versions::document_id.eq(document_id)),
        )
        .execute(self.conn)?)
    }

    fn insert_comment(&mut self, comment: &Comment) -> AppResult<()> {
        diesel::insert_into(comments::table)
            .values(comment)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(comments::table
            .find(id)
            .first::<Comment>(self.conn)
            .optional()?)
    }

    fn update_comment(&mut self, comment: &Comment) -> AppResult<()> {
        diesel::update(comments::table.find(comment.id))
            .set(comment)
            .execute(self.conn)?;
        Ok(())
    }

    fn list_comments(&mut self, document_id: Uuid) -> AppResult<Vec<Comment>> {
        Ok(comments::table
            .filter(comments::document_id.eq(document_id))
            .order(comments::created_at.asc())
            .load(self.conn)?)
    }

    fn child_comment_ids(&mut self, parent_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(comments::table
            .filter(comments::parent_id.eq(Some(parent_id)))
            .select(comments::id)
            .load(self.conn)?)
    }

    fn delete_comments(&mut self, ids: &[Uuid]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        Ok(diesel::delete(comments::table.filter(comments::id.eq_any(ids))).execute(self.conn)?)
    }

    fn delete_document_comments(&mut self, document_id: Uuid) -> AppResult<usize> {
        Ok(
            diesel::delete(comments::table.filter(comments::document_id.eq(document_id)))
                .execute(self.conn)?,
        )
    }

    fn count_unresolved_comments(&mut self, document_id: Uuid) -> AppResult<i64> {
        Ok(comments::table
            .filter(comments::document_id.eq(document_id))
            .filter(comments::resolved.eq(false))
            .select(count_star())
            .first(self.conn)?)
    }

    fn insert_tag(&mut self, tag: &Tag) -> AppResult<()> {
        diesel::insert_into(tags::table)
            .values(tag)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_tag(&mut self, id: Uuid) -> AppResult<Option<Tag>> {
        Ok(tags::table.find(id).first::<Tag>(self.conn).optional()?)
    }

    fn find_tag_by_name(&mut self, tenant_id: Uuid, name: &str) -> AppResult<Option<Tag>> {
        Ok(tags::table
            .filter(tags::tenant_id.eq(tenant_id))
            .filter(tags::name.eq(name))
            .first::<Tag>(self.conn)
            .optional()?)
    }

    fn update_tag(&mut self, tag: &Tag) -> AppResult<()> {
        diesel::update(tags::table.find(tag.id))
            .set(tag)
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_tag(&mut self, id: Uuid) -> AppResult<usize> {
        Ok(diesel::delete(tags::table.find(id)).execute(self.conn)?)
    }

    fn list_tags(&mut self, tenant_id: Uuid) -> AppResult<Vec<Tag>> {
        Ok(tags::table
            .filter(tags::tenant_id.eq(tenant_id))
            .order(tags::name.asc())
            .load(self.conn)?)
    }

    fn tag_usage(&mut self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, i64)>> {
        Ok(document_tags::table
            .inner_join(tags::table)
            .filter(tags::tenant_id.eq(tenant_id))
            .group_by(document_tags::tag_id)
            .select((document_tags::tag_id, count_star()))
            .load(self.conn)?)
    }

    fn list_document_tags(&mut self, document_id: Uuid) -> AppResult<Vec<Tag>> {
        Ok(document_tags::table
            .inner_join(tags::table)
            .filter(document_tags::document_id.eq(document_id))
            .select(tags::all_columns)
            .order(tags::name.asc())
            .load::<Tag>(self.conn)?)
    }

    fn link_tag(&mut self, link: &DocumentTag) -> AppResult<bool> {
        let inserted = diesel::insert_into(document_tags::table)
            .values(link)
            .on_conflict_do_nothing()
            .execute(self.conn)?;
        Ok(inserted > 0)
    }

    fn unlink_tag(&mut self, document_id: Uuid, tag_id: Uuid) -> AppResult<bool> {
        let removed = diesel::delete(
            document_tags::table
                .filter(document_tags::document_id.eq(document_id))
                .filter(document_tags::tag_id.eq(tag_id)),
        )
        .execute(self.conn)?;
        Ok(removed > 0)
    }

    fn unlink_document_tags(&mut self, document_id: Uuid) -> AppResult<usize> {
        Ok(diesel::delete(
            document_tags::table.filter(document_tags::document_id.eq(document_id)),
        )
        .execute(self.conn)?)
    }

    fn unlink_tag_everywhere(&mut self, tag_id: Uuid) -> AppResult<usize> {
        Ok(
            diesel::delete(document_tags::table.filter(document_tags::tag_id.eq(tag_id)))
                .execute(self.conn)?,
        )
    }

    fn insert_task(&mut self, task: &AnalysisTask) -> AppResult<()> {
        diesel::insert_into(analysis_tasks::table)
            .values(task)
            .execute(self.conn)?;
        Ok(())
    }

    fn find_task(&mut self, id: Uuid) -> AppResult<Option<AnalysisTask>> {
        Ok(analysis_tasks::table
            .find(id)
            .first::<AnalysisTask>(self.conn)
            .optional()?)
    }

    fn update_task(&mut self, task: &AnalysisTask) -> AppResult<()> {
        diesel::update(analysis_tasks::table.find(task.id))
            .set(task)
            .execute(self.conn)?;
        Ok(())
    }

    fn next_pending_task(&mut self) -> AppResult<Option<AnalysisTask>> {
        Ok(analysis_tasks::table
            .filter(analysis_tasks::status.eq(TaskStatus::Pending))
            .order(analysis_tasks::created_at.asc())
            .for_update()
            .skip_locked()
            .first::<AnalysisTask>(self.conn)
            .optional()?)
    }

    fn list_tasks(&mut self, document_id: Uuid) -> AppResult<Vec<AnalysisTask>> {
        Ok(analysis_tasks::table
            .filter(analysis_tasks::document_id.eq(document_id))
            .order(analysis_tasks::created_at.asc())
            .load(self.conn)?)
    }

    fn stale_processing_tasks(
        &mut self,
        cutoff: NaiveDateTime,
    ) -> AppResult<Vec<AnalysisTask>> {
        Ok(analysis_tasks::table
            .filter(analysis_tasks::status.eq(TaskStatus::Processing))
            .filter(analysis_tasks::updated_at.lt(cutoff))
            .for_update()
            .skip_locked()
            .load(self.conn)?)
    }
}
