use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    check_len, require_text_max, visible_document, Workspace, MAX_TAG_COLOR_LEN, MAX_TAG_NAME_LEN,
};
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentTag, Tag};
use crate::store::{StoreTx, WorkspaceStore};
use crate::utils::json::{trim_nullable, Nullable};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTag {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Nullable<String>,
    pub description: Nullable<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagUsage {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}

fn visible_tag(tx: &mut dyn StoreTx, ctx: &TenantContext, tag_id: Uuid) -> AppResult<Tag> {
    match tx.find_tag(tag_id)? {
        Some(tag) if ctx.owns(tag.tenant_id) => Ok(tag),
        _ => Err(AppError::not_found()),
    }
}

fn ensure_unique_name(
    tx: &mut dyn StoreTx,
    ctx: &TenantContext,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    match tx.find_tag_by_name(ctx.tenant_id, name)? {
        Some(existing) if Some(existing.id) != except => {
            Err(AppError::conflict(format!("tag '{name}' already exists")))
        }
        _ => Ok(()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn check_color(color: Option<&str>) -> AppResult<()> {
    match color {
        Some(color) => check_len(color, "tag color", MAX_TAG_COLOR_LEN),
        None => Ok(()),
    }
}

/// Replaces the tag set of a document. Unknown or foreign tags fail the
/// whole call with `NotFound`; duplicates in `tag_ids` are ignored.
pub(crate) fn replace_document_tags(
    tx: &mut dyn StoreTx,
    ctx: &TenantContext,
    document_id: Uuid,
    tag_ids: &[Uuid],
) -> AppResult<Vec<Tag>> {
    let tags = resolve_tags(tx, ctx, tag_ids)?;
    tx.unlink_document_tags(document_id)?;
    link_all(tx, document_id, &tags)?;
    tx.list_document_tags(document_id)
}

fn resolve_tags(tx: &mut dyn StoreTx, ctx: &TenantContext, tag_ids: &[Uuid]) -> AppResult<Vec<Tag>> {
    let mut tags: Vec<Tag> = Vec::with_capacity(tag_ids.len());
    for &tag_id in tag_ids {
        if tags.iter().any(|tag| tag.id == tag_id) {
            continue;
        }
        tags.push(visible_tag(tx, ctx, tag_id)?);
    }
    Ok(tags)
}

fn link_all(tx: &mut dyn StoreTx, document_id: Uuid, tags: &[Tag]) -> AppResult<usize> {
    let now = Utc::now().naive_utc();
    let mut linked = 0;
    for tag in tags {
        let link = DocumentTag {
            document_id,
            tag_id: tag.id,
            assigned_at: now,
        };
        if tx.link_tag(&link)? {
            linked += 1;
        }
    }
    Ok(linked)
}

impl<S: WorkspaceStore> Workspace<S> {
    pub async fn create_tag(&self, ctx: &TenantContext, input: NewTag) -> AppResult<Tag> {
        let name = require_text_max(&input.name, "tag name", MAX_TAG_NAME_LEN)?;
        let color = non_blank(input.color);
        check_color(color.as_deref())?;
        let now = Utc::now().naive_utc();
        let tag = Tag {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            name,
            color,
            description: non_blank(input.description),
            created_at: now,
            updated_at: now,
        };
        self.store.transaction(|tx| {
            ensure_unique_name(tx, ctx, &tag.name, None)?;
            tx.insert_tag(&tag)
        })?;

        info!(tag_id = %tag.id, tenant_id = %ctx.tenant_id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub async fn update_tag(
        &self,
        ctx: &TenantContext,
        tag_id: Uuid,
        patch: TagPatch,
    ) -> AppResult<Tag> {
        let tag = self.store.transaction(|tx| {
            let mut tag = visible_tag(tx, ctx, tag_id)?;
            if let Some(name) = &patch.name {
                let name = require_text_max(name, "tag name", MAX_TAG_NAME_LEN)?;
                if name != tag.name {
                    ensure_unique_name(tx, ctx, &name, Some(tag.id))?;
                    tag.name = name;
                }
            }
            tag.color = trim_nullable(patch.color).apply(tag.color);
            check_color(tag.color.as_deref())?;
            tag.description = trim_nullable(patch.description).apply(tag.description);
            tag.updated_at = Utc::now().naive_utc();
            tx.update_tag(&tag)?;
            Ok(tag)
        })?;

        info!(%tag_id, name = %tag.name, "tag updated");
        Ok(tag)
    }

    /// Deletes the tag after unlinking it from every document. Returns the
    /// number of removed links.
    pub async fn delete_tag(&self, ctx: &TenantContext, tag_id: Uuid) -> AppResult<usize> {
        let unlinked = self.store.transaction(|tx| {
            visible_tag(tx, ctx, tag_id)?;
            let unlinked = tx.unlink_tag_everywhere(tag_id)?;
            tx.delete_tag(tag_id)?;
            Ok(unlinked)
        })?;

        info!(%tag_id, unlinked, "tag deleted");
        Ok(unlinked)
    }

    pub async fn get_tag(&self, ctx: &TenantContext, tag_id: Uuid) -> AppResult<Tag> {
        self.store.transaction(|tx| visible_tag(tx, ctx, tag_id))
    }

    /// All tags of the tenant by name, with the number of documents using each.
    pub async fn list_tags(&self, ctx: &TenantContext) -> AppResult<Vec<TagUsage>> {
        let (tags, usage) = self.store.transaction(|tx| {
            let tags = tx.list_tags(ctx.tenant_id)?;
            let usage = tx.tag_usage(ctx.tenant_id)?;
            Ok((tags, usage))
        })?;
        let usage_map: HashMap<Uuid, i64> = usage.into_iter().collect();

        Ok(tags
            .into_iter()
            .map(|tag| TagUsage {
                usage_count: *usage_map.get(&tag.id).unwrap_or(&0),
                tag,
            })
            .collect())
    }

    /// Adds tags to a document. Tags already attached are left as they are.
    pub async fn attach_tags(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Tag>> {
        let (linked, tags) = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, true)?;
            let tags = resolve_tags(tx, ctx, tag_ids)?;
            let linked = link_all(tx, document_id, &tags)?;
            Ok((linked, tx.list_document_tags(document_id)?))
        })?;

        info!(%document_id, linked, total = tags.len(), "tags attached");
        Ok(tags)
    }

    /// Returns whether the tag was attached.
    pub async fn detach_tag(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        tag_id: Uuid,
    ) -> AppResult<bool> {
        let removed = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, true)?;
            visible_tag(tx, ctx, tag_id)?;
            tx.unlink_tag(document_id, tag_id)
        })?;

        info!(%document_id, %tag_id, removed, "tag detached");
        Ok(removed)
    }

    pub async fn set_document_tags(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Tag>> {
        let tags = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, true)?;
            replace_document_tags(tx, ctx, document_id, tag_ids)
        })?;

        info!(%document_id, total = tags.len(), "document tags replaced");
        Ok(tags)
    }

    /// Sorted by name.
    pub async fn tags_for_document(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Vec<Tag>> {
        self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            tx.list_document_tags(document_id)
        })
    }

    /// Most used tags first; equal counts are ordered by name.
    pub async fn popular_tags(&self, ctx: &TenantContext, limit: usize) -> AppResult<Vec<TagUsage>> {
        let mut usage: Vec<TagUsage> = self
            .list_tags(ctx)
            .await?
            .into_iter()
            .filter(|entry| entry.usage_count > 0)
            .collect();
        usage.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        usage.truncate(limit);
        debug!(tenant_id = %ctx.tenant_id, returned = usage.len(), "popular tags");
        Ok(usage)
    }
}
