use std::collections::{HashMap, HashSet};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{require_text, visible_document, Workspace};
use crate::context::TenantContext;
use crate::error::{AppError, AppResult};
use crate::models::Comment;
use crate::notify::Notice;
use crate::store::{StoreTx, WorkspaceStore};

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"@([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\b",
    )
    .expect("valid mention pattern")
});

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewComment {
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub mentions: Vec<Uuid>,
    pub position: Option<i32>,
    pub quoted_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, including the root.
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(CommentThread::size).sum::<usize>()
    }
}

/// Explicit mentions first, then `@<uuid>` tokens from the body, each once.
pub fn collect_mentions(content: &str, explicit: &[Uuid]) -> Vec<Uuid> {
    let mut mentions: Vec<Uuid> = Vec::new();
    let extracted = MENTION
        .captures_iter(content)
        .filter_map(|caps| Uuid::parse_str(&caps[1]).ok());
    for id in explicit.iter().copied().chain(extracted) {
        if !mentions.contains(&id) {
            mentions.push(id);
        }
    }
    mentions
}

/// Rebuilds the thread forest from a flat list in creation order. Comments
/// whose parent is not in the list become roots.
pub fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let ids: HashSet<Uuid> = comments.iter().map(|comment| comment.id).collect();
    let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for comment in comments {
        match comment.parent_id {
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }
    roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children))
        .collect()
}

fn attach_replies(comment: Comment, children: &mut HashMap<Uuid, Vec<Comment>>) -> CommentThread {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach_replies(reply, children))
        .collect();
    CommentThread { comment, replies }
}

fn visible_comment(
    tx: &mut dyn StoreTx,
    ctx: &TenantContext,
    comment_id: Uuid,
) -> AppResult<Comment> {
    let comment = tx.find_comment(comment_id)?.ok_or_else(AppError::not_found)?;
    visible_document(tx, ctx, comment.document_id, false)?;
    Ok(comment)
}

fn gather_descendant_comment_ids(tx: &mut dyn StoreTx, comment_id: Uuid) -> AppResult<Vec<Uuid>> {
    let mut ids = vec![comment_id];
    let mut queue = vec![comment_id];

    while let Some(current) = queue.pop() {
        let child_ids = tx.child_comment_ids(current)?;
        queue.extend(child_ids.iter().copied());
        ids.extend(child_ids);
    }

    Ok(ids)
}

impl<S: WorkspaceStore> Workspace<S> {
    pub async fn create_comment(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
        input: NewComment,
    ) -> AppResult<Comment> {
        let content = require_text(&input.content, "comment")?;
        if input.position.is_some_and(|position| position < 0) {
            return Err(AppError::validation("position must not be negative"));
        }
        let now = Utc::now().naive_utc();
        let comment = Comment {
            id: Uuid::new_v4(),
            document_id,
            parent_id: input.parent_id,
            mentions: collect_mentions(&content, &input.mentions),
            content,
            position: input.position,
            quoted_text: input.quoted_text.filter(|text| !text.trim().is_empty()),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_by: ctx.user_id,
            created_at: now,
            updated_at: now,
        };

        self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            if let Some(parent_id) = comment.parent_id {
                match tx.find_comment(parent_id)? {
                    Some(parent) if parent.document_id == document_id => {}
                    _ => {
                        return Err(AppError::validation(
                            "parent comment does not belong to this document",
                        ))
                    }
                }
            }
            tx.insert_comment(&comment)
        })?;

        info!(
            %document_id,
            comment_id = %comment.id,
            reply = comment.parent_id.is_some(),
            mentions = comment.mentions.len(),
            "comment created"
        );
        if !comment.mentions.is_empty() {
            self.notify(Notice::Mentioned {
                document_id,
                comment_id: comment.id,
                author_id: ctx.user_id,
                user_ids: comment.mentions.clone(),
            })
            .await;
        }
        Ok(comment)
    }

    pub async fn get_comment(&self, ctx: &TenantContext, comment_id: Uuid) -> AppResult<Comment> {
        self.store
            .transaction(|tx| visible_comment(tx, ctx, comment_id))
    }

    /// Flat list in creation order; see [`build_threads`] for nesting.
    pub async fn list_comments(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Vec<Comment>> {
        let comments = self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            tx.list_comments(document_id)
        })?;
        debug!(%document_id, count = comments.len(), "listed comments");
        Ok(comments)
    }

    pub async fn comment_threads(
        &self,
        ctx: &TenantContext,
        document_id: Uuid,
    ) -> AppResult<Vec<CommentThread>> {
        Ok(build_threads(self.list_comments(ctx, document_id).await?))
    }

    pub async fn resolve_comment(
        &self,
        ctx: &TenantContext,
        comment_id: Uuid,
    ) -> AppResult<Comment> {
        let comment = self.store.transaction(|tx| {
            let mut comment = visible_comment(tx, ctx, comment_id)?;
            if !comment.resolved {
                let now = Utc::now().naive_utc();
                comment.resolved = true;
                comment.resolved_by = Some(ctx.user_id);
                comment.resolved_at = Some(now);
                comment.updated_at = now;
                tx.update_comment(&comment)?;
            }
            Ok(comment)
        })?;

        info!(%comment_id, resolved_by = %ctx.user_id, "comment resolved");
        Ok(comment)
    }

    pub async fn unresolve_comment(
        &self,
        ctx: &TenantContext,
        comment_id: Uuid,
    ) -> AppResult<Comment> {
        let comment = self.store.transaction(|tx| {
            let mut comment = visible_comment(tx, ctx, comment_id)?;
            if comment.resolved {
                comment.resolved = false;
                comment.resolved_by = None;
                comment.resolved_at = None;
                comment.updated_at = Utc::now().naive_utc();
                tx.update_comment(&comment)?;
            }
            Ok(comment)
        })?;

        info!(%comment_id, "comment reopened");
        Ok(comment)
    }

    /// Replaces the body only; resolution state and mentions are untouched.
    pub async fn update_comment(
        &self,
        ctx: &TenantContext,
        comment_id: Uuid,
        content: &str,
    ) -> AppResult<Comment> {
        let content = require_text(content, "comment")?;
        let comment = self.store.transaction(|tx| {
            let mut comment = visible_comment(tx, ctx, comment_id)?;
            comment.content = content;
            comment.updated_at = Utc::now().naive_utc();
            tx.update_comment(&comment)?;
            Ok(comment)
        })?;

        info!(%comment_id, "comment updated");
        Ok(comment)
    }

    /// Deletes the comment and its whole reply subtree. Returns the number of
    /// removed comments.
    pub async fn delete_comment(&self, ctx: &TenantContext, comment_id: Uuid) -> AppResult<usize> {
        let removed = self.store.transaction(|tx| {
            visible_comment(tx, ctx, comment_id)?;
            let ids = gather_descendant_comment_ids(tx, comment_id)?;
            tx.delete_comments(&ids)
        })?;

        info!(%comment_id, removed, "comment subtree deleted");
        Ok(removed)
    }

    pub async fn count_unresolved(&self, ctx: &TenantContext, document_id: Uuid) -> AppResult<i64> {
        self.store.transaction(|tx| {
            visible_document(tx, ctx, document_id, false)?;
            tx.count_unresolved_comments(document_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: Uuid, parent_id: Option<Uuid>) -> Comment {
        let now = Utc::now().naive_utc();
        Comment {
            id,
            document_id: Uuid::nil(),
            parent_id,
            content: "text".to_string(),
            position: None,
            quoted_text: None,
            mentions: Vec::new(),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_by: Uuid::nil(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mentions_merge_without_duplicates() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let body = format!("@{bob} please check with @{alice} and @{bob} again");
        assert_eq!(collect_mentions(&body, &[alice]), vec![alice, bob]);
        assert!(collect_mentions("@not-a-uuid hello", &[]).is_empty());
    }

    #[test]
    fn threads_nest_replies_in_creation_order() {
        let root = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let nested = Uuid::new_v4();
        let other_root = Uuid::new_v4();
        let threads = build_threads(vec![
            comment(root, None),
            comment(first, Some(root)),
            comment(other_root, None),
            comment(second, Some(root)),
            comment(nested, Some(first)),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, root);
        assert_eq!(threads[0].size(), 4);
        let reply_ids: Vec<Uuid> = threads[0].replies.iter().map(|t| t.comment.id).collect();
        assert_eq!(reply_ids, vec![first, second]);
        assert_eq!(threads[0].replies[0].replies[0].comment.id, nested);
        assert_eq!(threads[1].size(), 1);
    }

    #[test]
    fn orphaned_replies_surface_as_roots() {
        let reply = Uuid::new_v4();
        let threads = build_threads(vec![comment(reply, Some(Uuid::new_v4()))]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, reply);
    }
}
