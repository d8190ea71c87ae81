mod common;

use anyhow::Result;
use common::{acquire_db_lock, tenant, TestApp};
use lexdesk::models::{AnalysisType, DocumentStatus, DocumentType, TaskStatus};
use lexdesk::store::PgStore;
use lexdesk::workspace::{DocumentPatch, NewComment, NewDocument, NewTag, VersionOrder};
use lexdesk::ErrorKind;

async fn postgres_app() -> Result<Option<TestApp<PgStore>>> {
    let app = TestApp::postgres().await?;
    if app.is_none() {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres test");
    }
    Ok(app)
}

#[tokio::test]
async fn document_lifecycle_on_postgres() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = postgres_app().await? else {
        return Ok(());
    };
    let ctx = tenant();

    let doc = app
        .create_document(
            &ctx,
            "Services Agreement",
            "The client shall pay $5,000 by March 1, 2025.",
            DocumentType::Agreement,
        )
        .await?;
    let tag = app
        .workspace
        .create_tag(
            &ctx,
            NewTag {
                name: "billing".into(),
                ..NewTag::default()
            },
        )
        .await?;
    app.workspace.attach_tags(&ctx, doc.id, &[tag.id]).await?;

    let v1 = app
        .workspace
        .snapshot(&ctx, doc.id, Some("initial".into()))
        .await?;
    app.workspace
        .update_document(
            &ctx,
            doc.id,
            DocumentPatch {
                content: Some("The client shall pay $6,000 by March 1, 2025.".into()),
                ..DocumentPatch::default()
            },
        )
        .await?;
    let outcome = app.workspace.restore_version(&ctx, v1.id).await?;
    assert_eq!(outcome.backup.version_number, 2);
    assert_eq!(outcome.document.content, v1.content);
    let versions = app
        .workspace
        .list_versions(&ctx, doc.id, VersionOrder::Descending)
        .await?;
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_number, 2);

    let status = app
        .workspace
        .update_status(&ctx, doc.id, DocumentStatus::Review)
        .await?;
    assert_eq!(status.status, DocumentStatus::Review);

    let root = app
        .workspace
        .create_comment(
            &ctx,
            doc.id,
            NewComment {
                content: format!("@{} check the amount", ctx.user_id),
                ..NewComment::default()
            },
        )
        .await?;
    assert_eq!(root.mentions, vec![ctx.user_id]);
    app.workspace
        .create_comment(
            &ctx,
            doc.id,
            NewComment {
                content: "Done".into(),
                parent_id: Some(root.id),
                ..NewComment::default()
            },
        )
        .await?;
    app.workspace.resolve_comment(&ctx, root.id).await?;
    assert_eq!(app.workspace.count_unresolved(&ctx, doc.id).await?, 1);

    assert_eq!(app.worker.drain().await?, 3);
    let tasks = app.workspace.list_tasks(&ctx, doc.id).await?;
    assert!(tasks.iter().all(|task| task.status == TaskStatus::Completed));
    let full = app
        .workspace
        .analysis_result(&ctx, doc.id, AnalysisType::FullAnalysis)
        .await?;
    assert!(full.is_some());

    let deletion = app.workspace.delete_document(&ctx, doc.id).await?;
    assert_eq!(deletion.comments, 2);
    assert_eq!(deletion.versions, 2);
    assert_eq!(deletion.tag_links, 1);
    Ok(())
}

#[tokio::test]
async fn tenant_isolation_on_postgres() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = postgres_app().await? else {
        return Ok(());
    };
    let owner = tenant();
    let stranger = tenant();
    let doc = app
        .create_document(&owner, "Private", "", DocumentType::Memo)
        .await?;

    let err = app.workspace.get_document(&stranger, doc.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let tag = app
        .workspace
        .create_tag(
            &owner,
            NewTag {
                name: "shared-name".into(),
                ..NewTag::default()
            },
        )
        .await?;
    app.workspace
        .create_tag(
            &stranger,
            NewTag {
                name: "shared-name".into(),
                ..NewTag::default()
            },
        )
        .await?;
    let err = app
        .workspace
        .create_tag(
            &owner,
            NewTag {
                name: "shared-name".into(),
                ..NewTag::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = app
        .workspace
        .attach_tags(&stranger, doc.id, &[tag.id])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn length_limits_are_validation_errors_on_postgres() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = postgres_app().await? else {
        return Ok(());
    };
    let ctx = tenant();

    let err = app
        .workspace
        .create_document(
            &ctx,
            NewDocument {
                title: "T".repeat(300),
                ..NewDocument::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let doc = app
        .create_document(&ctx, &"T".repeat(255), "", DocumentType::Memo)
        .await?;
    let err = app
        .workspace
        .update_document(
            &ctx,
            doc.id,
            DocumentPatch {
                title: Some("T".repeat(256)),
                ..DocumentPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = app
        .workspace
        .create_tag(
            &ctx,
            NewTag {
                name: "n".repeat(101),
                ..NewTag::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = app
        .workspace
        .create_tag(
            &ctx,
            NewTag {
                name: "flagged".into(),
                color: Some("#FF000080".into()),
                ..NewTag::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let tag = app
        .workspace
        .create_tag(
            &ctx,
            NewTag {
                name: "n".repeat(100),
                color: Some("#FF0000".into()),
                ..NewTag::default()
            },
        )
        .await?;
    assert_eq!(tag.name.len(), 100);
    Ok(())
}
