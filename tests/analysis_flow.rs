mod common;

use anyhow::Result;
use common::{tenant, TestApp};
use lexdesk::analysis::{ComplianceStatus, Findings};
use lexdesk::config::EngineSettings;
use lexdesk::models::{AnalysisType, DocumentType, TaskStatus};
use lexdesk::notify::Notice;
use lexdesk::workspace::DocumentPatch;
use lexdesk::ErrorKind;

fn manual() -> EngineSettings {
    EngineSettings {
        auto_analyze: false,
        ..EngineSettings::default()
    }
}

#[tokio::test]
async fn key_points_are_categorized() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let ctx = tenant();
    let doc = app
        .create_document(
            &ctx,
            "Payment terms",
            "Payment shall be made within 30 days. The parties agree to confidentiality.",
            DocumentType::Contract,
        )
        .await?;

    let task = app
        .workspace
        .request_analysis(&ctx, doc.id, AnalysisType::KeyPoints)
        .await?;
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.attempts, 0);
    assert_eq!(app.worker.drain().await?, 1);

    let task = app.workspace.get_task(&ctx, task.id).await?;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.attempts, 1);
    assert!(task.output_payload.is_some());

    let result = app
        .workspace
        .analysis_result(&ctx, doc.id, AnalysisType::KeyPoints)
        .await?
        .expect("stored key points");
    let Findings::KeyPoints(findings) = result.findings else {
        panic!("expected key points, got {:?}", result.findings);
    };
    assert!(findings.key_points.len() >= 2);
    for category in ["Financial Terms", "Legal Obligations"] {
        let point = findings
            .key_points
            .iter()
            .find(|point| point.category == category)
            .unwrap_or_else(|| panic!("missing {category}"));
        assert!(point.importance > 0);
    }
    assert_eq!(result.analyzer, app.workspace.settings().analyzer_id);
    Ok(())
}

#[tokio::test]
async fn nda_without_confidentiality_fails_compliance() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let ctx = tenant();
    let doc = app
        .create_document(
            &ctx,
            "Mutual NDA",
            "The parties shall not disclose any trade secrets. This agreement is governed by the laws of Delaware.",
            DocumentType::Nda,
        )
        .await?;

    app.workspace
        .request_analysis(&ctx, doc.id, AnalysisType::ComplianceCheck)
        .await?;
    app.worker.drain().await?;

    let result = app
        .workspace
        .analysis_result(&ctx, doc.id, AnalysisType::ComplianceCheck)
        .await?
        .expect("stored compliance report");
    let Findings::ComplianceCheck(report) = result.findings else {
        panic!("expected compliance report, got {:?}", result.findings);
    };
    let item = report
        .item("Confidential Information Definition")
        .expect("confidentiality rule");
    assert_eq!(item.status, ComplianceStatus::Failed);
    assert!(report.score < 100);
    Ok(())
}

#[tokio::test]
async fn automatic_analysis_runs_after_creation() -> Result<()> {
    let app = TestApp::new();
    let ctx = tenant();
    let doc = app
        .create_document(
            &ctx,
            "Lease",
            "The tenant shall pay rent of $1,200 on January 1, 2025.",
            DocumentType::Lease,
        )
        .await?;

    assert_eq!(app.worker.drain().await?, 1);
    let results = app.workspace.analysis_results(&ctx, doc.id).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].analysis_type, AnalysisType::FullAnalysis);
    let Findings::FullAnalysis(full) = &results[0].findings else {
        panic!("expected full analysis");
    };
    assert_eq!(full.entities.amounts, vec!["$1,200".to_string()]);
    assert_eq!(full.summary.statistics.sentence_count, 1);
    Ok(())
}

#[tokio::test]
async fn newer_results_replace_older_ones() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let ctx = tenant();
    let doc = app
        .create_document(
            &ctx,
            "Memo",
            "The first version of this memo is short.",
            DocumentType::Memo,
        )
        .await?;
    app.workspace
        .request_analysis(&ctx, doc.id, AnalysisType::Summary)
        .await?;
    app.workspace
        .request_analysis(&ctx, doc.id, AnalysisType::LegalReview)
        .await?;
    assert_eq!(app.worker.drain().await?, 2);

    app.workspace
        .update_document(
            &ctx,
            doc.id,
            DocumentPatch {
                content: Some("The second version of this memo replaces the first one.".into()),
                ..DocumentPatch::default()
            },
        )
        .await?;
    app.workspace
        .request_analysis(&ctx, doc.id, AnalysisType::Summary)
        .await?;
    app.worker.drain().await?;

    let results = app.workspace.analysis_results(&ctx, doc.id).await?;
    assert_eq!(results.len(), 2, "one entry per analysis type");
    let summary = app
        .workspace
        .analysis_result(&ctx, doc.id, AnalysisType::Summary)
        .await?
        .expect("summary");
    let Findings::Summary(findings) = summary.findings else {
        panic!("expected summary");
    };
    assert!(findings.summary.starts_with("The second version"));
    assert_eq!(app.workspace.list_tasks(&ctx, doc.id).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn tasks_for_deleted_documents_fail() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let ctx = tenant();
    let doc = app
        .create_document(&ctx, "Draft", "Some text.", DocumentType::Other)
        .await?;
    let task = app
        .workspace
        .request_analysis(&ctx, doc.id, AnalysisType::Summary)
        .await?;
    app.workspace.delete_document(&ctx, doc.id).await?;

    assert_eq!(app.worker.drain().await?, 1);
    let task = app.workspace.get_task(&ctx, task.id).await?;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(
        task.error_message,
        Some(format!("document {} not found", doc.id))
    );
    assert!(task.output_payload.is_none());
    Ok(())
}

#[tokio::test]
async fn finished_tasks_are_announced() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let ctx = tenant();
    let doc = app
        .create_document(&ctx, "Agreement", "The parties agree.", DocumentType::Agreement)
        .await?;
    let task = app
        .workspace
        .request_analysis(&ctx, doc.id, AnalysisType::LegalReview)
        .await?;
    app.worker.drain().await?;

    assert_eq!(
        app.notices().await,
        vec![Notice::AnalysisFinished {
            task_id: task.id,
            document_id: doc.id,
            analysis_type: AnalysisType::LegalReview,
            status: TaskStatus::Completed,
        }]
    );
    assert!(!app.worker.tick().await?, "queue is empty");
    Ok(())
}

#[tokio::test]
async fn analysis_is_tenant_scoped() -> Result<()> {
    let app = TestApp::with_settings(manual());
    let owner = tenant();
    let stranger = tenant();
    let doc = app
        .create_document(&owner, "Contract", "Terms.", DocumentType::Contract)
        .await?;
    let task = app
        .workspace
        .request_analysis(&owner, doc.id, AnalysisType::Summary)
        .await?;

    let err = app
        .workspace
        .request_analysis(&stranger, doc.id, AnalysisType::Summary)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = app.workspace.get_task(&stranger, task.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = app
        .workspace
        .analysis_results(&stranger, doc.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}
