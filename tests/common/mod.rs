#![allow(dead_code)]

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use lexdesk::config::EngineSettings;
use lexdesk::context::TenantContext;
use lexdesk::db;
use lexdesk::models::{Document, DocumentType};
use lexdesk::notify::{Notice, Notifier};
use lexdesk::storage::BlobStorage;
use lexdesk::store::{MemoryStore, PgStore, WorkspaceStore};
use lexdesk::workspace::NewDocument;
use lexdesk::{Worker, Workspace};
use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Clone)]
pub struct StoredBlob {
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeBlobStorage {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

#[async_trait]
impl BlobStorage for FakeBlobStorage {
    async fn store(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: Option<String>,
    ) -> Result<String> {
        let url = format!("memory://blobs/{}/{filename}", Uuid::new_v4());
        let stored = StoredBlob {
            url: url.clone(),
            bytes,
            content_type,
        };
        let mut guard = self.blobs.lock().await;
        guard.insert(url.clone(), stored);
        Ok(url)
    }

    async fn presign(&self, url: &str, ttl: Duration) -> Result<String> {
        let guard = self.blobs.lock().await;
        ensure!(guard.contains_key(url), "blob {url} missing");
        Ok(format!("{url}?expires_in={}", ttl.as_secs()))
    }
}

impl FakeBlobStorage {
    pub async fn get(&self, url: &str) -> Option<StoredBlob> {
        let guard = self.blobs.lock().await;
        guard.get(url).cloned()
    }

    pub async fn blob_count(&self) -> usize {
        let guard = self.blobs.lock().await;
        guard.len()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(&self, notice: Notice) -> Result<()> {
        let mut guard = self.notices.lock().await;
        guard.push(notice);
        Ok(())
    }
}

impl RecordingNotifier {
    pub async fn notices(&self) -> Vec<Notice> {
        let guard = self.notices.lock().await;
        guard.clone()
    }
}

pub struct TestApp<S = MemoryStore> {
    pub workspace: Workspace<S>,
    pub worker: Worker<S>,
    blobs: Arc<FakeBlobStorage>,
    notifier: Arc<RecordingNotifier>,
}

impl TestApp<MemoryStore> {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::build(Arc::new(MemoryStore::new()), settings)
    }
}

impl TestApp<PgStore> {
    /// `None` when `TEST_DATABASE_URL` is not set.
    pub async fn postgres() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            return Ok(None);
        };
        let pool = db::init_pool_with_size(&database_url, db::DEFAULT_MAX_POOL_SIZE)?;
        let prepared = pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            db::run_migrations(&prepared)?;
            let mut conn = prepared
                .get()
                .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
            truncate_all(&mut conn)
        })
        .await
        .context("migration task panicked")??;

        Ok(Some(Self::build(
            Arc::new(PgStore::new(pool)),
            EngineSettings::default(),
        )))
    }
}

impl<S: WorkspaceStore> TestApp<S> {
    fn build(store: Arc<S>, settings: EngineSettings) -> Self {
        let blobs = Arc::new(FakeBlobStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let workspace = Workspace::new(store, blobs.clone(), notifier.clone(), settings);
        let worker = Worker::new(workspace.clone(), Duration::from_millis(10));
        Self {
            workspace,
            worker,
            blobs,
            notifier,
        }
    }

    pub fn blobs(&self) -> Arc<FakeBlobStorage> {
        self.blobs.clone()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.notifier.notices().await
    }

    pub async fn create_document(
        &self,
        ctx: &TenantContext,
        title: &str,
        content: &str,
        document_type: DocumentType,
    ) -> Result<Document> {
        Ok(self
            .workspace
            .create_document(
                ctx,
                NewDocument {
                    title: title.to_string(),
                    content: content.to_string(),
                    document_type,
                    ..NewDocument::default()
                },
            )
            .await?)
    }
}

/// A fresh tenant with one user.
pub fn tenant() -> TenantContext {
    TenantContext::new(Uuid::new_v4(), Uuid::new_v4())
}

/// Another user of the same tenant.
pub fn colleague(ctx: &TenantContext) -> TenantContext {
    TenantContext::new(Uuid::new_v4(), ctx.tenant_id)
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE analysis_tasks, document_tags, comments, document_versions, tags, documents CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
