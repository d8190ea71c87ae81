use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use url::Url;
use uuid::Uuid;

/// Blob storage collaborator. The engine only ever handles the returned
/// URLs; bytes are not read back.
#[async_trait]
pub trait BlobStorage: Send + Sync + 'static {
    async fn store(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: Option<String>,
    ) -> Result<String>;

    async fn presign(&self, url: &str, ttl: Duration) -> Result<String>;
}

/// Files under a local directory, addressed by `file://` URLs.
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '"' | '\0' => '_',
            _ => ch,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "upload.bin".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn store(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        _content_type: Option<String>,
    ) -> Result<String> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create blob directory {}", dir.display()))?;
        let path = dir.join(sanitize_filename(filename));
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write blob {}", path.display()))?;

        let absolute = fs::canonicalize(&path)
            .await
            .context("failed to resolve blob path")?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| anyhow!("blob path {} is not absolute", absolute.display()))?;
        Ok(url.to_string())
    }

    async fn presign(&self, url: &str, ttl: Duration) -> Result<String> {
        let mut parsed = Url::parse(url).context("stored file URL is invalid")?;
        let expires = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before epoch")?
            .as_secs()
            + ttl.as_secs();
        let signature = hex::encode(Sha256::digest(format!("{url}:{expires}").as_bytes()));
        parsed
            .query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);
        Ok(parsed.to_string())
    }
}
