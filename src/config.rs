use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_ANALYZER_ID: &str = "lexdesk-rules/1";
pub const DEFAULT_PRESIGN_TTL_SECONDS: u64 = 300;

/// How concurrent edits to the same document are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    #[default]
    LastWriteWins,
    /// Updates must carry the edit version they were based on.
    CompareAndSwap,
}

impl FromStr for UpdatePolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(Self::LastWriteWins),
            "compare-and-swap" | "cas" => Ok(Self::CompareAndSwap),
            other => Err(anyhow!("unknown update policy '{other}'")),
        }
    }
}

/// Which status transitions `update_status` accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    #[default]
    Permissive,
    ForwardOnly,
}

impl FromStr for StatusPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "forward-only" | "strict" => Ok(Self::ForwardOnly),
            other => Err(anyhow!("unknown status policy '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub update_policy: UpdatePolicy,
    pub status_policy: StatusPolicy,
    pub auto_analyze: bool,
    pub presign_ttl: Duration,
    pub analyzer_id: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            update_policy: UpdatePolicy::default(),
            status_policy: StatusPolicy::default(),
            auto_analyze: true,
            presign_ttl: Duration::from_secs(DEFAULT_PRESIGN_TTL_SECONDS),
            analyzer_id: DEFAULT_ANALYZER_ID.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub blob_root: PathBuf,
    pub worker_poll_interval: Duration,
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let blob_root = env::var("BLOB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./blobs"));
        let presign_ttl_seconds: u64 = env::var("PRESIGN_TTL_SECONDS")
            .unwrap_or_else(|_| DEFAULT_PRESIGN_TTL_SECONDS.to_string())
            .parse()
            .context("PRESIGN_TTL_SECONDS must be an integer")?;
        let worker_poll_interval_ms: u64 = env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .context("WORKER_POLL_INTERVAL_MS must be an integer")?;
        let update_policy = env::var("UPDATE_POLICY")
            .ok()
            .map(|value| value.parse::<UpdatePolicy>())
            .transpose()
            .context("UPDATE_POLICY must be last-write-wins or compare-and-swap")?
            .unwrap_or_default();
        let status_policy = env::var("STATUS_POLICY")
            .ok()
            .map(|value| value.parse::<StatusPolicy>())
            .transpose()
            .context("STATUS_POLICY must be permissive or forward-only")?
            .unwrap_or_default();
        let auto_analyze = env::var("AUTO_ANALYZE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        let analyzer_id =
            env::var("ANALYZER_ID").unwrap_or_else(|_| DEFAULT_ANALYZER_ID.to_string());

        Ok(Self {
            database_url,
            database_max_pool_size,
            blob_root,
            worker_poll_interval: Duration::from_millis(worker_poll_interval_ms),
            engine: EngineSettings {
                update_policy,
                status_policy,
                auto_analyze,
                presign_ttl: Duration::from_secs(presign_ttl_seconds),
                analyzer_id,
            },
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_database_password() {
        let redacted = redact_database_url("postgres://lexdesk:hunter2@db:5432/lexdesk");
        assert!(redacted.starts_with("postgres://lexdesk:*****@db:5432"));
        assert!(!redacted.contains("hunter2"));
    }

    #[test]
    fn unparsable_url_is_fully_masked() {
        assert_eq!(redact_database_url("::"), "***");
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(
            "compare-and-swap".parse::<UpdatePolicy>().unwrap(),
            UpdatePolicy::CompareAndSwap
        );
        assert_eq!(
            " LWW ".parse::<UpdatePolicy>().unwrap(),
            UpdatePolicy::LastWriteWins
        );
        assert_eq!(
            "forward-only".parse::<StatusPolicy>().unwrap(),
            StatusPolicy::ForwardOnly
        );
        assert!("sometimes".parse::<StatusPolicy>().is_err());
    }

    #[test]
    fn engine_defaults_are_permissive() {
        let settings = EngineSettings::default();
        assert_eq!(settings.update_policy, UpdatePolicy::LastWriteWins);
        assert_eq!(settings.status_policy, StatusPolicy::Permissive);
        assert!(settings.auto_analyze);
        assert_eq!(settings.presign_ttl.as_secs(), 300);
    }
}
