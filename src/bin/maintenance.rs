use std::env;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use lexdesk::{
    config::AppConfig,
    db,
    store::{PgStore, WorkspaceStore},
    tasks::fail_stale_tasks,
};

const USAGE: &str = "Usage: maintenance migrate | maintenance fail-stale <minutes>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("migrate") => migrate()?,
        Some("fail-stale") => {
            let minutes: i64 = args
                .next()
                .ok_or_else(|| anyhow!("fail-stale needs an age in minutes"))?
                .parse()
                .context("minutes must be an integer")?;
            fail_stale(minutes)?;
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn load_pool() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded configuration"
    );
    db::init_pool_with_size(&config.database_url, config.database_max_pool_size)
}

fn migrate() -> Result<()> {
    let pool = load_pool()?;
    let applied = db::run_migrations(&pool)?;
    println!("Applied {applied} migrations.");
    Ok(())
}

fn fail_stale(minutes: i64) -> Result<()> {
    if minutes < 0 {
        return Err(anyhow!("minutes must not be negative"));
    }
    let store = PgStore::new(load_pool()?);
    let cutoff = Utc::now().naive_utc() - Duration::minutes(minutes);
    let failed = store
        .transaction(|tx| Ok(fail_stale_tasks(tx, cutoff)?))
        .context("failed to fail stale tasks")?;

    if failed.is_empty() {
        println!("No stale tasks found.");
        return Ok(());
    }
    for task in &failed {
        println!("Failed task {} ({}) for document {}", task.id, task.analysis_type, task.document_id);
    }
    Ok(())
}
