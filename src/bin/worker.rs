use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use lexdesk::{
    config::AppConfig, db, notify::TracingNotifier, storage::LocalBlobStorage, store::PgStore,
    Worker, Workspace,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        blob_root = %config.blob_root.display(),
        analyzer = %config.engine.analyzer_id,
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;

    let workspace = Workspace::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(LocalBlobStorage::new(config.blob_root.clone())),
        Arc::new(TracingNotifier),
        config.engine.clone(),
    );
    let worker = Worker::new(workspace, config.worker_poll_interval);

    tokio::select! {
        _ = worker.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("worker received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
