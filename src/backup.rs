use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Writes a consistent copy of the live database into `dir`.
///
/// `VACUUM INTO` reads from a snapshot, so ledger writes keep going while the
/// copy is made.
pub async fn backup_once(pool: &Pool<Sqlite>, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating backup directory {}", dir.display()))?;

    let file_name = format!("payment_{}.db", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
    let path = dir.join(file_name);
    let target = path
        .to_str()
        .context("backup path is not valid UTF-8")?
        .to_string();

    sqlx::query("VACUUM INTO ?")
        .bind(&target)
        .execute(pool)
        .await
        .with_context(|| format!("writing backup {target}"))?;

    Ok(path)
}

/// Backs up every `interval` until the task is aborted. Failures are logged and
/// retried on the next tick.
pub fn spawn_backups(pool: Pool<Sqlite>, dir: PathBuf, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; start counting from now instead
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match backup_once(&pool, &dir).await {
                Ok(path) => info!("Database backed up to {}", path.display()),
                Err(e) => error!("Database backup failed: {:#}", e),
            }
        }
    })
}
