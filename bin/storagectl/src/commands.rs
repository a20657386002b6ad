use clap::ValueEnum;
use common::{ApiKey, FileMetadata, Hotlink, Session, UploadStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use storage::{Database, Record};
use tracing::{error, info};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Metadata,
    Hotlinks,
    ApiKeys,
    Sessions,
    UploadStatus,
}

/// One sweep, or one every `every` seconds until Ctrl-C
pub async fn gc(db: &Database, every: Option<u64>) -> anyhow::Result<()> {
    let Some(seconds) = every else {
        let report = db.run_garbage_collection().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(seconds.max(1)));
    info!(every = seconds, "Running garbage collection periodically, press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // keep going on failure, the next tick retries
                if let Err(e) = db.run_garbage_collection().await {
                    error!("Garbage collection failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping garbage collection");
                return Ok(());
            }
        }
    }
}

pub async fn version(db: &Database) -> anyhow::Result<()> {
    println!("{}", db.get_version().await?);
    Ok(())
}

pub async fn set_version(db: &Database, version: i32) -> anyhow::Result<()> {
    db.set_version(version).await?;
    info!(version, "Database version updated");
    Ok(())
}

pub async fn list(db: &Database, kind: ListKind) -> anyhow::Result<()> {
    let json = match kind {
        ListKind::Metadata => dump::<FileMetadata>(db).await?,
        ListKind::Hotlinks => dump::<Hotlink>(db).await?,
        ListKind::ApiKeys => dump::<ApiKey>(db).await?,
        ListKind::Sessions => dump::<Session>(db).await?,
        ListKind::UploadStatus => dump::<UploadStatus>(db).await?,
    };
    println!("{json}");
    Ok(())
}

pub async fn clear_sessions(db: &Database) -> anyhow::Result<()> {
    db.delete_all::<Session>().await?;
    info!("All sessions deleted");
    Ok(())
}

pub async fn defaults(db: &Database) -> anyhow::Result<()> {
    let defaults = db.get_upload_defaults().await?;
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

/// Records sorted by id so the output is stable
async fn dump<R: Record + Serialize>(db: &Database) -> anyhow::Result<String> {
    let records: HashMap<String, R> = db.get_all().await?;
    let sorted: BTreeMap<String, R> = records.into_iter().collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}
