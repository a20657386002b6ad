use crate::test_utils::{
    file_id, hotlink_id, LIVE_SESSIONS, LIVE_UPLOADS, SCHEMA_VERSION, TEST_API_KEYS_COUNT,
    TEST_FILES_COUNT,
};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;

const TABLES: [&str; 6] = [
    "file_metadata",
    "hotlinks",
    "api_keys",
    "sessions",
    "upload_status",
    "upload_defaults",
];

/// Checks the raw SQLite file after seeding and one sweep
pub async fn validate(sqlite_path: &Path) -> Result<()> {
    let options = SqliteConnectOptions::new().filename(sqlite_path);
    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to open SQLite database")?;

    for table in TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .with_context(|| format!("Failed to look up table {}", table))?;
        if !exists {
            anyhow::bail!("Table {} is missing", table);
        }
    }
    println!("  ✓ All {} tables exist", TABLES.len());

    expect_count(&pool, "file_metadata", TEST_FILES_COUNT).await?;
    expect_count(&pool, "hotlinks", TEST_FILES_COUNT).await?;
    expect_count(&pool, "api_keys", TEST_API_KEYS_COUNT).await?;
    expect_count(&pool, "sessions", LIVE_SESSIONS.len()).await?;
    expect_count(&pool, "upload_status", LIVE_UPLOADS.len()).await?;
    expect_count(&pool, "upload_defaults", 1).await?;

    for chunk_id in LIVE_UPLOADS {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM upload_status WHERE id = ?)")
                .bind(chunk_id)
                .fetch_one(&pool)
                .await?;
        if !found {
            anyhow::bail!("Upload status {} was swept but should have been kept", chunk_id);
        }
    }
    println!("  ✓ Live upload records survived the sweep");

    let target: String = sqlx::query_scalar("SELECT file_id FROM hotlinks WHERE id = ?")
        .bind(hotlink_id(0))
        .fetch_one(&pool)
        .await
        .context("Failed to read hotlink")?;
    if target != file_id(0) {
        anyhow::bail!("Hotlink points at {}, expected {}", target, file_id(0));
    }
    println!("  ✓ Hotlink {} resolves to {}", hotlink_id(0), target);

    let (defaults_id, unlimited_time): (String, i64) =
        sqlx::query_as("SELECT id, unlimited_time FROM upload_defaults")
            .fetch_one(&pool)
            .await
            .context("Failed to read upload defaults")?;
    if defaults_id != "default" || unlimited_time != 1 {
        anyhow::bail!(
            "Unexpected upload defaults row: id={}, unlimited_time={}",
            defaults_id,
            unlimited_time
        );
    }
    println!("  ✓ Upload defaults stored as a single row");

    let version: i32 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&pool)
        .await
        .context("Failed to read user_version")?;
    if version != SCHEMA_VERSION {
        anyhow::bail!("Expected user_version {}, found {}", SCHEMA_VERSION, version);
    }
    println!("  ✓ user_version is {}", version);

    pool.close().await;
    Ok(())
}

async fn expect_count(pool: &SqlitePool, table: &str, expected: usize) -> Result<()> {
    // table names come from the fixed list above
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to count rows in {}", table))?;
    if count != expected as i64 {
        anyhow::bail!("Expected {} rows in {}, found {}", expected, table, count);
    }
    println!("  ✓ {} has {} rows", table, count);
    Ok(())
}
