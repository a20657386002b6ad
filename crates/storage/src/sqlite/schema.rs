use crate::error::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Database schema manager
pub struct Schema;

impl Schema {
    /// Create every table if missing; safe to run on each start
    pub async fn initialize(pool: &SqlitePool) -> Result<()> {
        Self::create_metadata_table(pool).await?;
        Self::create_hotlinks_table(pool).await?;
        Self::create_api_keys_table(pool).await?;
        Self::create_sessions_table(pool).await?;
        Self::create_upload_status_table(pool).await?;
        Self::create_upload_defaults_table(pool).await?;
        info!("SQLite database storage initialized");
        Ok(())
    }

    async fn create_metadata_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS file_metadata (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                size TEXT NOT NULL,
                sha1 TEXT NOT NULL,
                content_type TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                hotlink_id TEXT NOT NULL,
                expire_at INTEGER NOT NULL,
                expire_at_string TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                upload_date INTEGER NOT NULL,
                downloads_remaining INTEGER NOT NULL,
                download_count INTEGER NOT NULL,
                unlimited_downloads INTEGER NOT NULL,
                unlimited_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn create_hotlinks_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hotlinks (
                id TEXT PRIMARY KEY NOT NULL,
                file_id TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn create_api_keys_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id TEXT PRIMARY KEY NOT NULL,
                friendly_name TEXT NOT NULL,
                permissions INTEGER NOT NULL,
                last_used INTEGER NOT NULL,
                last_used_string TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY NOT NULL,
                renew_at INTEGER NOT NULL,
                valid_until INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn create_upload_status_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_status (
                id TEXT PRIMARY KEY NOT NULL,
                current_status INTEGER NOT NULL,
                last_update INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn create_upload_defaults_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_defaults (
                id TEXT PRIMARY KEY NOT NULL,
                downloads INTEGER NOT NULL,
                time_expiry INTEGER NOT NULL,
                password TEXT NOT NULL,
                unlimited_download INTEGER NOT NULL,
                unlimited_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}
