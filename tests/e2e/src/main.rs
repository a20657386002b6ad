mod database_validator;
mod test_utils;

use anyhow::{Context, Result};
use common::Session;
use std::path::{Path, PathBuf};
use storage::{BackendKind, Database, DbConnection};
use test_utils::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("e2e_tests=debug,storage=debug,info")
        .init();

    let storage_type = std::env::var("STORAGE_TYPE").unwrap_or_else(|_| "sqlite".to_string());

    match storage_type.parse::<BackendKind>() {
        Ok(BackendKind::Sqlite) => {
            println!("🗄️  Running E2E tests with SQLITE storage...");
            run_sqlite_storage_tests().await?;
        }
        Ok(BackendKind::Redis) => {
            println!("🔑 Running E2E tests with REDIS storage...");
            run_redis_storage_tests().await?;
        }
        Err(_) => {
            anyhow::bail!(
                "Invalid STORAGE_TYPE: {}. Must be 'sqlite' or 'redis'",
                storage_type
            );
        }
    }

    println!("\n✅ All E2E tests passed!");

    Ok(())
}

fn storagectl_binary() -> Result<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(Path::parent)
        .context("e2e crate is not inside the workspace")?;
    Ok(workspace_root.join("target").join("release").join("storagectl"))
}

async fn run_sqlite_storage_tests() -> Result<()> {
    let test_data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("sqlite");
    std::fs::create_dir_all(&test_data_dir)?;
    let sqlite_path = test_data_dir.join("filestore.sqlite");
    let binary = storagectl_binary()?;

    println!("SQLite path: {:?}", sqlite_path);
    println!("storagectl binary: {:?}", binary);

    let config = DbConnection::sqlite(&sqlite_path);
    let envs = vec![
        ("STORAGE_TYPE", "sqlite".to_string()),
        ("SQLITE_PATH", sqlite_path.display().to_string()),
    ];

    let test_result = async {
        run_scenario(&config, &binary, &envs).await?;

        println!("\n🔍 Validating database state...");
        database_validator::validate(&sqlite_path).await?;
        println!("✅ Database validation passed");
        Ok::<(), anyhow::Error>(())
    };

    let result = test_result.await;

    // Always cleanup, even on error
    if let Err(e) = cleanup_test_data(&test_data_dir) {
        eprintln!("Warning: Failed to cleanup test data: {}", e);
    }

    result
}

async fn run_redis_storage_tests() -> Result<()> {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1:6379".to_string());
    let password = std::env::var("REDIS_PASSWORD").unwrap_or_default();
    let prefix = format!("e2e:{}:", uuid::Uuid::new_v4());
    let redis_url = if password.is_empty() {
        format!("redis://{}", host)
    } else {
        format!("redis://:{}@{}", password, host)
    };
    let binary = storagectl_binary()?;

    println!("Redis host: {}", host);
    println!("Key prefix: {}", prefix);
    println!("storagectl binary: {:?}", binary);

    let config = DbConnection {
        password: password.clone(),
        ..DbConnection::redis(&host, &prefix)
    };
    let envs = vec![
        ("STORAGE_TYPE", "redis".to_string()),
        ("REDIS_HOST", host.clone()),
        ("REDIS_PASSWORD", password),
        ("REDIS_PREFIX", prefix.clone()),
    ];

    let test_result = async {
        run_scenario(&config, &binary, &envs).await?;

        println!("\n🔍 Validating Redis key layout...");
        redis_validator::validate(&redis_url, &prefix).await?;
        println!("✅ Redis validation passed");
        Ok::<(), anyhow::Error>(())
    };

    let result = test_result.await;

    if let Err(e) = redis_validator::cleanup_test_data(&redis_url, &prefix).await {
        eprintln!("Warning: Failed to cleanup Redis test data: {}", e);
    }

    result
}

/// Seed through the library, then sweep and inspect through storagectl
async fn run_scenario(config: &DbConnection, binary: &Path, envs: &[(&str, String)]) -> Result<()> {
    println!("\n📝 Seeding records...");
    let db = Database::init(config).await?;
    let now = common::utils::current_unix_timestamp();
    let seeded = seed(&db, now).await;
    db.close().await;
    seeded?;
    println!("✅ Seeded records");

    println!("\n🧹 Running garbage collection...");
    let report: serde_json::Value = serde_json::from_str(&run_storagectl(binary, envs, &["gc"])?)?;
    let removed_sessions = report["sessions_removed"].as_u64().unwrap_or_default();
    let removed_uploads = report["upload_status_removed"].as_u64().unwrap_or_default();
    if removed_sessions != STALE_SESSIONS.len() as u64 || removed_uploads != STALE_UPLOADS.len() as u64 {
        anyhow::bail!("Unexpected garbage collection report: {}", report);
    }
    println!(
        "✅ Removed {} sessions and {} upload records",
        removed_sessions, removed_uploads
    );

    println!("\n🔍 Checking storagectl output...");
    let version = run_storagectl(binary, envs, &["version"])?;
    if version.trim() != SCHEMA_VERSION.to_string() {
        anyhow::bail!("storagectl version printed {:?}", version);
    }
    let sessions: std::collections::BTreeMap<String, Session> =
        serde_json::from_str(&run_storagectl(binary, envs, &["list", "sessions"])?)?;
    let ids: Vec<&str> = sessions.keys().map(String::as_str).collect();
    if ids != LIVE_SESSIONS {
        anyhow::bail!("storagectl list sessions returned {:?}", ids);
    }
    let defaults: common::UploadDefaults =
        serde_json::from_str(&run_storagectl(binary, envs, &["defaults"])?)?;
    if defaults != upload_defaults() {
        anyhow::bail!("storagectl defaults returned {:?}", defaults);
    }
    println!("✅ storagectl output matches");
    Ok(())
}
