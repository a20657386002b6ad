use anyhow::{Context, Result};
use common::utils::SECONDS_PER_HOUR;
use common::{ApiKey, FileMetadata, Session, UploadDefaults, UploadStatus};
use std::fs;
use std::path::Path;
use std::process::Command;
use storage::Database;

pub const TEST_FILES_COUNT: usize = 3;
pub const TEST_API_KEYS_COUNT: usize = 2;
pub const SCHEMA_VERSION: i32 = 7;

/// Sessions and upload records the sweep must keep
pub const LIVE_SESSIONS: [&str; 1] = ["session-valid"];
pub const STALE_SESSIONS: [&str; 2] = ["session-expired", "session-renew-passed"];
pub const LIVE_UPLOADS: [&str; 3] = ["chunk-fresh", "chunk-completed", "chunk-future"];
pub const STALE_UPLOADS: [&str; 2] = ["chunk-stale", "chunk-never-updated"];

pub fn hotlink_id(i: usize) -> String {
    format!("hotlink{}.png", i)
}

pub fn file_id(i: usize) -> String {
    format!("file{}", i)
}

pub fn upload_defaults() -> UploadDefaults {
    UploadDefaults {
        downloads: 9,
        time_expiry: 3,
        password: "e2e".to_string(),
        unlimited_download: false,
        unlimited_time: true,
    }
}

/// Writes one of everything through the library
pub async fn seed(db: &Database, now: i64) -> Result<()> {
    for i in 0..TEST_FILES_COUNT {
        let file = FileMetadata {
            id: file_id(i),
            name: format!("file{}.txt", i),
            size: "20 B".to_string(),
            sha1: format!("{:040x}", i),
            content_type: "text/plain".to_string(),
            hotlink_id: Some(hotlink_id(i)),
            expire_at: now + 24 * SECONDS_PER_HOUR,
            expire_at_string: "tomorrow".to_string(),
            size_bytes: 20,
            upload_date: now,
            downloads_remaining: 5,
            ..Default::default()
        };
        db.save_metadata(&file).await?;
        db.save_hotlink(&file).await?;
    }

    for i in 0..TEST_API_KEYS_COUNT {
        let key = ApiKey {
            id: format!("apikey{}", i),
            friendly_name: format!("Key {}", i),
            permissions: common::permissions::PERM_ALL_NO_API_MOD,
            ..Default::default()
        };
        db.save_api_key(&key).await?;
    }

    let sessions = [
        ("session-valid", now + SECONDS_PER_HOUR, now + 2 * SECONDS_PER_HOUR),
        ("session-expired", now - 10, now - 10),
        ("session-renew-passed", now - 10, now + SECONDS_PER_HOUR),
    ];
    for (id, renew_at, valid_until) in sessions {
        db.save(
            id,
            &Session {
                renew_at,
                valid_until,
            },
        )
        .await?;
    }

    let uploads = [
        ("chunk-fresh", UploadStatus::IN_PROGRESS, now - 20 * SECONDS_PER_HOUR),
        ("chunk-completed", UploadStatus::COMPLETED, now - 49 * SECONDS_PER_HOUR),
        ("chunk-future", UploadStatus::IN_PROGRESS, now + 40 * SECONDS_PER_HOUR),
        ("chunk-stale", UploadStatus::IN_PROGRESS, now - 25 * SECONDS_PER_HOUR),
        ("chunk-never-updated", UploadStatus::IN_PROGRESS, 0),
    ];
    for (chunk_id, current_status, last_update) in uploads {
        db.save_upload_status(&UploadStatus {
            chunk_id: chunk_id.to_string(),
            current_status,
            last_update,
        })
        .await?;
    }

    db.save_upload_defaults(&upload_defaults()).await?;
    db.set_version(SCHEMA_VERSION).await?;
    Ok(())
}

/// Runs the maintenance binary and returns its stdout
pub fn run_storagectl(binary: &Path, envs: &[(&str, String)], args: &[&str]) -> Result<String> {
    let output = Command::new(binary)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
        .output()
        .with_context(|| format!("Failed to run storagectl binary: {:?}", binary))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("storagectl {} failed: {}", args.join(" "), stderr);
    }
    Ok(String::from_utf8(output.stdout)?)
}

pub fn cleanup_test_data(test_data_dir: &Path) -> Result<()> {
    let keep_data = std::env::var("KEEP_TEST_DATA").unwrap_or_else(|_| "false".to_string());
    if keep_data == "true" {
        println!(
            "\n⚠️  Keeping test data (KEEP_TEST_DATA=true): {:?}",
            test_data_dir
        );
        return Ok(());
    }

    println!("\n🧹 Cleaning up test data: {:?}", test_data_dir);
    if test_data_dir.exists() {
        fs::remove_dir_all(test_data_dir).with_context(|| {
            format!("Failed to remove test data directory: {:?}", test_data_dir)
        })?;
        println!("✅ Test data cleaned up");
    }
    Ok(())
}
