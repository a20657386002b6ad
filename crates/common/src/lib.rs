pub mod permissions;
pub mod utils;

use serde::{Deserialize, Serialize};

/// Metadata of a single uploaded file
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    pub size: String, // human readable, e.g. "1.2 MB"
    pub sha1: String,
    pub content_type: String,
    pub password_hash: String,
    pub hotlink_id: Option<String>,
    pub expire_at: i64, // unix seconds, ignored when unlimited_time is set
    pub expire_at_string: String,
    pub size_bytes: i64,
    pub upload_date: i64,
    pub downloads_remaining: i64,
    pub download_count: i64,
    pub unlimited_downloads: bool,
    pub unlimited_time: bool,
}

/// Hotlink target: the id of the file a public hotlink resolves to
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Hotlink {
    pub file_id: String,
}

/// A single API key
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiKey {
    pub id: String,
    pub friendly_name: String,
    pub last_used_string: String,
    pub last_used: i64,
    pub permissions: u8, // bitmask, see `permissions`
}

/// An authenticated web session
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub renew_at: i64,
    pub valid_until: i64,
}

/// Values used for the last upload, offered as defaults for the next one
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadDefaults {
    pub downloads: i64,
    pub time_expiry: i64, // days
    pub password: String,
    pub unlimited_download: bool,
    pub unlimited_time: bool,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            downloads: 1,
            time_expiry: 14,
            password: String::new(),
            unlimited_download: false,
            unlimited_time: false,
        }
    }
}

/// Progress of one chunk of a multi-part upload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadStatus {
    pub chunk_id: String,
    pub current_status: i64,
    pub last_update: i64, // unix seconds, 0 if never updated
}

impl UploadStatus {
    pub const IN_PROGRESS: i64 = 0;
    pub const COMPLETED: i64 = 1;

    pub fn is_in_progress(&self) -> bool {
        self.current_status == Self::IN_PROGRESS
    }
}
