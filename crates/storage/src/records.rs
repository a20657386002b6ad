//! Column layout of every stored entity

use crate::codec::{Column, Layout, Reader, Record, Value};
use crate::error::{Result, StorageError};
use crate::gc::STALE_UPLOAD_AGE;
use crate::keys::Kind;
use common::{ApiKey, FileMetadata, Hotlink, Session, UploadDefaults, UploadStatus};

impl Record for FileMetadata {
    const KIND: Kind = Kind::Metadata;
    const COLUMNS: &'static [Column] = &[
        Column::text("name", "name"),
        Column::text("size", "size"),
        Column::text("sha1", "sha1"),
        Column::text("contentType", "content_type"),
        Column::text("passwordHash", "password_hash"),
        Column::text("hotlinkId", "hotlink_id"),
        Column::int("expireAt", "expire_at"),
        Column::text("expireAtString", "expire_at_string"),
        Column::int("sizeBytes", "size_bytes"),
        Column::int("uploadDate", "upload_date"),
        Column::int("downloadsRemaining", "downloads_remaining"),
        Column::int("downloadCount", "download_count"),
        Column::bool("unlimitedDownloads", "unlimited_downloads"),
        Column::bool("unlimitedTime", "unlimited_time"),
    ];

    fn encode(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Text(self.size.clone()),
            Value::Text(self.sha1.clone()),
            Value::Text(self.content_type.clone()),
            Value::Text(self.password_hash.clone()),
            // no hotlink is stored as ""
            Value::Text(self.hotlink_id.clone().unwrap_or_default()),
            Value::Int(self.expire_at),
            Value::Text(self.expire_at_string.clone()),
            Value::Int(self.size_bytes),
            Value::Int(self.upload_date),
            Value::Int(self.downloads_remaining),
            Value::Int(self.download_count),
            Value::Bool(self.unlimited_downloads),
            Value::Bool(self.unlimited_time),
        ]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        Ok(FileMetadata {
            id: id.to_string(),
            name: r.text()?,
            size: r.text()?,
            sha1: r.text()?,
            content_type: r.text()?,
            password_hash: r.text()?,
            hotlink_id: Some(r.text()?).filter(|hotlink| !hotlink.is_empty()),
            expire_at: r.int()?,
            expire_at_string: r.text()?,
            size_bytes: r.int()?,
            upload_date: r.int()?,
            downloads_remaining: r.int()?,
            download_count: r.int()?,
            unlimited_downloads: r.flag()?,
            unlimited_time: r.flag()?,
        })
    }
}

impl Record for Hotlink {
    const KIND: Kind = Kind::Hotlink;
    const LAYOUT: Layout = Layout::Scalar;
    const COLUMNS: &'static [Column] = &[Column::text("fileId", "file_id")];

    fn encode(&self) -> Vec<Value> {
        vec![Value::Text(self.file_id.clone())]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        Ok(Hotlink { file_id: r.text()? })
    }
}

impl Record for ApiKey {
    const KIND: Kind = Kind::ApiKey;
    const COLUMNS: &'static [Column] = &[
        Column::text("friendlyName", "friendly_name"),
        Column::int("permissions", "permissions"),
        Column::int("lastUsed", "last_used"),
        Column::text("lastUsedString", "last_used_string"),
    ];

    fn encode(&self) -> Vec<Value> {
        vec![
            Value::Text(self.friendly_name.clone()),
            Value::Int(i64::from(self.permissions)),
            Value::Int(self.last_used),
            Value::Text(self.last_used_string.clone()),
        ]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        let friendly_name = r.text()?;
        let raw_permissions = r.int()?;
        let permissions = u8::try_from(raw_permissions).map_err(|_| {
            StorageError::decode(
                Self::KIND.name(),
                id,
                format!("permission mask {raw_permissions} out of range"),
            )
        })?;
        Ok(ApiKey {
            id: id.to_string(),
            friendly_name,
            permissions,
            last_used: r.int()?,
            last_used_string: r.text()?,
        })
    }
}

impl Record for Session {
    const KIND: Kind = Kind::Session;
    const COLUMNS: &'static [Column] = &[
        Column::int("renewAt", "renew_at"),
        Column::int("validUntil", "valid_until"),
    ];

    fn encode(&self) -> Vec<Value> {
        vec![Value::Int(self.renew_at), Value::Int(self.valid_until)]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        Ok(Session {
            renew_at: r.int()?,
            valid_until: r.int()?,
        })
    }

    fn expires_at(&self) -> Option<i64> {
        Some(self.valid_until)
    }
}

impl Record for UploadStatus {
    const KIND: Kind = Kind::UploadStatus;
    const COLUMNS: &'static [Column] = &[
        Column::int("currentStatus", "current_status"),
        Column::int("lastUpdate", "last_update"),
    ];

    fn encode(&self) -> Vec<Value> {
        vec![Value::Int(self.current_status), Value::Int(self.last_update)]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        Ok(UploadStatus {
            chunk_id: id.to_string(),
            current_status: r.int()?,
            last_update: r.int()?,
        })
    }

    // First second at which the sweep would remove it as well
    fn expires_at(&self) -> Option<i64> {
        (self.is_in_progress() && self.last_update != 0)
            .then(|| self.last_update.saturating_add(STALE_UPLOAD_AGE + 1))
    }
}

impl Record for UploadDefaults {
    const KIND: Kind = Kind::UploadDefaults;
    const LAYOUT: Layout = Layout::Blob;
    const COLUMNS: &'static [Column] = &[
        Column::int("downloads", "downloads"),
        Column::int("timeExpiry", "time_expiry"),
        Column::text("password", "password"),
        Column::bool("unlimitedDownload", "unlimited_download"),
        Column::bool("unlimitedTime", "unlimited_time"),
    ];

    fn encode(&self) -> Vec<Value> {
        vec![
            Value::Int(self.downloads),
            Value::Int(self.time_expiry),
            Value::Text(self.password.clone()),
            Value::Bool(self.unlimited_download),
            Value::Bool(self.unlimited_time),
        ]
    }

    fn decode(id: &str, values: Vec<Value>) -> Result<Self> {
        let mut r = Reader::new(Self::KIND, id, values);
        Ok(UploadDefaults {
            downloads: r.int()?,
            time_expiry: r.int()?,
            password: r.text()?,
            unlimited_download: r.flag()?,
            unlimited_time: r.flag()?,
        })
    }
}
