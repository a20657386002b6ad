//! Garbage collection
//!
//! The sweep is the same for every backend: enumerate, test each record
//! against the policy below, then ask the provider to delete it. The provider
//! re-checks the policy against the stored record in the same atomic step, so
//! a record completed or renewed after enumeration survives. Native key expiry
//! in the key/value backend may remove records earlier, never later.

use crate::error::Result;
use crate::keys::Kind;
use crate::Database;
use common::utils::SECONDS_PER_DAY;
use common::{Session, UploadStatus};
use serde::Serialize;
use tracing::{debug, info};

/// In-progress upload records untouched for longer than this are stale
pub const STALE_UPLOAD_AGE: i64 = SECONDS_PER_DAY;

/// Records removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub sessions_removed: usize,
    pub upload_status_removed: usize,
}

/// Either clock running out ends the session
pub fn session_expired(session: &Session, now: i64) -> bool {
    session.renew_at <= now || session.valid_until <= now
}

/// Completed records are kept. In-progress records go once they are older
/// than a day, or immediately if they were never updated (`last_update == 0`).
/// A `last_update` in the future keeps the record.
pub fn upload_status_stale(status: &UploadStatus, now: i64) -> bool {
    if !status.is_in_progress() {
        return false;
    }
    status.last_update == 0 || now.saturating_sub(status.last_update) > STALE_UPLOAD_AGE
}

/// A conditional delete: the backend removes the record only if its current
/// stored state still matches the rule at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sweep {
    /// [`session_expired`]
    ExpiredSession,
    /// [`upload_status_stale`]
    StaleUpload,
}

impl Sweep {
    pub(crate) fn kind(self) -> Kind {
        match self {
            Sweep::ExpiredSession => Kind::Session,
            Sweep::StaleUpload => Kind::UploadStatus,
        }
    }
}

pub(crate) async fn run(db: &Database) -> Result<GcReport> {
    let now = db.now();
    let mut report = GcReport::default();

    for (id, status) in db.get_all::<UploadStatus>().await? {
        if upload_status_stale(&status, now) && db.sweep(Sweep::StaleUpload, &id, now).await? {
            debug!(chunk_id = %id, last_update = status.last_update, "Removed stale upload status");
            report.upload_status_removed += 1;
        }
    }

    for (id, session) in db.get_all::<Session>().await? {
        if session_expired(&session, now) && db.sweep(Sweep::ExpiredSession, &id, now).await? {
            debug!(session_id = %id, "Removed expired session");
            report.sessions_removed += 1;
        }
    }

    info!(
        sessions = report.sessions_removed,
        upload_status = report.upload_status_removed,
        "Garbage collection finished"
    );
    Ok(report)
}
