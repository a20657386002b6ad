//! API key permission bits
//!
//! Storage treats the mask as opaque; these helpers are for the callers that
//! hand out and check keys.

use crate::ApiKey;

pub const PERM_NONE: u8 = 0;
pub const PERM_VIEW: u8 = 1 << 0;
pub const PERM_UPLOAD: u8 = 1 << 1;
pub const PERM_DELETE: u8 = 1 << 2;
pub const PERM_API_MOD: u8 = 1 << 3;
pub const PERM_EDIT: u8 = 1 << 4;

/// Every permission except modifying API keys
pub const PERM_ALL_NO_API_MOD: u8 = PERM_VIEW | PERM_UPLOAD | PERM_DELETE | PERM_EDIT;
pub const PERM_ALL: u8 = PERM_ALL_NO_API_MOD | PERM_API_MOD;

impl ApiKey {
    pub fn set_permission(&mut self, permission: u8) {
        self.permissions |= permission;
    }

    pub fn remove_permission(&mut self, permission: u8) {
        self.permissions &= !permission;
    }

    /// `PERM_NONE` is always granted
    pub fn has_permission(&self, permission: u8) -> bool {
        self.permissions & permission == permission
    }
}
