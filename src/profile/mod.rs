//! Profile synchronization
//!
//! Find-or-create of the per-user profile record plus the per-login
//! refresh of derived fields (directory uid, subject list).

pub mod reference;
pub mod sync;

pub use reference::{resolve_reference_id, resolve_reference_ids};
pub use sync::ProfileSynchronizer;

/// Collection names on the record store
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const DIRECTORY: &str = "directory";
    pub const SUBJECTS: &str = "subjects";
}

/// Field identifiers on the profile record
pub mod fields {
    pub const USER_ID: &str = "user_id";
    pub const USER_NAME: &str = "user_name";
    pub const USER_EMAIL: &str = "user_email";
    pub const LOGIN_COUNT: &str = "login_count";
    pub const ORGANIZATION_ID: &str = "organization_id";
    pub const GROUP_IDS: &str = "group_ids";
    pub const DIRECTORY_UID: &str = "directory_uid";

    /// Profile slot for subject entry `n` (1-based)
    pub fn subject_slot(n: usize) -> String {
        format!("subject_{n}")
    }
}

/// Field identifiers on the directory record
pub mod directory_fields {
    pub const EMAIL: &str = "email";
    pub const UID: &str = "uid";
    pub const ORGANIZATION: &str = "organization";
    pub const GROUPS: &str = "groups";
}

/// Profile subject slots are fixed at fifteen
pub const MAX_SUBJECTS: usize = 15;
