//! Idempotent profile resolution
//!
//! `resolve_profile` finds or creates the one profile record for a user
//! and backfills derived fields on every login:
//!
//! - found: the login counter is bumped fire-and-forget, then the refresh
//!   step runs
//! - not found: a new profile is created, pulling connection fields from
//!   the directory record located by email
//! - refresh (both branches): the directory uid is re-checked and the
//!   subject list is rebuilt unconditionally, because the subject source
//!   is the system of record and must never silently go stale
//!
//! Partial failure of the refresh step is logged and swallowed; the
//! already-resolved profile is still returned.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::profile::{collections, directory_fields, fields, MAX_SUBJECTS};
use crate::profile::reference::{resolve_reference_id, resolve_reference_ids};
use crate::retry::{self, RetryPolicy};
use crate::store::{FieldFilter, RecordStore};
use crate::types::{FieldMap, RemoteRecord, Result, UserIdentity};

/// Resolves and maintains per-user profile records
pub struct ProfileSynchronizer {
    store: Arc<dyn RecordStore>,
    retry: RetryPolicy,
}

impl ProfileSynchronizer {
    pub fn new(store: Arc<dyn RecordStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Resolve the user's profile, creating it on first observed login.
    ///
    /// Idempotent: two consecutive calls for the same user yield exactly
    /// one profile record; the second call only mutates it. A missing user
    /// id short-circuits to `Ok(None)` without touching the store.
    pub async fn resolve_profile(&self, identity: &UserIdentity) -> Result<Option<RemoteRecord>> {
        if identity.user_id.trim().is_empty() {
            warn!("Profile resolution requested without a user id");
            return Ok(None);
        }

        let filter = FieldFilter::eq(fields::USER_ID, identity.user_id.as_str());
        let store = self.store.clone();
        let existing = retry::execute("profile-query", &self.retry, || {
            let store = store.clone();
            let filter = filter.clone();
            async move { store.query(collections::PROFILES, &filter).await }
        })
        .await?;

        let mut profile = match existing.into_iter().next() {
            Some(profile) => {
                debug!(profile_id = %profile.id, "Profile found");
                self.bump_login_count(&profile);
                profile
            }
            None => {
                let created = self.create_profile(identity).await?;
                info!(profile_id = %created.id, user_id = %identity.user_id, "Profile created");
                created
            }
        };

        // Refresh step runs for both branches; its failures never block
        // the already-resolved profile.
        if let Err(e) = self.refresh_directory_uid(identity, &mut profile).await {
            warn!(error = %e, "Directory uid refresh failed");
        }
        if let Err(e) = self.refresh_subjects(identity, &mut profile).await {
            warn!(error = %e, "Subject refresh failed");
        }

        Ok(Some(profile))
    }

    /// Increment the login counter without blocking the login path
    fn bump_login_count(&self, profile: &RemoteRecord) {
        let next = profile.int_field(fields::LOGIN_COUNT).unwrap_or(0) + 1;
        let store = self.store.clone();
        let retry_policy = self.retry.clone();
        let id = profile.id.clone();

        tokio::spawn(async move {
            let mut update = FieldMap::new();
            update.insert(fields::LOGIN_COUNT.into(), next.into());

            let result = retry::execute("login-count-update", &retry_policy, || {
                let store = store.clone();
                let id = id.clone();
                let update = update.clone();
                async move { store.update(collections::PROFILES, &id, update).await }
            })
            .await;

            if let Err(e) = result {
                warn!(profile_id = %id, error = %e, "Login counter update failed");
            }
        });
    }

    async fn create_profile(&self, identity: &UserIdentity) -> Result<RemoteRecord> {
        let mut new_fields = FieldMap::new();
        new_fields.insert(fields::USER_ID.into(), identity.user_id.as_str().into());
        new_fields.insert(fields::USER_NAME.into(), identity.user_name.as_str().into());
        new_fields.insert(fields::USER_EMAIL.into(), identity.user_email.as_str().into());
        new_fields.insert(fields::LOGIN_COUNT.into(), 1.into());

        // Connection fields come from the directory record when resolvable;
        // an unreachable directory leaves them absent, it is not an error.
        if let Some(directory) = self.find_directory(&identity.user_email).await {
            if let Some(org) = directory
                .fields
                .get(directory_fields::ORGANIZATION)
                .and_then(|v| resolve_reference_id(v))
            {
                new_fields.insert(fields::ORGANIZATION_ID.into(), org.into());
            }

            if let Some(groups) = directory.fields.get(directory_fields::GROUPS) {
                let ids = resolve_reference_ids(groups);
                if !ids.is_empty() {
                    new_fields.insert(
                        fields::GROUP_IDS.into(),
                        Value::Array(ids.into_iter().map(Value::String).collect()),
                    );
                }
            }

            if let Some(uid) = directory.str_field(directory_fields::UID) {
                new_fields.insert(fields::DIRECTORY_UID.into(), uid.into());
            }
        }

        let store = self.store.clone();
        retry::execute("profile-create", &self.retry, || {
            let store = store.clone();
            let new_fields = new_fields.clone();
            async move { store.create(collections::PROFILES, new_fields).await }
        })
        .await
    }

    async fn find_directory(&self, email: &str) -> Option<RemoteRecord> {
        if email.trim().is_empty() {
            return None;
        }

        let store = self.store.clone();
        let filter = FieldFilter::eq(directory_fields::EMAIL, email);
        let result = retry::execute("directory-query", &self.retry, || {
            let store = store.clone();
            let filter = filter.clone();
            async move { store.query(collections::DIRECTORY, &filter).await }
        })
        .await;

        match result {
            Ok(records) => records.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Directory lookup failed");
                None
            }
        }
    }

    /// Detect an updated directory uid and persist it onto the profile
    async fn refresh_directory_uid(
        &self,
        identity: &UserIdentity,
        profile: &mut RemoteRecord,
    ) -> Result<()> {
        let Some(directory) = self.find_directory(&identity.user_email).await else {
            return Ok(());
        };
        let Some(uid) = directory.str_field(directory_fields::UID) else {
            return Ok(());
        };

        if profile.str_field(fields::DIRECTORY_UID) == Some(uid) {
            return Ok(());
        }

        let mut update = FieldMap::new();
        update.insert(fields::DIRECTORY_UID.into(), uid.into());

        let store = self.store.clone();
        let id = profile.id.clone();
        retry::execute("directory-uid-update", &self.retry, || {
            let store = store.clone();
            let id = id.clone();
            let update = update.clone();
            async move { store.update(collections::PROFILES, &id, update).await }
        })
        .await?;

        debug!(profile_id = %profile.id, uid = uid, "Directory uid refreshed");
        profile
            .fields
            .insert(fields::DIRECTORY_UID.into(), uid.into());
        Ok(())
    }

    /// Rebuild the subject slots from the subject-records source.
    ///
    /// Runs on every login. All fifteen slots are overwritten, unused ones
    /// with an empty string, so a shrinking subject list cannot leave
    /// stale entries behind.
    async fn refresh_subjects(
        &self,
        identity: &UserIdentity,
        profile: &mut RemoteRecord,
    ) -> Result<()> {
        let store = self.store.clone();
        let filter = FieldFilter::eq(fields::USER_EMAIL, identity.user_email.as_str());
        let subjects = retry::execute("subject-query", &self.retry, || {
            let store = store.clone();
            let filter = filter.clone();
            async move { store.query(collections::SUBJECTS, &filter).await }
        })
        .await?;

        let mut update = FieldMap::new();
        for slot in 1..=MAX_SUBJECTS {
            let serialized = match subjects.get(slot - 1) {
                Some(subject) => serde_json::to_string(&subject.fields)?,
                None => String::new(),
            };
            update.insert(fields::subject_slot(slot), serialized.into());
        }

        let store = self.store.clone();
        let id = profile.id.clone();
        let update_clone = update.clone();
        retry::execute("subject-update", &self.retry, || {
            let store = store.clone();
            let id = id.clone();
            let update = update_clone.clone();
            async move { store.update(collections::PROFILES, &id, update).await }
        })
        .await?;

        debug!(
            profile_id = %profile.id,
            subjects = subjects.len().min(MAX_SUBJECTS),
            "Subject slots rebuilt"
        );
        for (field, value) in update {
            profile.fields.insert(field, value);
        }
        Ok(())
    }
}
