//! Sequential verification flow with best-effort dual writes
//!
//! Drives the required onboarding steps in order. Completing a step
//! persists its flag(s) to two backing records: the account record
//! (primary, must succeed) and the directory record (secondary, attempted;
//! failure is logged and never blocks progression or rolls back the
//! primary). Only once every required step is complete does the flow
//! report cleared; initialization gated on it must stay deferred until
//! then.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::retry::{self, RetryPolicy};
use crate::store::RecordStore;
use crate::types::{FieldMap, RemoteRecord, Result};
use crate::verification::flags::{account_fields, VerificationFlags, VerificationStep};

/// Collection holding account records
pub const ACCOUNTS: &str = "accounts";
/// Collection holding directory records (secondary write target)
pub const DIRECTORY: &str = "directory";

/// Sequential onboarding flow for one account
pub struct VerificationFlow {
    store: Arc<dyn RecordStore>,
    retry: RetryPolicy,
    account_id: String,
    directory_id: Option<String>,
    flags: VerificationFlags,
    remaining: Vec<VerificationStep>,
}

impl VerificationFlow {
    /// Derive the flow from a loaded account record. `directory_id` is the
    /// secondary write target when known.
    pub fn new(
        store: Arc<dyn RecordStore>,
        retry: RetryPolicy,
        account: &RemoteRecord,
        directory_id: Option<String>,
    ) -> Self {
        let flags = VerificationFlags::from_record(account);
        let remaining = flags.required_steps();

        if !remaining.is_empty() {
            info!(
                account_id = %account.id,
                steps = remaining.len(),
                "Verification steps required"
            );
        }

        Self {
            store,
            retry,
            account_id: account.id.clone(),
            directory_id,
            flags,
            remaining,
        }
    }

    /// Current flag state
    pub fn flags(&self) -> &VerificationFlags {
        &self.flags
    }

    /// Whether every required step has completed
    pub fn is_cleared(&self) -> bool {
        self.remaining.is_empty()
    }

    /// The step to present next, if any
    pub fn next_step(&self) -> Option<VerificationStep> {
        self.remaining.first().copied()
    }

    /// Steps still outstanding, in presentation order
    pub fn remaining_steps(&self) -> &[VerificationStep] {
        &self.remaining
    }

    /// Complete a step: persist its flag(s) to both backing records and
    /// advance the flow. The primary (account) write must succeed; the
    /// secondary (directory) write is best-effort.
    pub async fn complete_step(&mut self, step: VerificationStep) -> Result<()> {
        let update = step_update(step);

        let store = self.store.clone();
        let account_id = self.account_id.clone();
        let update_clone = update.clone();
        retry::execute("verification-account-update", &self.retry, || {
            let store = store.clone();
            let account_id = account_id.clone();
            let update = update_clone.clone();
            async move { store.update(ACCOUNTS, &account_id, update).await }
        })
        .await?;

        // Secondary write: attempted, never rolled back, never blocking.
        if let Some(directory_id) = &self.directory_id {
            let store = self.store.clone();
            let directory_id_clone = directory_id.clone();
            let update_clone = update.clone();
            let result = retry::execute("verification-directory-update", &self.retry, || {
                let store = store.clone();
                let directory_id = directory_id_clone.clone();
                let update = update_clone.clone();
                async move { store.update(DIRECTORY, &directory_id, update).await }
            })
            .await;

            if let Err(e) = result {
                warn!(
                    directory_id = %directory_id,
                    error = %e,
                    "Secondary verification write failed; continuing"
                );
            }
        }

        self.flags.apply(step);
        self.remaining.retain(|s| *s != step);

        debug!(
            account_id = %self.account_id,
            step = ?step,
            remaining = self.remaining.len(),
            "Verification step completed"
        );

        if self.is_cleared() {
            info!(account_id = %self.account_id, "Verification cleared");
        }
        Ok(())
    }
}

/// Field update persisted for a completed step
fn step_update(step: VerificationStep) -> FieldMap {
    let mut update = FieldMap::new();
    match step {
        VerificationStep::PrivacyAcceptance => {
            update.insert(account_fields::PRIVACY_ACCEPTED.into(), Value::Bool(true));
        }
        VerificationStep::PasswordReset => {
            update.insert(account_fields::PASSWORD_RESET.into(), Value::Bool(true));
            update.insert(account_fields::VERIFIED.into(), Value::Bool(true));
        }
    }
    update
}
