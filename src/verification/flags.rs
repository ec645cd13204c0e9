//! Verification flags and required-step derivation
//!
//! Three independent booleans persisted on the account record. Each flips
//! exactly once from false to true by its onboarding step and is never
//! reset; the required-steps set is derived from the combination, not
//! stored anywhere.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::RemoteRecord;

/// Field identifiers on the account record
pub mod account_fields {
    pub const VERIFIED: &str = "verified";
    pub const PRIVACY_ACCEPTED: &str = "privacy_accepted";
    pub const PASSWORD_RESET: &str = "password_reset";
}

/// An onboarding step the user must complete before proceeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStep {
    /// Accept the privacy terms
    PrivacyAcceptance,
    /// Reset the initial password (also marks the account verified)
    PasswordReset,
}

/// Persisted onboarding state of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub verified: bool,
    pub privacy_accepted: bool,
    pub password_reset: bool,
}

impl VerificationFlags {
    pub fn new(verified: bool, privacy_accepted: bool, password_reset: bool) -> Self {
        Self {
            verified,
            privacy_accepted,
            password_reset,
        }
    }

    /// Read the flags off an account record; absent fields read as false
    pub fn from_record(record: &RemoteRecord) -> Self {
        Self {
            verified: record.bool_field(account_fields::VERIFIED),
            privacy_accepted: record.bool_field(account_fields::PRIVACY_ACCEPTED),
            password_reset: record.bool_field(account_fields::PASSWORD_RESET),
        }
    }

    /// Terminal state: every flag set
    pub fn is_complete(&self) -> bool {
        self.verified && self.privacy_accepted && self.password_reset
    }

    /// Derive the required onboarding steps, privacy first when both.
    ///
    /// The designed combinations map directly; anything else is a
    /// data-integrity anomaly handled by requiring whichever of the two
    /// steps is individually false.
    pub fn required_steps(&self) -> Vec<VerificationStep> {
        use VerificationStep::*;

        match (self.verified, self.privacy_accepted, self.password_reset) {
            (false, false, false) => vec![PrivacyAcceptance, PasswordReset],
            (true, false, true) => vec![PrivacyAcceptance],
            (false, true, false) => vec![PasswordReset],
            (true, true, true) => vec![],
            other => {
                warn!(
                    flags = ?other,
                    "Inconsistent verification flags, falling back to per-flag requirements"
                );
                let mut steps = Vec::new();
                if !self.privacy_accepted {
                    steps.push(PrivacyAcceptance);
                }
                if !self.password_reset {
                    steps.push(PasswordReset);
                }
                steps
            }
        }
    }

    /// Apply a completed step. Transitions are monotonic: flags only ever
    /// flip false -> true.
    pub fn apply(&mut self, step: VerificationStep) {
        match step {
            VerificationStep::PrivacyAcceptance => {
                self.privacy_accepted = true;
            }
            VerificationStep::PasswordReset => {
                self.password_reset = true;
                self.verified = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VerificationStep::*;

    #[test]
    fn test_first_time_user_requires_both_privacy_first() {
        let flags = VerificationFlags::new(false, false, false);
        assert_eq!(flags.required_steps(), vec![PrivacyAcceptance, PasswordReset]);
    }

    #[test]
    fn test_designed_single_step_combinations() {
        assert_eq!(
            VerificationFlags::new(true, false, true).required_steps(),
            vec![PrivacyAcceptance]
        );
        assert_eq!(
            VerificationFlags::new(false, true, false).required_steps(),
            vec![PasswordReset]
        );
    }

    #[test]
    fn test_complete_account_requires_nothing() {
        let flags = VerificationFlags::new(true, true, true);
        assert!(flags.required_steps().is_empty());
        assert!(flags.is_complete());
    }

    #[test]
    fn test_anomalous_combinations_fall_back_per_flag() {
        // verified set but nothing else: not a designed transition
        assert_eq!(
            VerificationFlags::new(true, false, false).required_steps(),
            vec![PrivacyAcceptance, PasswordReset]
        );
        // everything but verified
        assert_eq!(
            VerificationFlags::new(false, true, true).required_steps(),
            Vec::<VerificationStep>::new()
        );
        assert_eq!(
            VerificationFlags::new(true, true, false).required_steps(),
            vec![PasswordReset]
        );
        assert_eq!(
            VerificationFlags::new(false, false, true).required_steps(),
            vec![PrivacyAcceptance]
        );
    }

    #[test]
    fn test_transition_sequence_is_monotonic() {
        let mut flags = VerificationFlags::new(false, false, false);

        flags.apply(PrivacyAcceptance);
        assert_eq!(flags, VerificationFlags::new(false, true, false));
        assert_eq!(flags.required_steps(), vec![PasswordReset]);

        flags.apply(PasswordReset);
        assert_eq!(flags, VerificationFlags::new(true, true, true));
        assert!(flags.required_steps().is_empty());

        // Re-applying never un-sets anything
        flags.apply(PrivacyAcceptance);
        flags.apply(PasswordReset);
        assert!(flags.is_complete());
    }
}
