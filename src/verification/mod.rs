//! Account verification gate
//!
//! Required onboarding steps are derived from three persisted flags, never
//! stored directly. The flow presents steps sequentially and persists each
//! completion to two backing records (best-effort dual write).

pub mod flags;
pub mod flow;

pub use flags::{account_fields, VerificationFlags, VerificationStep};
pub use flow::{VerificationFlow, ACCOUNTS, DIRECTORY};
