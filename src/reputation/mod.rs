//! Contributor Reputation
//!
//! Contributors earn and lose reputation through discrete, logged events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────┐
//! │ ContributorProvisioning  │────►│ ReputationStore  │
//! │ (post-user-creation hook)│     │ (profiles + log) │
//! └──────────────────────────┘     └──────────────────┘
//!                                           ▲
//!                                           │ apply_adjustment
//!                                  ┌──────────────────┐
//!                                  │ ReputationLedger │
//!                                  └──────────────────┘
//! ```
//!
//! ## Score Model
//!
//! - New contributors start at 0.0
//! - Every change is `score = max(0, score + delta)` plus one log entry
//! - Log entries keep the requested delta, even when the score clamped
//! - Replaying the log with the same clamping yields the stored score

mod ledger;
mod provisioning;

pub use ledger::{replay, LedgerAudit, ReputationLedger, VERIFICATION_REASON};
pub use provisioning::ContributorProvisioning;
