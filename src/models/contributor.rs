//! Contributor profile and reputation audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-linked profile accruing reputation from platform activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: Uuid,

    /// Owning user (one-to-one)
    pub user_id: Uuid,

    pub display_name: String,
    pub bio: Option<String>,

    /// Clamped running total of all logged changes, never negative
    pub reputation_score: f64,

    pub is_active: bool,

    /// Verified contributions rewarded so far
    pub total_contributions: i64,
    pub last_contribution_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contributor {
    pub fn new(user_id: Uuid, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            display_name: display_name.into(),
            bio: None,
            reputation_score: 0.0,
            is_active: true,
            total_contributions: 0,
            last_contribution_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable audit record written alongside every score change.
///
/// `change` is stored exactly as requested, even when the score it produced
/// was clamped at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationLogEntry {
    pub id: Uuid,
    pub contributor_id: Uuid,
    pub change: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl ReputationLogEntry {
    pub fn new(
        contributor_id: Uuid,
        change: f64,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contributor_id,
            change,
            reason: reason.into(),
            created_at,
        }
    }
}

/// Extra bookkeeping applied in the same transaction as a score change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdjustmentKind {
    /// Plain reputation change
    #[default]
    Plain,
    /// Rewarded verification: also bumps the contribution counters
    Contribution,
}

/// Result of an atomic score change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReputationAdjustment {
    pub contributor_id: Uuid,
    /// Score read under the same lock that applied the change
    pub previous_score: f64,
    pub new_score: f64,
    pub entry: ReputationLogEntry,
}

impl ReputationAdjustment {
    /// Whether the requested change was cut short by the zero floor
    pub fn was_clamped(&self) -> bool {
        self.previous_score + self.entry.change < 0.0
    }
}

/// A contributor row and its full log, read as one consistent unit
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub contributor: Contributor,
    /// Write order
    pub entries: Vec<ReputationLogEntry>,
}

/// Reputation overview shown on a contributor's dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub reputation_score: f64,
    pub total_logs: u64,
    pub recent_activity: Vec<ReputationLogEntry>,
}
