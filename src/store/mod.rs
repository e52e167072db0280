//! Storage ports
//!
//! The ledger and view services talk to storage only through these traits.
//! Two backends implement them:
//! - [`crate::database`]: PostgreSQL via sqlx
//! - [`memory::MemoryStore`]: in-process fallback when PostgreSQL is disabled

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    AdjustmentKind, ContentView, Contributor, LedgerSnapshot, ReputationAdjustment,
    ReputationLogEntry, ViewKey, ViewerScope,
};

pub use memory::MemoryStore;

#[async_trait]
pub trait ReputationStore: Send + Sync {
    /// Return the contributor for `user_id`, creating it if missing.
    /// The flag is true when a new row was inserted.
    async fn get_or_create_contributor(
        &self,
        user_id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(Contributor, bool)>;

    async fn get_contributor(&self, contributor_id: Uuid) -> StoreResult<Option<Contributor>>;

    async fn get_contributor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Contributor>>;

    async fn list_contributor_ids(&self) -> StoreResult<Vec<Uuid>>;

    /// Apply `score = max(0, score + change)` and append the log entry as one
    /// atomic unit. Fails with `NotFound` without writing anything when the
    /// contributor does not exist, and with `Validation` when the new score
    /// would not be finite.
    async fn apply_adjustment(
        &self,
        contributor_id: Uuid,
        change: f64,
        reason: &str,
        kind: AdjustmentKind,
        at: DateTime<Utc>,
    ) -> StoreResult<ReputationAdjustment>;

    /// Contributor and full log from one point in time. No adjustment can
    /// land between the two reads.
    async fn ledger_snapshot(&self, contributor_id: Uuid) -> StoreResult<Option<LedgerSnapshot>>;

    /// Full history in the order it was written.
    async fn log_entries(&self, contributor_id: Uuid) -> StoreResult<Vec<ReputationLogEntry>>;

    /// Newest first.
    async fn recent_log_entries(
        &self,
        contributor_id: Uuid,
        limit: u32,
    ) -> StoreResult<Vec<ReputationLogEntry>>;

    async fn count_log_entries(&self, contributor_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Insert the view, or move `last_viewed` to `at` if the key exists.
    async fn upsert_view(&self, key: &ViewKey, at: DateTime<Utc>) -> StoreResult<()>;

    async fn get_view(&self, key: &ViewKey) -> StoreResult<Option<ContentView>>;

    /// Views first recorded at or after `since` for the given viewer.
    async fn count_views_since(&self, scope: ViewerScope, since: DateTime<Utc>)
        -> StoreResult<u64>;

    async fn count_views_for_content(&self, content_type: &str, object_id: Uuid)
        -> StoreResult<u64>;

    /// Distinct (user, ip) pairs that viewed the content.
    async fn count_unique_viewers(&self, content_type: &str, object_id: Uuid)
        -> StoreResult<u64>;
}
