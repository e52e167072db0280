//! In-memory store
//!
//! Used when PostgreSQL is disabled and throughout the test suite. A single
//! async mutex guards all state, so every trait call is atomic with respect
//! to every other call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    AdjustmentKind, ContentView, Contributor, LedgerSnapshot, ReputationAdjustment,
    ReputationLogEntry, ViewKey, ViewerScope,
};
use crate::store::{ReputationStore, ViewStore};

#[derive(Default)]
struct MemoryState {
    contributors: HashMap<Uuid, Contributor>,
    contributors_by_user: HashMap<Uuid, Uuid>,
    /// Append-only, in write order
    reputation_log: Vec<ReputationLogEntry>,
    views: HashMap<ViewKey, ContentView>,
}

impl MemoryState {
    fn entries_for(&self, contributor_id: Uuid) -> Vec<ReputationLogEntry> {
        self.reputation_log
            .iter()
            .filter(|e| e.contributor_id == contributor_id)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of view rows across all content.
    pub async fn view_row_count(&self) -> usize {
        self.state.lock().await.views.len()
    }

    /// Insert a view row with explicit timestamps, bypassing the upsert.
    /// Lets tests seed history that predates the current window.
    pub async fn insert_view_at(
        &self,
        key: ViewKey,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.views.contains_key(&key) {
            return Err(StoreError::Validation(
                "duplicate value violates unique constraint uq_content_view_identity".to_string(),
            ));
        }
        state.views.insert(
            key.clone(),
            ContentView {
                id: Uuid::new_v4(),
                key,
                created_at,
                last_viewed: created_at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ReputationStore for MemoryStore {
    async fn get_or_create_contributor(
        &self,
        user_id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(Contributor, bool)> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state
            .contributors_by_user
            .get(&user_id)
            .and_then(|id| state.contributors.get(id))
        {
            return Ok((existing.clone(), false));
        }

        let contributor = Contributor::new(user_id, display_name, now);
        state.contributors_by_user.insert(user_id, contributor.id);
        state.contributors.insert(contributor.id, contributor.clone());

        debug!(contributor_id = %contributor.id, user_id = %user_id, "Contributor created");
        Ok((contributor, true))
    }

    async fn get_contributor(&self, contributor_id: Uuid) -> StoreResult<Option<Contributor>> {
        Ok(self.state.lock().await.contributors.get(&contributor_id).cloned())
    }

    async fn get_contributor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Contributor>> {
        let state = self.state.lock().await;
        Ok(state
            .contributors_by_user
            .get(&user_id)
            .and_then(|id| state.contributors.get(id))
            .cloned())
    }

    async fn list_contributor_ids(&self) -> StoreResult<Vec<Uuid>> {
        let state = self.state.lock().await;
        let mut ids: Vec<Uuid> = state.contributors.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn apply_adjustment(
        &self,
        contributor_id: Uuid,
        change: f64,
        reason: &str,
        kind: AdjustmentKind,
        at: DateTime<Utc>,
    ) -> StoreResult<ReputationAdjustment> {
        let mut state = self.state.lock().await;

        let contributor = state
            .contributors
            .get_mut(&contributor_id)
            .ok_or_else(|| StoreError::not_found("contributor", contributor_id))?;

        let previous_score = contributor.reputation_score;
        let unclamped = previous_score + change;
        if !unclamped.is_finite() {
            return Err(StoreError::Validation(format!(
                "reputation score out of range: {} + {}",
                previous_score, change
            )));
        }

        contributor.reputation_score = unclamped.max(0.0);
        contributor.updated_at = at;
        if kind == AdjustmentKind::Contribution {
            contributor.total_contributions += 1;
            contributor.last_contribution_at = Some(at);
        }
        let new_score = contributor.reputation_score;

        let entry = ReputationLogEntry::new(contributor_id, change, reason, at);
        state.reputation_log.push(entry.clone());

        Ok(ReputationAdjustment {
            contributor_id,
            previous_score,
            new_score,
            entry,
        })
    }

    async fn ledger_snapshot(&self, contributor_id: Uuid) -> StoreResult<Option<LedgerSnapshot>> {
        let state = self.state.lock().await;
        let Some(contributor) = state.contributors.get(&contributor_id) else {
            return Ok(None);
        };

        Ok(Some(LedgerSnapshot {
            contributor: contributor.clone(),
            entries: state.entries_for(contributor_id),
        }))
    }

    async fn log_entries(&self, contributor_id: Uuid) -> StoreResult<Vec<ReputationLogEntry>> {
        Ok(self.state.lock().await.entries_for(contributor_id))
    }

    async fn recent_log_entries(
        &self,
        contributor_id: Uuid,
        limit: u32,
    ) -> StoreResult<Vec<ReputationLogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .reputation_log
            .iter()
            .rev()
            .filter(|e| e.contributor_id == contributor_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_log_entries(&self, contributor_id: Uuid) -> StoreResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .reputation_log
            .iter()
            .filter(|e| e.contributor_id == contributor_id)
            .count() as u64)
    }
}

#[async_trait]
impl ViewStore for MemoryStore {
    async fn upsert_view(&self, key: &ViewKey, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .views
            .entry(key.clone())
            .and_modify(|view| view.last_viewed = at)
            .or_insert_with(|| ContentView {
                id: Uuid::new_v4(),
                key: key.clone(),
                created_at: at,
                last_viewed: at,
            });
        Ok(())
    }

    async fn get_view(&self, key: &ViewKey) -> StoreResult<Option<ContentView>> {
        Ok(self.state.lock().await.views.get(key).cloned())
    }

    async fn count_views_since(
        &self,
        scope: ViewerScope,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .views
            .values()
            .filter(|v| v.created_at >= since && v.key.matches_scope(&scope))
            .count() as u64)
    }

    async fn count_views_for_content(
        &self,
        content_type: &str,
        object_id: Uuid,
    ) -> StoreResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .views
            .keys()
            .filter(|k| k.content_type == content_type && k.object_id == object_id)
            .count() as u64)
    }

    async fn count_unique_viewers(
        &self,
        content_type: &str,
        object_id: Uuid,
    ) -> StoreResult<u64> {
        let state = self.state.lock().await;
        let viewers: HashSet<(Option<Uuid>, Option<IpAddr>)> = state
            .views
            .keys()
            .filter(|k| k.content_type == content_type && k.object_id == object_id)
            .map(|k| (k.user_id, k.viewer_ip))
            .collect();
        Ok(viewers.len() as u64)
    }
}
