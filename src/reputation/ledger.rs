//! Reputation Ledger - atomic score changes with an append-only audit log
//!
//! Every change goes through [`ReputationStore::apply_adjustment`], which
//! clamps the running total at zero and writes the log entry in the same
//! transaction. Replaying a contributor's log with the same clamping therefore
//! reproduces the stored score.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ReputationConfig;
use crate::error::{StoreError, StoreResult};
use crate::models::{ActivitySummary, AdjustmentKind, ReputationAdjustment, ReputationLogEntry};
use crate::store::ReputationStore;

/// Reason recorded for rewarded verifications
pub const VERIFICATION_REASON: &str = "Successful verification";

/// Largest difference tolerated between a stored and a replayed score
const REPLAY_TOLERANCE: f64 = 1e-9;

/// Result of replaying a contributor's log against the stored score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerAudit {
    pub contributor_id: Uuid,
    pub stored_score: f64,
    pub replayed_score: f64,
    pub log_entries: usize,
}

impl LedgerAudit {
    pub fn is_consistent(&self) -> bool {
        (self.stored_score - self.replayed_score).abs() <= REPLAY_TOLERANCE
    }
}

/// Replay log changes in write order, clamping the running total at each step
pub fn replay<'a, I>(entries: I) -> f64
where
    I: IntoIterator<Item = &'a ReputationLogEntry>,
{
    entries
        .into_iter()
        .fold(0.0, |score, entry| (score + entry.change).max(0.0))
}

pub struct ReputationLedger {
    store: Arc<dyn ReputationStore>,
    clock: Arc<dyn Clock>,
    config: ReputationConfig,
}

impl ReputationLedger {
    pub fn new(
        store: Arc<dyn ReputationStore>,
        clock: Arc<dyn Clock>,
        config: ReputationConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Apply `delta` to the contributor's score and log it.
    ///
    /// Going below zero is not an error: the score clamps to 0.0 while the
    /// log keeps the requested delta verbatim.
    pub async fn adjust(
        &self,
        contributor_id: Uuid,
        delta: f64,
        reason: &str,
    ) -> StoreResult<ReputationAdjustment> {
        self.apply(contributor_id, delta, reason, AdjustmentKind::Plain)
            .await
    }

    /// Reward a verified contribution with the configured amount
    pub async fn record_successful_verification(
        &self,
        contributor_id: Uuid,
    ) -> StoreResult<ReputationAdjustment> {
        self.record_successful_verification_with(contributor_id, self.config.verification_reward)
            .await
    }

    pub async fn record_successful_verification_with(
        &self,
        contributor_id: Uuid,
        delta: f64,
    ) -> StoreResult<ReputationAdjustment> {
        let adjustment = self
            .apply(
                contributor_id,
                delta,
                VERIFICATION_REASON,
                AdjustmentKind::Contribution,
            )
            .await?;

        info!(
            contributor_id = %contributor_id,
            reward = delta,
            new_score = adjustment.new_score,
            "Recorded successful verification"
        );
        Ok(adjustment)
    }

    async fn apply(
        &self,
        contributor_id: Uuid,
        delta: f64,
        reason: &str,
        kind: AdjustmentKind,
    ) -> StoreResult<ReputationAdjustment> {
        if !delta.is_finite() {
            return Err(StoreError::Validation(format!(
                "reputation change must be finite, got {}",
                delta
            )));
        }

        let adjustment = self
            .store
            .apply_adjustment(contributor_id, delta, reason, kind, self.clock.now())
            .await?;

        debug!(
            contributor_id = %contributor_id,
            change = delta,
            reason = %reason,
            new_score = adjustment.new_score,
            "Reputation adjusted"
        );
        Ok(adjustment)
    }

    /// Most recent log entries, newest first
    pub async fn recent_activity(
        &self,
        contributor_id: Uuid,
        limit: u32,
    ) -> StoreResult<Vec<ReputationLogEntry>> {
        self.store.recent_log_entries(contributor_id, limit).await
    }

    /// Score, log size and the configured number of recent entries
    pub async fn activity_summary(&self, contributor_id: Uuid) -> StoreResult<ActivitySummary> {
        let contributor = self
            .store
            .get_contributor(contributor_id)
            .await?
            .ok_or_else(|| StoreError::not_found("contributor", contributor_id))?;

        let total_logs = self.store.count_log_entries(contributor_id).await?;
        let recent_activity = self
            .recent_activity(contributor_id, self.config.recent_activity_limit)
            .await?;

        Ok(ActivitySummary {
            reputation_score: contributor.reputation_score,
            total_logs,
            recent_activity,
        })
    }

    /// Replay one contributor's log and compare it with the stored score
    pub async fn verify_contributor(&self, contributor_id: Uuid) -> StoreResult<LedgerAudit> {
        let snapshot = self
            .store
            .ledger_snapshot(contributor_id)
            .await?
            .ok_or_else(|| StoreError::not_found("contributor", contributor_id))?;

        let audit = LedgerAudit {
            contributor_id,
            stored_score: snapshot.contributor.reputation_score,
            replayed_score: replay(&snapshot.entries),
            log_entries: snapshot.entries.len(),
        };

        if !audit.is_consistent() {
            warn!(
                contributor_id = %contributor_id,
                stored = audit.stored_score,
                replayed = audit.replayed_score,
                "Reputation score drifted from its log"
            );
        }
        Ok(audit)
    }

    /// Audit every contributor; returns only the inconsistent ones
    pub async fn verify_all(&self) -> StoreResult<Vec<LedgerAudit>> {
        let ids = self.store.list_contributor_ids().await?;
        let mut drifted = Vec::new();

        for id in &ids {
            let audit = self.verify_contributor(*id).await?;
            if !audit.is_consistent() {
                drifted.push(audit);
            }
        }

        info!(
            contributors = ids.len(),
            drifted = drifted.len(),
            "Ledger audit complete"
        );
        Ok(drifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};

    async fn setup() -> (ReputationLedger, Arc<MemoryStore>, Arc<ManualClock>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (contributor, _) = store
            .get_or_create_contributor(Uuid::new_v4(), "RepTester", clock.now())
            .await
            .unwrap();
        let ledger = ReputationLedger::new(store.clone(), clock.clone(), ReputationConfig::default());
        (ledger, store, clock, contributor.id)
    }

    #[test]
    fn test_replay_clamps_each_step() {
        let id = Uuid::nil();
        let now = Utc::now();
        let entries = vec![
            ReputationLogEntry::new(id, 3.0, "a", now),
            ReputationLogEntry::new(id, -5.0, "b", now),
            ReputationLogEntry::new(id, 2.0, "c", now),
        ];
        // Naive sum would be 0.0; clamping after -5 leaves 0 then +2
        assert_eq!(replay(&entries), 2.0);
        assert_eq!(replay(&Vec::<ReputationLogEntry>::new()), 0.0);
    }

    #[tokio::test]
    async fn test_adjust_accumulates() {
        let (ledger, _, _, id) = setup().await;

        ledger.adjust(id, 5.0, "First contribution").await.unwrap();
        let result = ledger.adjust(id, -2.0, "Rejected evidence").await.unwrap();

        assert_eq!(result.new_score, 3.0);
        assert_eq!(result.entry.change, -2.0);
        assert_eq!(result.entry.reason, "Rejected evidence");
    }

    #[tokio::test]
    async fn test_penalty_clamps_to_zero_and_logs_verbatim() {
        let (ledger, store, _, id) = setup().await;
        ledger.adjust(id, 3.0, "seed").await.unwrap();

        let result = ledger.adjust(id, -5.0, "penalty").await.unwrap();

        assert_eq!(result.new_score, 0.0);
        assert_eq!(result.previous_score, 3.0);
        assert!(result.was_clamped());
        assert_eq!(result.entry.change, -5.0);
        assert_eq!(store.count_log_entries(id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_non_finite_delta_rejected_without_log() {
        let (ledger, store, _, id) = setup().await;

        let err = ledger.adjust(id, f64::NAN, "bogus").await.unwrap_err();
        assert!(err.is_validation());
        let err = ledger.adjust(id, f64::INFINITY, "bogus").await.unwrap_err();
        assert!(err.is_validation());

        assert_eq!(store.count_log_entries(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overflowing_sum_rejected_and_audit_stays_clean() {
        let (ledger, store, _, id) = setup().await;

        ledger.adjust(id, f64::MAX, "large grant").await.unwrap();
        let err = ledger.adjust(id, f64::MAX, "large grant").await.unwrap_err();
        assert!(err.is_validation());

        let contributor = store.get_contributor(id).await.unwrap().unwrap();
        assert_eq!(contributor.reputation_score, f64::MAX);
        assert_eq!(store.count_log_entries(id).await.unwrap(), 1);

        let audit = ledger.verify_contributor(id).await.unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn test_successful_verification_rewards_and_counts() {
        let (ledger, store, clock, id) = setup().await;

        ledger.record_successful_verification(id).await.unwrap();
        clock.advance(Duration::minutes(5));
        let result = ledger.record_successful_verification(id).await.unwrap();

        assert!((result.new_score - 0.2).abs() < 1e-12);
        assert_eq!(result.entry.reason, VERIFICATION_REASON);

        let contributor = store.get_contributor(id).await.unwrap().unwrap();
        assert_eq!(contributor.total_contributions, 2);
        assert_eq!(contributor.last_contribution_at, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_activity_summary_limits_recent_entries() {
        let (ledger, _, clock, id) = setup().await;

        for i in 0..7 {
            ledger.adjust(id, 1.0, &format!("event {}", i)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }

        let summary = ledger.activity_summary(id).await.unwrap();
        assert_eq!(summary.reputation_score, 7.0);
        assert_eq!(summary.total_logs, 7);
        assert_eq!(summary.recent_activity.len(), 5);
        assert_eq!(summary.recent_activity[0].reason, "event 6");
        assert_eq!(summary.recent_activity[4].reason, "event 2");
    }

    #[tokio::test]
    async fn test_verify_contributor_is_consistent() {
        let (ledger, _, _, id) = setup().await;
        ledger.adjust(id, 1.5, "up").await.unwrap();
        ledger.adjust(id, -4.0, "down").await.unwrap();
        ledger.adjust(id, 0.25, "up again").await.unwrap();

        let audit = ledger.verify_contributor(id).await.unwrap();
        assert!(audit.is_consistent());
        assert_eq!(audit.log_entries, 3);
        assert_eq!(audit.stored_score, 0.25);

        assert!(ledger.verify_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_audit_during_concurrent_adjustments_reports_no_drift() {
        let (ledger, _, _, id) = setup().await;
        let ledger = Arc::new(ledger);

        let writer = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                for _ in 0..2000 {
                    ledger.adjust(id, 1.0, "steady").await.unwrap();
                }
            })
        };

        let mut drift = 0;
        for _ in 0..200 {
            if !ledger.verify_contributor(id).await.unwrap().is_consistent() {
                drift += 1;
            }
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        assert_eq!(drift, 0);
        let audit = ledger.verify_contributor(id).await.unwrap();
        assert_eq!(audit.log_entries, 2000);
        assert_eq!(audit.stored_score, 2000.0);
    }
}
