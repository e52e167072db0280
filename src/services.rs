//! Service wiring
//!
//! Builds the ledger and view services over one backend, chosen from
//! configuration the same way for the binary and for embedding callers.

use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::config::{redact_database_url, CivicConfig};
use crate::database::DatabasePool;
use crate::error::StoreResult;
use crate::reputation::{ContributorProvisioning, ReputationLedger};
use crate::store::{MemoryStore, ReputationStore, ViewStore};
use crate::views::{AntiAbuseGuard, ViewAnalytics, ViewEligibilityPolicy, ViewRecorder};

pub struct CivicServices {
    pub ledger: ReputationLedger,
    pub provisioning: ContributorProvisioning,
    pub recorder: ViewRecorder,
    pub policy: ViewEligibilityPolicy,
    pub analytics: ViewAnalytics,
}

impl CivicServices {
    pub fn new(
        reputation_store: Arc<dyn ReputationStore>,
        view_store: Arc<dyn ViewStore>,
        clock: Arc<dyn Clock>,
        config: &CivicConfig,
    ) -> Self {
        Self {
            ledger: ReputationLedger::new(
                reputation_store.clone(),
                clock.clone(),
                config.reputation.clone(),
            ),
            provisioning: ContributorProvisioning::new(reputation_store, clock.clone()),
            recorder: ViewRecorder::new(view_store.clone(), clock.clone()),
            policy: ViewEligibilityPolicy::new(AntiAbuseGuard::new(view_store.clone(), clock)),
            analytics: ViewAnalytics::new(view_store),
        }
    }

    /// Services backed by a fresh in-memory store
    pub fn in_memory(clock: Arc<dyn Clock>, config: &CivicConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let services = Self::new(store.clone(), store.clone(), clock, config);
        (services, store)
    }

    /// Services backed by PostgreSQL
    pub fn with_database(db: &DatabasePool, clock: Arc<dyn Clock>, config: &CivicConfig) -> Self {
        Self::new(db.contributors(), db.views(), clock, config)
    }

    /// Connect according to `config.database`, falling back to memory when
    /// PostgreSQL is disabled.
    pub async fn from_config(clock: Arc<dyn Clock>, config: &CivicConfig) -> StoreResult<Self> {
        if !config.database.postgres_enabled {
            info!("PostgreSQL disabled, using in-memory store");
            return Ok(Self::in_memory(clock, config).0);
        }

        info!(
            url = %redact_database_url(&config.database.postgres_url),
            "Connecting to PostgreSQL"
        );
        let db = DatabasePool::connect(&config.database).await?;
        db.init_schema().await?;
        Ok(Self::with_database(&db, clock, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::{ContentRef, UserIdentity};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_from_config_without_postgres() {
        let config = CivicConfig::default();
        let services = CivicServices::from_config(Arc::new(SystemClock), &config)
            .await
            .unwrap();

        let owner = services
            .provisioning
            .on_user_created(Uuid::new_v4(), "Owner")
            .await
            .unwrap();
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(owner.user_id));
        let viewer = UserIdentity::new(Uuid::new_v4());

        assert!(services
            .policy
            .record_if_eligible(&services.recorder, &claim, Some(&viewer), None)
            .await
            .unwrap());
        assert_eq!(services.analytics.view_count(&claim).await.unwrap(), 1);
    }
}
