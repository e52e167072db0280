//! Contributor provisioning
//!
//! The identity workflow calls [`ContributorProvisioning::on_user_created`]
//! right after it creates a user. The hook is idempotent: calling it again
//! for the same user returns the existing profile.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::models::Contributor;
use crate::store::ReputationStore;

const MAX_DISPLAY_NAME_LEN: usize = 100;

pub struct ContributorProvisioning {
    store: Arc<dyn ReputationStore>,
    clock: Arc<dyn Clock>,
}

impl ContributorProvisioning {
    pub fn new(store: Arc<dyn ReputationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn on_user_created(
        &self,
        user_id: Uuid,
        display_name: &str,
    ) -> StoreResult<Contributor> {
        let display_name = display_name.trim();
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(StoreError::Validation(format!(
                "display name longer than {} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }

        let (contributor, created) = self
            .store
            .get_or_create_contributor(user_id, display_name, self.clock.now())
            .await?;

        if created {
            info!(
                contributor_id = %contributor.id,
                user_id = %user_id,
                "Provisioned contributor profile"
            );
        }
        Ok(contributor)
    }
}
