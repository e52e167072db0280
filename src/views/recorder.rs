//! View recorder: one row per (content, user, ip), refreshed on every repeat.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::models::{Content, UserIdentity, ViewKey};
use crate::store::ViewStore;

pub struct ViewRecorder {
    views: Arc<dyn ViewStore>,
    clock: Arc<dyn Clock>,
}

impl ViewRecorder {
    pub fn new(views: Arc<dyn ViewStore>, clock: Arc<dyn Clock>) -> Self {
        Self { views, clock }
    }

    /// Upsert the view keyed by content, user and IP. A missing user or IP is
    /// part of the key, so an anonymous view and a signed-in view from the
    /// same address are separate rows.
    pub async fn record<C: Content + ?Sized>(
        &self,
        content: &C,
        user: Option<&UserIdentity>,
        viewer_ip: Option<IpAddr>,
    ) -> StoreResult<()> {
        let key = ViewKey::for_content(content, user.map(|u| u.id), viewer_ip);
        self.views.upsert_view(&key, self.clock.now()).await?;

        debug!(
            content_type = %key.content_type,
            object_id = %key.object_id,
            signed_in = key.user_id.is_some(),
            "Recorded content view"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::ContentRef;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_repeat_view_updates_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let recorder = ViewRecorder::new(store.clone(), clock.clone());

        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(Uuid::new_v4()));
        let user = UserIdentity::new(Uuid::new_v4());
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        recorder.record(&claim, Some(&user), Some(ip)).await.unwrap();
        let first_seen = clock.now();
        clock.advance(Duration::minutes(10));
        recorder.record(&claim, Some(&user), Some(ip)).await.unwrap();

        assert_eq!(store.view_row_count().await, 1);
        let key = ViewKey::for_content(&claim, Some(user.id), Some(ip));
        let view = store.get_view(&key).await.unwrap().unwrap();
        assert_eq!(view.created_at, first_seen);
        assert_eq!(view.last_viewed, clock.now());
    }

    #[tokio::test]
    async fn test_identity_axes_are_independent() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ViewRecorder::new(store.clone(), Arc::new(ManualClock::default()));

        let claim = ContentRef::new("claim", Uuid::new_v4(), None);
        let user = UserIdentity::new(Uuid::new_v4());
        let ip: IpAddr = "10.1.2.3".parse().unwrap();

        recorder.record(&claim, None, Some(ip)).await.unwrap();
        recorder.record(&claim, Some(&user), Some(ip)).await.unwrap();
        recorder.record(&claim, Some(&user), None).await.unwrap();
        recorder.record(&claim, None, Some(ip)).await.unwrap();

        assert_eq!(store.view_row_count().await, 3);
    }
}
