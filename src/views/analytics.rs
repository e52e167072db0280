//! Per-content view statistics for reporting.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::Content;
use crate::store::ViewStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub content_type: String,
    pub object_id: Uuid,
    pub view_count: u64,
    pub unique_viewers: u64,
}

pub struct ViewAnalytics {
    views: Arc<dyn ViewStore>,
}

impl ViewAnalytics {
    pub fn new(views: Arc<dyn ViewStore>) -> Self {
        Self { views }
    }

    /// Number of de-duplicated view rows for the content
    pub async fn view_count<C: Content + ?Sized>(&self, content: &C) -> StoreResult<u64> {
        self.views
            .count_views_for_content(content.content_type(), content.id())
            .await
    }

    /// Number of distinct (user, ip) viewers of the content
    pub async fn unique_viewers<C: Content + ?Sized>(&self, content: &C) -> StoreResult<u64> {
        self.views
            .count_unique_viewers(content.content_type(), content.id())
            .await
    }

    pub async fn stats<C: Content + ?Sized>(&self, content: &C) -> StoreResult<ViewStats> {
        Ok(ViewStats {
            content_type: content.content_type().to_string(),
            object_id: content.id(),
            view_count: self.view_count(content).await?,
            unique_viewers: self.unique_viewers(content).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{ContentRef, UserIdentity};
    use crate::store::MemoryStore;
    use crate::views::ViewRecorder;
    use std::net::IpAddr;

    #[tokio::test]
    async fn test_view_count_per_content() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ViewRecorder::new(store.clone(), Arc::new(ManualClock::default()));
        let analytics = ViewAnalytics::new(store.clone());

        let claim = ContentRef::new("claim", Uuid::new_v4(), None);
        let other = ContentRef::new("claim", Uuid::new_v4(), None);
        let first: IpAddr = "127.0.0.1".parse().unwrap();
        let second: IpAddr = "127.0.0.2".parse().unwrap();

        recorder.record(&claim, None, Some(first)).await.unwrap();
        recorder.record(&claim, None, Some(second)).await.unwrap();
        recorder.record(&claim, None, Some(second)).await.unwrap();
        recorder.record(&other, None, Some(first)).await.unwrap();

        assert_eq!(analytics.view_count(&claim).await.unwrap(), 2);
        assert_eq!(analytics.view_count(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats_counts_unique_viewers() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ViewRecorder::new(store.clone(), Arc::new(ManualClock::default()));
        let analytics = ViewAnalytics::new(store.clone());

        let claim = ContentRef::new("claim", Uuid::new_v4(), None);
        let user = UserIdentity::new(Uuid::new_v4());
        let ip: IpAddr = "192.0.2.7".parse().unwrap();

        recorder.record(&claim, Some(&user), Some(ip)).await.unwrap();
        recorder.record(&claim, None, Some(ip)).await.unwrap();
        recorder.record(&claim, Some(&user), Some(ip)).await.unwrap();

        let stats = analytics.stats(&claim).await.unwrap();
        assert_eq!(stats.view_count, 2);
        assert_eq!(stats.unique_viewers, 2);
    }
}
