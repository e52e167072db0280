//! View eligibility: decides whether a view earns credit for its content.

use std::net::IpAddr;
use tracing::debug;

use crate::error::StoreResult;
use crate::models::{Content, UserIdentity};
use crate::views::guard::AntiAbuseGuard;
use crate::views::recorder::ViewRecorder;

/// Why a view was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDenial {
    /// Viewer owns the content, or the content is the viewer's own record
    SelfView,
    /// Viewer account is locked out
    LockedOut,
    /// Neither a user nor an IP is available
    Unattributable,
    /// Viewer exceeded the hourly view budget
    RateLimited,
}

impl ViewDenial {
    pub fn description(&self) -> &'static str {
        match self {
            ViewDenial::SelfView => "viewer owns the content",
            ViewDenial::LockedOut => "viewer is locked out",
            ViewDenial::Unattributable => "anonymous view without an IP address",
            ViewDenial::RateLimited => "viewer exceeded the view rate limit",
        }
    }
}

pub struct ViewEligibilityPolicy {
    guard: AntiAbuseGuard,
}

impl ViewEligibilityPolicy {
    pub fn new(guard: AntiAbuseGuard) -> Self {
        Self { guard }
    }

    /// Evaluate the checks in order and stop at the first failure.
    ///
    /// Has no side effects; recording is up to the caller.
    pub async fn evaluate<C: Content + ?Sized>(
        &self,
        content: &C,
        user: Option<&UserIdentity>,
        viewer_ip: Option<IpAddr>,
    ) -> StoreResult<Option<ViewDenial>> {
        if let Some(user) = user {
            if content.id() == user.id || content.created_by_id() == Some(user.id) {
                return Ok(Some(ViewDenial::SelfView));
            }

            if user.is_locked_out {
                return Ok(Some(ViewDenial::LockedOut));
            }
        }

        if user.is_none() && viewer_ip.is_none() {
            return Ok(Some(ViewDenial::Unattributable));
        }

        if self.guard.is_rate_limited(user, viewer_ip).await? {
            return Ok(Some(ViewDenial::RateLimited));
        }

        Ok(None)
    }

    pub async fn should_count_view<C: Content + ?Sized>(
        &self,
        content: &C,
        user: Option<&UserIdentity>,
        viewer_ip: Option<IpAddr>,
    ) -> StoreResult<bool> {
        Ok(self.evaluate(content, user, viewer_ip).await?.is_none())
    }

    /// Record the view only when it is eligible. Returns whether it counted.
    pub async fn record_if_eligible<C: Content + ?Sized>(
        &self,
        recorder: &ViewRecorder,
        content: &C,
        user: Option<&UserIdentity>,
        viewer_ip: Option<IpAddr>,
    ) -> StoreResult<bool> {
        match self.evaluate(content, user, viewer_ip).await? {
            Some(denial) => {
                debug!(
                    content_type = %content.content_type(),
                    object_id = %content.id(),
                    reason = denial.description(),
                    "View not counted"
                );
                Ok(false)
            }
            None => {
                recorder.record(content, user, viewer_ip).await?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::models::{ContentRef, ViewKey};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        policy: ViewEligibilityPolicy,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let policy = ViewEligibilityPolicy::new(AntiAbuseGuard::new(store.clone(), clock.clone()));
        Fixture {
            store,
            clock,
            policy,
        }
    }

    #[tokio::test]
    async fn test_owner_view_denied_regardless_of_ip() {
        let f = fixture();
        let owner = UserIdentity::new(Uuid::new_v4());
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(owner.id));

        for ip in [None, Some("127.0.0.1".parse().unwrap())] {
            let decision = f.policy.evaluate(&claim, Some(&owner), ip).await.unwrap();
            assert_eq!(decision, Some(ViewDenial::SelfView));
        }
    }

    #[tokio::test]
    async fn test_own_profile_view_denied() {
        let f = fixture();
        let user = UserIdentity::new(Uuid::new_v4());
        let profile = ContentRef::new("user", user.id, None);

        assert!(!f
            .policy
            .should_count_view(&profile, Some(&user), Some("127.0.0.1".parse().unwrap()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_self_view_checked_before_lockout() {
        let f = fixture();
        let owner = UserIdentity::locked_out(Uuid::new_v4());
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(owner.id));

        let decision = f.policy.evaluate(&claim, Some(&owner), None).await.unwrap();
        assert_eq!(decision, Some(ViewDenial::SelfView));
    }

    #[tokio::test]
    async fn test_locked_out_viewer_denied() {
        let f = fixture();
        let viewer = UserIdentity::locked_out(Uuid::new_v4());
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(Uuid::new_v4()));

        let decision = f.policy.evaluate(&claim, Some(&viewer), None).await.unwrap();
        assert_eq!(decision, Some(ViewDenial::LockedOut));
    }

    #[tokio::test]
    async fn test_unattributable_view_denied() {
        let f = fixture();
        let claim = ContentRef::new("claim", Uuid::new_v4(), None);

        let decision = f.policy.evaluate(&claim, None, None).await.unwrap();
        assert_eq!(decision, Some(ViewDenial::Unattributable));
    }

    #[tokio::test]
    async fn test_anonymous_view_with_ip_counts() {
        let f = fixture();
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(Uuid::new_v4()));

        assert!(f
            .policy
            .should_count_view(&claim, None, Some("127.0.0.1".parse().unwrap()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_rate_limited_viewer_denied() {
        let f = fixture();
        let viewer = UserIdentity::new(Uuid::new_v4());
        for _ in 0..31 {
            let other = ContentRef::new("claim", Uuid::new_v4(), None);
            let key = ViewKey::for_content(&other, Some(viewer.id), None);
            f.store.insert_view_at(key, f.clock.now()).await.unwrap();
        }

        let claim = ContentRef::new("claim", Uuid::new_v4(), None);
        let decision = f.policy.evaluate(&claim, Some(&viewer), None).await.unwrap();
        assert_eq!(decision, Some(ViewDenial::RateLimited));
    }

    #[tokio::test]
    async fn test_record_if_eligible_skips_denied_views() {
        let f = fixture();
        let recorder = ViewRecorder::new(f.store.clone(), f.clock.clone());
        let owner = UserIdentity::new(Uuid::new_v4());
        let claim = ContentRef::new("claim", Uuid::new_v4(), Some(owner.id));

        let counted = f
            .policy
            .record_if_eligible(&recorder, &claim, Some(&owner), None)
            .await
            .unwrap();
        assert!(!counted);
        assert_eq!(f.store.view_row_count().await, 0);

        let counted = f
            .policy
            .record_if_eligible(&recorder, &claim, None, Some("198.51.100.4".parse().unwrap()))
            .await
            .unwrap();
        assert!(counted);
        assert_eq!(f.store.view_row_count().await, 1);
    }
}
