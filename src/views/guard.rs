//! Anti-abuse guard: bounds how many views one viewer can register per hour.

use chrono::Duration;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::models::{UserIdentity, ViewerScope};
use crate::store::ViewStore;

/// Views a single viewer may register inside the window before being limited
pub const VIEW_RATE_LIMIT: u64 = 30;

/// Length of the trailing window, in minutes
pub const VIEW_RATE_WINDOW_MINUTES: i64 = 60;

pub struct AntiAbuseGuard {
    views: Arc<dyn ViewStore>,
    clock: Arc<dyn Clock>,
}

impl AntiAbuseGuard {
    pub fn new(views: Arc<dyn ViewStore>, clock: Arc<dyn Clock>) -> Self {
        Self { views, clock }
    }

    pub fn window() -> Duration {
        Duration::minutes(VIEW_RATE_WINDOW_MINUTES)
    }

    /// True when the viewer recorded more than [`VIEW_RATE_LIMIT`] views in
    /// the trailing window.
    ///
    /// A signed-in viewer is counted by user regardless of IP. Anonymous
    /// viewers are counted by IP. A viewer with neither is always limited.
    pub async fn is_rate_limited(
        &self,
        user: Option<&UserIdentity>,
        viewer_ip: Option<IpAddr>,
    ) -> StoreResult<bool> {
        let Some(scope) = ViewerScope::resolve(user, viewer_ip) else {
            debug!("Unattributable viewer, failing closed");
            return Ok(true);
        };

        let since = self.clock.now() - Self::window();
        let recent = self.views.count_views_since(scope, since).await?;
        let limited = recent > VIEW_RATE_LIMIT;

        if limited {
            match scope {
                ViewerScope::User(user_id) => {
                    warn!(user_id = %user_id, recent_views = recent, "View rate limit exceeded")
                }
                ViewerScope::Ip(ip) => {
                    warn!(viewer_ip = %mask_ip(&ip), recent_views = recent, "View rate limit exceeded")
                }
            }
        }

        Ok(limited)
    }
}

/// Keep the network part of an address for logs, drop the host part
pub fn mask_ip(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, _, _] = v4.octets();
            format!("{}.{}.x.x", a, b)
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            format!("{:x}:{:x}:{:x}::/48", segments[0], segments[1], segments[2])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{ContentRef, ViewKey};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn guard_with(store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> AntiAbuseGuard {
        AntiAbuseGuard::new(store.clone(), clock.clone())
    }

    #[tokio::test]
    async fn test_no_identity_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let guard = guard_with(&store, &clock);

        assert!(guard.is_rate_limited(None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_scope_ignores_ip() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let guard = guard_with(&store, &clock);
        let user = UserIdentity::new(Uuid::new_v4());

        // Same user hopping across IPs
        for i in 0..31u8 {
            let claim = ContentRef::new("claim", Uuid::new_v4(), None);
            let ip = IpAddr::from([127, 0, 0, i + 1]);
            let key = ViewKey::for_content(&claim, Some(user.id), Some(ip));
            store.insert_view_at(key, clock.now()).await.unwrap();
        }

        assert!(guard.is_rate_limited(Some(&user), None).await.unwrap());
        // Each of those IPs on its own carries only one view
        let ip = IpAddr::from([127, 0, 0, 1]);
        assert!(!guard.is_rate_limited(None, Some(ip)).await.unwrap());
    }

    #[tokio::test]
    async fn test_ip_scope_for_anonymous_viewers() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let guard = guard_with(&store, &clock);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        for _ in 0..30 {
            let claim = ContentRef::new("claim", Uuid::new_v4(), None);
            let key = ViewKey::for_content(&claim, None, Some(ip));
            store.insert_view_at(key, clock.now()).await.unwrap();
        }
        assert!(!guard.is_rate_limited(None, Some(ip)).await.unwrap());

        let claim = ContentRef::new("claim", Uuid::new_v4(), None);
        let key = ViewKey::for_content(&claim, None, Some(ip));
        store.insert_view_at(key, clock.now()).await.unwrap();
        assert!(guard.is_rate_limited(None, Some(ip)).await.unwrap());
    }

    #[test]
    fn test_mask_ip() {
        assert_eq!(mask_ip(&"192.168.1.100".parse().unwrap()), "192.168.x.x");
        assert_eq!(
            mask_ip(&"2001:db8:abcd:12::1".parse().unwrap()),
            "2001:db8:abcd::/48"
        );
    }
}
