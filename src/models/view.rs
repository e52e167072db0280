//! Content views and the identities they are keyed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Authenticated user as supplied by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub is_locked_out: bool,
}

impl UserIdentity {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_locked_out: false,
        }
    }

    pub fn locked_out(id: Uuid) -> Self {
        Self {
            id,
            is_locked_out: true,
        }
    }
}

/// Anything that can be viewed: claims, evidence, profiles.
pub trait Content {
    /// Stable type label, e.g. `"claim"`
    fn content_type(&self) -> &str;
    fn id(&self) -> Uuid;
    /// User that created the content, if known
    fn created_by_id(&self) -> Option<Uuid>;
}

/// Plain reference to a piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub content_type: String,
    pub id: Uuid,
    pub created_by_id: Option<Uuid>,
}

impl ContentRef {
    pub fn new(content_type: impl Into<String>, id: Uuid, created_by_id: Option<Uuid>) -> Self {
        Self {
            content_type: content_type.into(),
            id,
            created_by_id,
        }
    }
}

impl Content for ContentRef {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_by_id(&self) -> Option<Uuid> {
        self.created_by_id
    }
}

/// Dedup key of a content view. A missing user or IP is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewKey {
    pub content_type: String,
    pub object_id: Uuid,
    pub user_id: Option<Uuid>,
    pub viewer_ip: Option<IpAddr>,
}

impl ViewKey {
    pub fn for_content<C: Content + ?Sized>(
        content: &C,
        user_id: Option<Uuid>,
        viewer_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            content_type: content.content_type().to_string(),
            object_id: content.id(),
            user_id,
            viewer_ip,
        }
    }

    /// Whether this view is attributed to the given viewer scope
    pub fn matches_scope(&self, scope: &ViewerScope) -> bool {
        match scope {
            ViewerScope::User(id) => self.user_id == Some(*id),
            ViewerScope::Ip(ip) => self.viewer_ip == Some(*ip),
        }
    }
}

/// Persisted, de-duplicated view record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentView {
    pub id: Uuid,
    pub key: ViewKey,
    /// First time this viewer saw the content
    pub created_at: DateTime<Utc>,
    pub last_viewed: DateTime<Utc>,
}

/// Identity axis used when counting a viewer's recent views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerScope {
    User(Uuid),
    Ip(IpAddr),
}

impl ViewerScope {
    /// User wins over IP; anonymous viewers without an IP have no scope.
    pub fn resolve(user: Option<&UserIdentity>, viewer_ip: Option<IpAddr>) -> Option<Self> {
        match (user, viewer_ip) {
            (Some(user), _) => Some(Self::User(user.id)),
            (None, Some(ip)) => Some(Self::Ip(ip)),
            (None, None) => None,
        }
    }
}
