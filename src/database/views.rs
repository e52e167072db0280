//! Content View Repository - de-duplicated view rows in PostgreSQL

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::net::IpAddr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{ContentView, ViewKey, ViewerScope};
use crate::store::ViewStore;

pub struct ContentViewRepository {
    pool: PgPool,
}

impl ContentViewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize views schema and tables
    ///
    /// The identity constraint uses `NULLS NOT DISTINCT` so that anonymous
    /// rows (null user) and IP-less rows still collide on upsert. Requires
    /// PostgreSQL 15 or newer.
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing views schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS views")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS views.content_views (
                id UUID PRIMARY KEY,
                content_type VARCHAR(100) NOT NULL,
                object_id UUID NOT NULL,
                user_id UUID,
                viewer_ip VARCHAR(45),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                last_viewed TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_content_view_identity
                    UNIQUE NULLS NOT DISTINCT (content_type, object_id, user_id, viewer_ip)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_views_user_window \
             ON views.content_views(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_views_ip_window \
             ON views.content_views(viewer_ip, created_at)",
        )
        .execute(&self.pool)
        .await?;

        info!("Views schema initialized");
        Ok(())
    }
}

fn view_from_row(row: &PgRow) -> StoreResult<ContentView> {
    let viewer_ip: Option<String> = row.get("viewer_ip");
    let viewer_ip = viewer_ip
        .map(|ip| {
            ip.parse::<IpAddr>()
                .map_err(|e| StoreError::Validation(format!("stored viewer_ip {}: {}", ip, e)))
        })
        .transpose()?;

    Ok(ContentView {
        id: row.get("id"),
        key: ViewKey {
            content_type: row.get("content_type"),
            object_id: row.get("object_id"),
            user_id: row.get("user_id"),
            viewer_ip,
        },
        created_at: row.get("created_at"),
        last_viewed: row.get("last_viewed"),
    })
}

#[async_trait]
impl ViewStore for ContentViewRepository {
    async fn upsert_view(&self, key: &ViewKey, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO views.content_views
                (id, content_type, object_id, user_id, viewer_ip, created_at, last_viewed)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT ON CONSTRAINT uq_content_view_identity DO UPDATE SET
                last_viewed = EXCLUDED.last_viewed
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&key.content_type)
        .bind(key.object_id)
        .bind(key.user_id)
        .bind(key.viewer_ip.map(|ip| ip.to_string()))
        .bind(at)
        .execute(&self.pool)
        .await?;

        debug!(
            content_type = %key.content_type,
            object_id = %key.object_id,
            "Content view upserted"
        );
        Ok(())
    }

    async fn get_view(&self, key: &ViewKey) -> StoreResult<Option<ContentView>> {
        let row = sqlx::query(
            r#"
            SELECT id, content_type, object_id, user_id, viewer_ip, created_at, last_viewed
            FROM views.content_views
            WHERE content_type = $1
              AND object_id = $2
              AND user_id IS NOT DISTINCT FROM $3
              AND viewer_ip IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(&key.content_type)
        .bind(key.object_id)
        .bind(key.user_id)
        .bind(key.viewer_ip.map(|ip| ip.to_string()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(view_from_row).transpose()
    }

    async fn count_views_since(
        &self,
        scope: ViewerScope,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let count: i64 = match scope {
            ViewerScope::User(user_id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM views.content_views \
                     WHERE user_id = $1 AND created_at >= $2",
                )
                .bind(user_id)
                .bind(since)
                .fetch_one(&self.pool)
                .await?
            }
            ViewerScope::Ip(ip) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM views.content_views \
                     WHERE viewer_ip = $1 AND created_at >= $2",
                )
                .bind(ip.to_string())
                .bind(since)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count as u64)
    }

    async fn count_views_for_content(
        &self,
        content_type: &str,
        object_id: Uuid,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM views.content_views \
             WHERE content_type = $1 AND object_id = $2",
        )
        .bind(content_type)
        .bind(object_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn count_unique_viewers(
        &self,
        content_type: &str,
        object_id: Uuid,
    ) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT user_id, viewer_ip
                FROM views.content_views
                WHERE content_type = $1 AND object_id = $2
            ) AS viewers
            "#,
        )
        .bind(content_type)
        .bind(object_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}
