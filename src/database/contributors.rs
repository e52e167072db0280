//! Contributor Repository - PostgreSQL operations for contributors and their
//! reputation log using sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    AdjustmentKind, Contributor, LedgerSnapshot, ReputationAdjustment, ReputationLogEntry,
};
use crate::store::ReputationStore;

const CONTRIBUTOR_COLUMNS: &str = "id, user_id, display_name, bio, reputation_score, is_active, \
     total_contributions, last_contribution_at, created_at, updated_at";

pub struct ContributorRepository {
    pool: PgPool,
}

impl ContributorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize contributors schema and tables
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing contributors schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS contributors")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contributors.profiles (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL UNIQUE,
                display_name VARCHAR(100) NOT NULL,
                bio TEXT,
                reputation_score DOUBLE PRECISION NOT NULL DEFAULT 0.0
                    CHECK (reputation_score >= 0.0),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                total_contributions BIGINT NOT NULL DEFAULT 0,
                last_contribution_at TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // seq gives a total write order even when timestamps tie
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contributors.reputation_log (
                seq BIGSERIAL PRIMARY KEY,
                id UUID NOT NULL UNIQUE,
                contributor_id UUID NOT NULL
                    REFERENCES contributors.profiles(id) ON DELETE CASCADE,
                change DOUBLE PRECISION NOT NULL,
                reason TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reputation_log_contributor \
             ON contributors.reputation_log(contributor_id, seq)",
        )
        .execute(&self.pool)
        .await?;

        info!("Contributors schema initialized");
        Ok(())
    }

    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Contributor>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contributors.profiles WHERE user_id = $1",
            CONTRIBUTOR_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(contributor_from_row))
    }
}

fn contributor_from_row(row: &PgRow) -> Contributor {
    Contributor {
        id: row.get("id"),
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        reputation_score: row.get("reputation_score"),
        is_active: row.get("is_active"),
        total_contributions: row.get("total_contributions"),
        last_contribution_at: row.get("last_contribution_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn log_entry_from_row(row: &PgRow) -> ReputationLogEntry {
    ReputationLogEntry {
        id: row.get("id"),
        contributor_id: row.get("contributor_id"),
        change: row.get("change"),
        reason: row.get("reason"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ReputationStore for ContributorRepository {
    async fn get_or_create_contributor(
        &self,
        user_id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(Contributor, bool)> {
        let candidate = Contributor::new(user_id, display_name, now);

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO contributors.profiles
                (id, user_id, display_name, reputation_score, is_active,
                 total_contributions, created_at, updated_at)
            VALUES ($1, $2, $3, 0.0, TRUE, 0, $4, $4)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING {}
            "#,
            CONTRIBUTOR_COLUMNS
        ))
        .bind(candidate.id)
        .bind(user_id)
        .bind(&candidate.display_name)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            let contributor = contributor_from_row(&row);
            debug!(contributor_id = %contributor.id, user_id = %user_id, "Contributor inserted");
            return Ok((contributor, true));
        }

        // Lost the race or already provisioned
        let existing = self
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("contributor for user", user_id))?;
        Ok((existing, false))
    }

    async fn get_contributor(&self, contributor_id: Uuid) -> StoreResult<Option<Contributor>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM contributors.profiles WHERE id = $1",
            CONTRIBUTOR_COLUMNS
        ))
        .bind(contributor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(contributor_from_row))
    }

    async fn get_contributor_by_user(&self, user_id: Uuid) -> StoreResult<Option<Contributor>> {
        self.find_by_user(user_id).await
    }

    async fn list_contributor_ids(&self) -> StoreResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM contributors.profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn apply_adjustment(
        &self,
        contributor_id: Uuid,
        change: f64,
        reason: &str,
        kind: AdjustmentKind,
        at: DateTime<Utc>,
    ) -> StoreResult<ReputationAdjustment> {
        let contribution_increment: i64 = match kind {
            AdjustmentKind::Plain => 0,
            AdjustmentKind::Contribution => 1,
        };

        let mut tx = self.pool.begin().await?;

        // Single arithmetic update; the row lock taken by the subselect
        // serializes concurrent adjustments and pins the previous score.
        // A sum that overflows float8 fails with SQLSTATE 22003.
        let row = sqlx::query(
            r#"
            UPDATE contributors.profiles AS p
            SET reputation_score = GREATEST(0.0::DOUBLE PRECISION, prev.score + $2),
                total_contributions = p.total_contributions + $4,
                last_contribution_at = CASE WHEN $4 > 0 THEN $3 ELSE p.last_contribution_at END,
                updated_at = $3
            FROM (
                SELECT id, reputation_score AS score
                FROM contributors.profiles
                WHERE id = $1
                FOR UPDATE
            ) AS prev
            WHERE p.id = prev.id
            RETURNING prev.score AS previous_score, p.reputation_score
            "#,
        )
        .bind(contributor_id)
        .bind(change)
        .bind(at)
        .bind(contribution_increment)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back
        let Some(row) = row else {
            return Err(StoreError::not_found("contributor", contributor_id));
        };
        let previous_score: f64 = row.get("previous_score");
        let new_score: f64 = row.get("reputation_score");

        let entry = ReputationLogEntry::new(contributor_id, change, reason, at);
        sqlx::query(
            r#"
            INSERT INTO contributors.reputation_log (id, contributor_id, change, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.contributor_id)
        .bind(entry.change)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            contributor_id = %contributor_id,
            change = change,
            new_score = new_score,
            "Reputation adjusted"
        );

        Ok(ReputationAdjustment {
            contributor_id,
            previous_score,
            new_score,
            entry,
        })
    }

    async fn ledger_snapshot(&self, contributor_id: Uuid) -> StoreResult<Option<LedgerSnapshot>> {
        let mut tx = self.pool.begin().await?;

        // Both reads see the same committed state
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM contributors.profiles WHERE id = $1",
            CONTRIBUTOR_COLUMNS
        ))
        .bind(contributor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let contributor = contributor_from_row(&row);

        let rows = sqlx::query(
            r#"
            SELECT id, contributor_id, change, reason, created_at
            FROM contributors.reputation_log
            WHERE contributor_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(contributor_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(LedgerSnapshot {
            contributor,
            entries: rows.iter().map(log_entry_from_row).collect(),
        }))
    }

    async fn log_entries(&self, contributor_id: Uuid) -> StoreResult<Vec<ReputationLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, contributor_id, change, reason, created_at
            FROM contributors.reputation_log
            WHERE contributor_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(contributor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(log_entry_from_row).collect())
    }

    async fn recent_log_entries(
        &self,
        contributor_id: Uuid,
        limit: u32,
    ) -> StoreResult<Vec<ReputationLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, contributor_id, change, reason, created_at
            FROM contributors.reputation_log
            WHERE contributor_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(contributor_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(log_entry_from_row).collect())
    }

    async fn count_log_entries(&self, contributor_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contributors.reputation_log WHERE contributor_id = $1",
        )
        .bind(contributor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}
