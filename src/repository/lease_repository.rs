use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, Result},
    repository::LeaseRepository,
};

pub struct SqliteLeaseRepository {
    pool: SqlitePool,
}

impl SqliteLeaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaseRepository for SqliteLeaseRepository {
    async fn try_acquire(
        &self,
        name: &str,
        owner: &str,
        now: DateTime<Utc>,
        ttl_minutes: i64,
    ) -> Result<bool> {
        let now_naive = now.naive_utc();
        let expires_at = (now + Duration::minutes(ttl_minutes)).naive_utc();

        // Upsert that only steals the lease when the old one is dead.
        // rows_affected == 0 means a live lease is held by someone else.
        let result = sqlx::query(
            r#"
            INSERT INTO job_leases (name, owner, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE
            SET owner = excluded.owner, expires_at = excluded.expires_at
            WHERE job_leases.expires_at < ? OR job_leases.owner = excluded.owner
            "#,
        )
        .bind(name)
        .bind(owner)
        .bind(expires_at)
        .bind(now_naive)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, name: &str, owner: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM job_leases
            WHERE name = ? AND owner = ?
            "#,
        )
        .bind(name)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
