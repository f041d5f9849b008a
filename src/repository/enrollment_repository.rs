use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Enrollment, EnrollmentStatus},
    error::{AppError, Result},
    repository::EnrollmentRepository,
};

#[derive(FromRow)]
struct EnrollmentRow {
    id: String,
    student_id: String,
    section_id: Option<String>,
    status: String,
    expiry_date: Option<NaiveDateTime>,
    grace_expiry_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteEnrollmentRepository {
    pool: SqlitePool,
}

impl SqliteEnrollmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_enrollment(row: EnrollmentRow) -> Result<Enrollment> {
        let section_id = match row.section_id {
            Some(ref s) => {
                Some(Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))?)
            }
            None => None,
        };
        Ok(Enrollment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            student_id: Uuid::parse_str(&row.student_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            section_id,
            status: Self::parse_status(&row.status)?,
            expiry_date: row.expiry_date.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            grace_expiry_date: row
                .grace_expiry_date
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<EnrollmentStatus> {
        match s {
            "Pending" => Ok(EnrollmentStatus::Pending),
            "Active" => Ok(EnrollmentStatus::Active),
            "Expired" => Ok(EnrollmentStatus::Expired),
            "SlotReleased" => Ok(EnrollmentStatus::SlotReleased),
            "Cancelled" => Ok(EnrollmentStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid enrollment status: {}", s))),
        }
    }

    fn status_to_str(status: &EnrollmentStatus) -> &'static str {
        match status {
            EnrollmentStatus::Pending => "Pending",
            EnrollmentStatus::Active => "Active",
            EnrollmentStatus::Expired => "Expired",
            EnrollmentStatus::SlotReleased => "SlotReleased",
            EnrollmentStatus::Cancelled => "Cancelled",
        }
    }
}

#[async_trait]
impl EnrollmentRepository for SqliteEnrollmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enrollment>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, section_id, status, expiry_date,
                   grace_expiry_date, created_at, updated_at
            FROM enrollments
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_enrollment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>> {
        let now_naive = now.naive_utc();
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, section_id, status, expiry_date,
                   grace_expiry_date, created_at, updated_at
            FROM enrollments
            WHERE status = 'Active' AND expiry_date IS NOT NULL AND expiry_date < ?
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(now_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_enrollment).collect()
    }

    async fn list_grace_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>> {
        let now_naive = now.naive_utc();
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, section_id, status, expiry_date,
                   grace_expiry_date, created_at, updated_at
            FROM enrollments
            WHERE status = 'Expired'
              AND grace_expiry_date IS NOT NULL AND grace_expiry_date < ?
            ORDER BY grace_expiry_date ASC
            "#,
        )
        .bind(now_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_enrollment).collect()
    }

    async fn list_expiring_within(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Enrollment>> {
        let now_naive = now.naive_utc();
        let until_naive = until.naive_utc();
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, student_id, section_id, status, expiry_date,
                   grace_expiry_date, created_at, updated_at
            FROM enrollments
            WHERE status = 'Active'
              AND expiry_date IS NOT NULL
              AND expiry_date >= ? AND expiry_date <= ?
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(now_naive)
        .bind(until_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_enrollment).collect()
    }

    async fn update_status(&self, id: Uuid, status: EnrollmentStatus) -> Result<Enrollment> {
        let id_str = id.to_string();
        let status_str = Self::status_to_str(&status);
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status_str)
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated enrollment".to_string())
        })
    }

    async fn mark_expired(
        &self,
        id: Uuid,
        grace_expiry_date: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let id_str = id.to_string();
        let grace_naive = grace_expiry_date.naive_utc();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = 'Expired',
                grace_expiry_date = COALESCE(grace_expiry_date, ?),
                updated_at = ?
            WHERE id = ? AND status = 'Active'
            "#,
        )
        .bind(grace_naive)
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated enrollment".to_string())
        })
    }
}
