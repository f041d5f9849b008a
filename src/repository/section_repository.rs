use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Section, SectionStatus},
    error::{AppError, Result},
    repository::{SectionRepository, SlotRelease},
};

#[derive(FromRow)]
struct SectionRow {
    id: String,
    name: String,
    monthly_price_cents: i64,
    max_students: i64,
    current_enrollments: i64,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteSectionRepository {
    pool: SqlitePool,
}

impl SqliteSectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_section(row: SectionRow) -> Result<Section> {
        Ok(Section {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            monthly_price_cents: row.monthly_price_cents,
            max_students: row.max_students,
            current_enrollments: row.current_enrollments,
            status: Self::parse_status(&row.status)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<SectionStatus> {
        match s {
            "Active" => Ok(SectionStatus::Active),
            "Full" => Ok(SectionStatus::Full),
            "Archived" => Ok(SectionStatus::Archived),
            _ => Err(AppError::Database(format!("Invalid section status: {}", s))),
        }
    }
}

#[async_trait]
impl SectionRepository for SqliteSectionRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Section>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, SectionRow>(
            r#"
            SELECT id, name, monthly_price_cents, max_students,
                   current_enrollments, status, created_at, updated_at
            FROM sections
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_section(r)?)),
            None => Ok(None),
        }
    }

    async fn release_slot(&self, id: Uuid) -> Result<SlotRelease> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        // Decrement and read back in one statement; `status` is untouched by
        // the update, so it reflects the pre-release state.
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            UPDATE sections
            SET current_enrollments = current_enrollments - 1,
                updated_at = ?
            WHERE id = ? AND current_enrollments > 0
            RETURNING current_enrollments, status
            "#,
        )
        .bind(now)
        .bind(&id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let (remaining, status) = row.ok_or_else(|| {
            AppError::Conflict(format!("Section {} has no slot to release", id))
        })?;

        Ok(SlotRelease {
            remaining,
            was_full: status == "Full",
        })
    }

    async fn reopen(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE sections
            SET status = 'Active', updated_at = ?
            WHERE id = ? AND status = 'Full'
            "#,
        )
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn recount_enrollments(&self) -> Result<Vec<(Uuid, i64, i64)>> {
        // Active and Expired enrollments hold a slot; Pending ones were
        // never counted and SlotReleased/Cancelled ones no longer are.
        let drifted: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.id, s.current_enrollments,
                   (SELECT COUNT(*) FROM enrollments e
                    WHERE e.section_id = s.id AND e.status IN ('Active', 'Expired'))
                   AS actual
            FROM sections s
            WHERE s.current_enrollments !=
                  (SELECT COUNT(*) FROM enrollments e
                   WHERE e.section_id = s.id AND e.status IN ('Active', 'Expired'))
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let now = Utc::now().naive_utc();
        let mut corrected = Vec::with_capacity(drifted.len());

        for (id_str, old_count, actual) in drifted {
            sqlx::query(
                r#"
                UPDATE sections
                SET current_enrollments = ?,
                    status = CASE
                        WHEN status = 'Archived' THEN status
                        WHEN ? >= max_students THEN 'Full'
                        ELSE 'Active'
                    END,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(actual)
            .bind(actual)
            .bind(now)
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            let id = Uuid::parse_str(&id_str).map_err(|e| AppError::Database(e.to_string()))?;
            corrected.push((id, old_count, actual));
        }

        Ok(corrected)
    }
}
