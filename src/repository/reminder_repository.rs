use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Assignment, Meeting},
    error::{AppError, Result},
    repository::ReminderRepository,
};

#[derive(FromRow)]
struct MeetingRow {
    id: String,
    section_id: String,
    title: String,
    scheduled_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AssignmentRow {
    id: String,
    section_id: String,
    title: String,
    due_at: NaiveDateTime,
}

pub struct SqliteReminderRepository {
    pool: SqlitePool,
}

impl SqliteReminderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_meeting(row: MeetingRow) -> Result<Meeting> {
        Ok(Meeting {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            section_id: Uuid::parse_str(&row.section_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            scheduled_at: DateTime::from_naive_utc_and_offset(row.scheduled_at, Utc),
        })
    }

    fn row_to_assignment(row: AssignmentRow) -> Result<Assignment> {
        Ok(Assignment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            section_id: Uuid::parse_str(&row.section_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            due_at: DateTime::from_naive_utc_and_offset(row.due_at, Utc),
        })
    }
}

#[async_trait]
impl ReminderRepository for SqliteReminderRepository {
    async fn meetings_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>> {
        let rows = sqlx::query_as::<_, MeetingRow>(
            r#"
            SELECT id, section_id, title, scheduled_at
            FROM meetings
            WHERE scheduled_at >= ? AND scheduled_at < ?
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_meeting).collect()
    }

    async fn assignments_due_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, section_id, title, due_at
            FROM assignments
            WHERE due_at >= ? AND due_at < ?
            ORDER BY due_at ASC
            "#,
        )
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_assignment).collect()
    }

    async fn active_recipients(&self, section_id: Uuid) -> Result<Vec<Uuid>> {
        let section_id_str = section_id.to_string();
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT student_id
            FROM enrollments
            WHERE section_id = ? AND status = 'Active'
            "#,
        )
        .bind(&section_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ids.into_iter()
            .map(|s| Uuid::parse_str(&s).map_err(|e| AppError::Database(e.to_string())))
            .collect()
    }

    async fn has_submission(&self, assignment_id: Uuid, student_id: Uuid) -> Result<bool> {
        let assignment_id_str = assignment_id.to_string();
        let student_id_str = student_id.to_string();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM submissions
            WHERE assignment_id = ? AND student_id = ?
            "#,
        )
        .bind(&assignment_id_str)
        .bind(&student_id_str)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}
