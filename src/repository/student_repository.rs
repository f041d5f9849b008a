use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Student,
    error::{AppError, Result},
    repository::StudentRepository,
};

#[derive(FromRow)]
struct StudentRow {
    id: String,
    full_name: String,
    email: String,
    created_at: NaiveDateTime,
}

pub struct SqliteStudentRepository {
    pool: SqlitePool,
}

impl SqliteStudentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_student(row: StudentRow) -> Result<Student> {
        Ok(Student {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            full_name: row.full_name,
            email: row.email,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, StudentRow>(
            r#"
            SELECT id, full_name, email, created_at
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_student(r)?)),
            None => Ok(None),
        }
    }
}
