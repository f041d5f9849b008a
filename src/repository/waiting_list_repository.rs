use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    repository::WaitingListRepository,
};

pub struct SqliteWaitingListRepository {
    pool: SqlitePool,
}

impl SqliteWaitingListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WaitingListRepository for SqliteWaitingListRepository {
    async fn expire_approved(&self, section_id: Uuid, student_id: Uuid) -> Result<u64> {
        let section_id_str = section_id.to_string();
        let student_id_str = student_id.to_string();
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE waiting_list_entries
            SET status = 'Expired', updated_at = ?
            WHERE section_id = ? AND student_id = ? AND status = 'Approved'
            "#,
        )
        .bind(now)
        .bind(&section_id_str)
        .bind(&student_id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
