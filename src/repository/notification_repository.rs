use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Notification, NotificationKind},
    error::{AppError, Result},
    repository::NotificationRepository,
};

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    recipient_id: String,
    title: String,
    message: String,
    kind: String,
    link: Option<String>,
    dedup_key: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_notification(row: NotificationRow) -> Result<Notification> {
        Ok(Notification {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            recipient_id: Uuid::parse_str(&row.recipient_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            message: row.message,
            kind: Self::parse_kind(&row.kind)?,
            link: row.link,
            dedup_key: row.dedup_key,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn parse_kind(s: &str) -> Result<NotificationKind> {
        match s {
            "PaymentExpired" => Ok(NotificationKind::PaymentExpired),
            "SubscriptionEnded" => Ok(NotificationKind::SubscriptionEnded),
            "SlotReleased" => Ok(NotificationKind::SlotReleased),
            "RenewalInvoice" => Ok(NotificationKind::RenewalInvoice),
            "MeetingReminder" => Ok(NotificationKind::MeetingReminder),
            "AssignmentReminder" => Ok(NotificationKind::AssignmentReminder),
            _ => Err(AppError::Database(format!("Invalid notification kind: {}", s))),
        }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification> {
        let id_str = notification.id.to_string();
        let recipient_id_str = notification.recipient_id.to_string();
        let kind_str = notification.kind.as_str();
        let created_at_naive = notification.created_at.naive_utc();

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, title, message, kind, link, dedup_key,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&recipient_id_str)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(kind_str)
        .bind(&notification.link)
        .bind(&notification.dedup_key)
        .bind(created_at_naive)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(notification)
    }

    async fn exists_with_dedup_key(&self, dedup_key: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE dedup_key = ?
            "#,
        )
        .bind(dedup_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn list_for_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let recipient_id_str = recipient_id.to_string();
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, title, message, kind, link, dedup_key,
                   created_at
            FROM notifications
            WHERE recipient_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }
}
