use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentMethod, PaymentStatus},
    error::{AppError, Result},
    repository::PaymentRepository,
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    enrollment_id: String,
    amount_cents: i64,
    method: String,
    gateway_order_id: Option<String>,
    gateway_token: Option<String>,
    gateway_redirect_url: Option<String>,
    status: String,
    expired_at: Option<NaiveDateTime>,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            enrollment_id: Uuid::parse_str(&row.enrollment_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            amount_cents: row.amount_cents,
            method: Self::parse_method(&row.method)?,
            gateway_order_id: row.gateway_order_id,
            gateway_token: row.gateway_token,
            gateway_redirect_url: row.gateway_redirect_url,
            status: Self::parse_status(&row.status)?,
            expired_at: row.expired_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            paid_at: row.paid_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<PaymentStatus> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Expired" => Ok(PaymentStatus::Expired),
            "Failed" => Ok(PaymentStatus::Failed),
            "Refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
        }
    }

    fn status_to_str(status: &PaymentStatus) -> &'static str {
        match status {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Expired => "Expired",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    fn parse_method(s: &str) -> Result<PaymentMethod> {
        match s {
            "Gateway" => Ok(PaymentMethod::Gateway),
            "Manual" => Ok(PaymentMethod::Manual),
            _ => Err(AppError::Database(format!("Invalid payment method: {}", s))),
        }
    }

    fn method_to_str(method: &PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::Gateway => "Gateway",
            PaymentMethod::Manual => "Manual",
        }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment> {
        let id_str = payment.id.to_string();
        let enrollment_id_str = payment.enrollment_id.to_string();
        let status_str = Self::status_to_str(&payment.status);
        let method_str = Self::method_to_str(&payment.method);
        let expired_at_naive = payment.expired_at.map(|dt| dt.naive_utc());
        let paid_at_naive = payment.paid_at.map(|dt| dt.naive_utc());
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, enrollment_id, amount_cents, method, gateway_order_id,
                gateway_token, gateway_redirect_url, status, expired_at,
                paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&enrollment_id_str)
        .bind(payment.amount_cents)
        .bind(method_str)
        .bind(&payment.gateway_order_id)
        .bind(&payment.gateway_token)
        .bind(&payment.gateway_redirect_url)
        .bind(status_str)
        .bind(expired_at_naive)
        .bind(paid_at_naive)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, enrollment_id, amount_cents, method, gateway_order_id,
                   gateway_token, gateway_redirect_url, status, expired_at,
                   paid_at, created_at, updated_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Payment>> {
        let now_naive = now.naive_utc();
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, enrollment_id, amount_cents, method, gateway_order_id,
                   gateway_token, gateway_redirect_url, status, expired_at,
                   paid_at, created_at, updated_at
            FROM payments
            WHERE status = 'Pending' AND expired_at IS NOT NULL AND expired_at < ?
            ORDER BY expired_at ASC
            "#,
        )
        .bind(now_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn mark_expired(&self, id: Uuid) -> Result<Payment> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'Expired', updated_at = ?
            WHERE id = ? AND status = 'Pending'
            "#,
        )
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated payment".to_string())
        })
    }
}
