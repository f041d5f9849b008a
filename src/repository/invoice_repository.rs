use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Invoice, InvoiceStatus},
    error::{AppError, Result},
    repository::InvoiceRepository,
};

#[derive(FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    enrollment_id: String,
    payment_id: Option<String>,
    period_start: NaiveDateTime,
    period_end: NaiveDateTime,
    amount_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    status: String,
    due_date: NaiveDateTime,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteInvoiceRepository {
    pool: SqlitePool,
}

impl SqliteInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_invoice(row: InvoiceRow) -> Result<Invoice> {
        let payment_id = match row.payment_id {
            Some(ref s) => {
                Some(Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))?)
            }
            None => None,
        };
        Ok(Invoice {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            invoice_number: row.invoice_number,
            enrollment_id: Uuid::parse_str(&row.enrollment_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            payment_id,
            period_start: DateTime::from_naive_utc_and_offset(row.period_start, Utc),
            period_end: DateTime::from_naive_utc_and_offset(row.period_end, Utc),
            amount_cents: row.amount_cents,
            tax_cents: row.tax_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            status: Self::parse_status(&row.status)?,
            due_date: DateTime::from_naive_utc_and_offset(row.due_date, Utc),
            paid_at: row.paid_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<InvoiceStatus> {
        match s {
            "Unpaid" => Ok(InvoiceStatus::Unpaid),
            "Paid" => Ok(InvoiceStatus::Paid),
            "Overdue" => Ok(InvoiceStatus::Overdue),
            "Cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid invoice status: {}", s))),
        }
    }

    fn status_to_str(status: &InvoiceStatus) -> &'static str {
        match status {
            InvoiceStatus::Unpaid => "Unpaid",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }
}

#[async_trait]
impl InvoiceRepository for SqliteInvoiceRepository {
    async fn create(&self, invoice: Invoice) -> Result<Invoice> {
        let id_str = invoice.id.to_string();
        let enrollment_id_str = invoice.enrollment_id.to_string();
        let payment_id_str = invoice.payment_id.map(|id| id.to_string());
        let status_str = Self::status_to_str(&invoice.status);
        let paid_at_naive = invoice.paid_at.map(|dt| dt.naive_utc());
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, enrollment_id, payment_id, period_start,
                period_end, amount_cents, tax_cents, discount_cents,
                total_cents, status, due_date, paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&invoice.invoice_number)
        .bind(&enrollment_id_str)
        .bind(&payment_id_str)
        .bind(invoice.period_start.naive_utc())
        .bind(invoice.period_end.naive_utc())
        .bind(invoice.amount_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.total_cents)
        .bind(status_str)
        .bind(invoice.due_date.naive_utc())
        .bind(paid_at_naive)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(invoice.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created invoice".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, invoice_number, enrollment_id, payment_id, period_start,
                   period_end, amount_cents, tax_cents, discount_cents,
                   total_cents, status, due_date, paid_at, created_at, updated_at
            FROM invoices
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_invoice(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Invoice>> {
        let payment_id_str = payment_id.to_string();
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, invoice_number, enrollment_id, payment_id, period_start,
                   period_end, amount_cents, tax_cents, discount_cents,
                   total_cents, status, due_date, paid_at, created_at, updated_at
            FROM invoices
            WHERE payment_id = ?
            "#,
        )
        .bind(payment_id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_invoice(r)?)),
            None => Ok(None),
        }
    }

    async fn mark_overdue(&self, id: Uuid) -> Result<Invoice> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'Overdue', updated_at = ?
            WHERE id = ? AND status = 'Unpaid'
            "#,
        )
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated invoice".to_string())
        })
    }

    async fn set_payment(&self, id: Uuid, payment_id: Uuid) -> Result<Invoice> {
        let id_str = id.to_string();
        let payment_id_str = payment_id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE invoices
            SET payment_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&payment_id_str)
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated invoice".to_string())
        })
    }

    async fn has_recent_unpaid(&self, enrollment_id: Uuid, since: DateTime<Utc>) -> Result<bool> {
        let enrollment_id_str = enrollment_id.to_string();
        let since_naive = since.naive_utc();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE enrollment_id = ? AND status = 'Unpaid' AND created_at >= ?
            "#,
        )
        .bind(&enrollment_id_str)
        .bind(since_naive)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}
