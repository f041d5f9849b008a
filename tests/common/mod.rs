#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use tutoria::{
    config::ReconciliationConfig,
    gateway::{FakeGateway, PaymentGateway},
    service::ServiceContext,
};

pub struct TestContext {
    pub pool: SqlitePool,
    pub ctx: Arc<ServiceContext>,
    pub gateway: Arc<FakeGateway>,
}

/// In-memory database with migrations applied, wired to a FakeGateway.
pub async fn setup() -> anyhow::Result<TestContext> {
    // One connection: every pooled connection to ":memory:" would
    // otherwise get its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let gateway = Arc::new(FakeGateway::new());
    let gateway_dyn: Arc<dyn PaymentGateway> = gateway.clone();
    let ctx = Arc::new(ServiceContext::from_pool(
        pool.clone(),
        Some(gateway_dyn),
        ReconciliationConfig::default(),
    ));

    Ok(TestContext { pool, ctx, gateway })
}

pub async fn insert_student(pool: &SqlitePool, id: Uuid, name: &str, email: &str) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO students (id, full_name, email) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_section(
    pool: &SqlitePool,
    id: Uuid,
    name: &str,
    monthly_price_cents: i64,
    max_students: i64,
    current_enrollments: i64,
    status: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sections (id, name, monthly_price_cents, max_students, current_enrollments, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(monthly_price_cents)
    .bind(max_students)
    .bind(current_enrollments)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_enrollment(
    pool: &SqlitePool,
    id: Uuid,
    student_id: Uuid,
    section_id: Option<Uuid>,
    status: &str,
    expiry_date: Option<DateTime<Utc>>,
    grace_expiry_date: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO enrollments (id, student_id, section_id, status, expiry_date, grace_expiry_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(student_id.to_string())
    .bind(section_id.map(|s| s.to_string()))
    .bind(status)
    .bind(expiry_date.map(|dt| dt.naive_utc()))
    .bind(grace_expiry_date.map(|dt| dt.naive_utc()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_payment(
    pool: &SqlitePool,
    id: Uuid,
    enrollment_id: Uuid,
    amount_cents: i64,
    status: &str,
    expired_at: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, enrollment_id, amount_cents, status, expired_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(enrollment_id.to_string())
    .bind(amount_cents)
    .bind(status)
    .bind(expired_at.map(|dt| dt.naive_utc()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_invoice(
    pool: &SqlitePool,
    id: Uuid,
    invoice_number: &str,
    enrollment_id: Uuid,
    payment_id: Option<Uuid>,
    status: &str,
    created_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let now = created_at.naive_utc();
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, enrollment_id, payment_id, period_start,
            period_end, amount_cents, total_cents, status, due_date, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, 100000, 100000, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(invoice_number)
    .bind(enrollment_id.to_string())
    .bind(payment_id.map(|p| p.to_string()))
    .bind(now)
    .bind(now)
    .bind(status)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_waiting_list_entry(
    pool: &SqlitePool,
    id: Uuid,
    section_id: Uuid,
    student_id: Uuid,
    status: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO waiting_list_entries (id, section_id, student_id, status) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(section_id.to_string())
    .bind(student_id.to_string())
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_meeting(
    pool: &SqlitePool,
    id: Uuid,
    section_id: Uuid,
    title: &str,
    scheduled_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO meetings (id, section_id, title, scheduled_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(section_id.to_string())
        .bind(title)
        .bind(scheduled_at.naive_utc())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_assignment(
    pool: &SqlitePool,
    id: Uuid,
    section_id: Uuid,
    title: &str,
    due_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO assignments (id, section_id, title, due_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(section_id.to_string())
        .bind(title)
        .bind(due_at.naive_utc())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_submission(
    pool: &SqlitePool,
    assignment_id: Uuid,
    student_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO submissions (id, assignment_id, student_id) VALUES (?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(assignment_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn payment_status(pool: &SqlitePool, id: Uuid) -> anyhow::Result<String> {
    Ok(sqlx::query_scalar("SELECT status FROM payments WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?)
}

pub async fn invoice_status(pool: &SqlitePool, id: Uuid) -> anyhow::Result<String> {
    Ok(sqlx::query_scalar("SELECT status FROM invoices WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?)
}

pub async fn enrollment_status(pool: &SqlitePool, id: Uuid) -> anyhow::Result<String> {
    Ok(sqlx::query_scalar("SELECT status FROM enrollments WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?)
}

pub async fn section_state(pool: &SqlitePool, id: Uuid) -> anyhow::Result<(i64, String)> {
    Ok(sqlx::query_as("SELECT current_enrollments, status FROM sections WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?)
}

pub async fn waiting_list_status(pool: &SqlitePool, id: Uuid) -> anyhow::Result<String> {
    Ok(
        sqlx::query_scalar("SELECT status FROM waiting_list_entries WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(pool)
            .await?,
    )
}

pub async fn count_notifications(
    pool: &SqlitePool,
    recipient_id: Uuid,
    kind: &str,
) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND kind = ?",
    )
    .bind(recipient_id.to_string())
    .bind(kind)
    .fetch_one(pool)
    .await?)
}

pub async fn count_invoices(pool: &SqlitePool, enrollment_id: Uuid) -> anyhow::Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE enrollment_id = ?")
            .bind(enrollment_id.to_string())
            .fetch_one(pool)
            .await?,
    )
}
