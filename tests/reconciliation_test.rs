mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::*;
use tutoria::service::reconciliation::TaskRunner;

#[tokio::test]
async fn payment_expiry_cascades_to_invoice_enrollment_and_waiting_list() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();
    let payment = Uuid::new_v4();
    let invoice = Uuid::new_v4();
    let entry = Uuid::new_v4();

    insert_student(&t.pool, student, "Ana Putri", "ana@example.com").await?;
    insert_section(&t.pool, section, "Algebra A", 100_000, 10, 3, "Active").await?;
    insert_enrollment(&t.pool, enrollment, student, Some(section), "Pending", None, None).await?;
    insert_payment(&t.pool, payment, enrollment, 100_000, "Pending", Some(now - Duration::days(1)))
        .await?;
    insert_invoice(&t.pool, invoice, "INV-TEST-0001", enrollment, Some(payment), "Unpaid", now)
        .await?;
    insert_waiting_list_entry(&t.pool, entry, section, student, "Approved").await?;

    let report = TaskRunner::new(t.ctx.clone()).run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    assert_eq!(payment_status(&t.pool, payment).await?, "Expired");
    assert_eq!(invoice_status(&t.pool, invoice).await?, "Overdue");
    assert_eq!(enrollment_status(&t.pool, enrollment).await?, "Cancelled");
    assert_eq!(waiting_list_status(&t.pool, entry).await?, "Expired");
    assert_eq!(count_notifications(&t.pool, student, "PaymentExpired").await?, 1);

    // A Pending enrollment was never counted; the counter must not move.
    let (count, _) = section_state(&t.pool, section).await?;
    assert_eq!(count, 3);

    Ok(())
}

#[tokio::test]
async fn active_enrollment_past_expiry_becomes_expired() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();

    insert_student(&t.pool, student, "Budi Santoso", "budi@example.com").await?;
    insert_section(&t.pool, section, "Physics B", 150_000, 8, 5, "Active").await?;
    insert_enrollment(
        &t.pool,
        enrollment,
        student,
        Some(section),
        "Active",
        Some(now - Duration::days(2)),
        None,
    )
    .await?;

    let report = TaskRunner::new(t.ctx.clone()).run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    assert_eq!(enrollment_status(&t.pool, enrollment).await?, "Expired");
    assert_eq!(count_notifications(&t.pool, student, "SubscriptionEnded").await?, 1);

    // Grace window is stamped from the paid period's end.
    let grace: Option<chrono::NaiveDateTime> =
        sqlx::query_scalar("SELECT grace_expiry_date FROM enrollments WHERE id = ?")
            .bind(enrollment.to_string())
            .fetch_one(&t.pool)
            .await?;
    assert!(grace.is_some());

    Ok(())
}

#[tokio::test]
async fn grace_release_decrements_once_and_reopens_full_section() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();

    insert_student(&t.pool, student, "Citra Dewi", "citra@example.com").await?;
    insert_section(&t.pool, section, "Chemistry C", 120_000, 5, 5, "Full").await?;
    insert_enrollment(
        &t.pool,
        enrollment,
        student,
        Some(section),
        "Expired",
        Some(now - Duration::days(8)),
        Some(now - Duration::days(1)),
    )
    .await?;

    let runner = TaskRunner::new(t.ctx.clone());
    let report = runner.run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    assert_eq!(enrollment_status(&t.pool, enrollment).await?, "SlotReleased");
    let (count, status) = section_state(&t.pool, section).await?;
    assert_eq!(count, 4);
    assert_eq!(status, "Active");
    assert_eq!(count_notifications(&t.pool, student, "SlotReleased").await?, 1);

    // Second sweep: the enrollment no longer matches, the counter holds.
    let report = runner.run(now).await?;
    assert!(report.success);
    let (count, _) = section_state(&t.pool, section).await?;
    assert_eq!(count, 4);
    assert_eq!(enrollment_status(&t.pool, enrollment).await?, "SlotReleased");

    Ok(())
}

#[tokio::test]
async fn renewal_creates_one_invoice_payment_and_gateway_transaction() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();

    insert_student(&t.pool, student, "Dian Lestari", "dian@example.com").await?;
    insert_section(&t.pool, section, "Biology D", 200_000, 10, 6, "Active").await?;
    insert_enrollment(
        &t.pool,
        enrollment,
        student,
        Some(section),
        "Active",
        Some(now + Duration::days(2)),
        None,
    )
    .await?;

    let runner = TaskRunner::new(t.ctx.clone());
    let report = runner.run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    assert_eq!(count_invoices(&t.pool, enrollment).await?, 1);
    assert_eq!(t.gateway.request_count(), 1);

    let redirect: Option<String> = sqlx::query_scalar(
        "SELECT gateway_redirect_url FROM payments WHERE enrollment_id = ?",
    )
    .bind(enrollment.to_string())
    .fetch_one(&t.pool)
    .await?;
    assert!(redirect.is_some_and(|url| url.starts_with("https://")));

    // The invoice carries the payment reference once the gateway answered.
    let payment_id: Option<String> =
        sqlx::query_scalar("SELECT payment_id FROM invoices WHERE enrollment_id = ?")
            .bind(enrollment.to_string())
            .fetch_one(&t.pool)
            .await?;
    assert!(payment_id.is_some());

    assert_eq!(count_notifications(&t.pool, student, "RenewalInvoice").await?, 1);

    // The renewal notice links the student straight to the checkout page.
    let notices = t.ctx.notification_repo.list_for_recipient(student).await?;
    assert!(notices
        .iter()
        .any(|n| n.link.as_deref().is_some_and(|l| l.contains("redirect"))));

    // Same-day rerun: the idempotency gate skips, nothing new is created.
    let report = runner.run(now).await?;
    assert!(report.success);
    assert_eq!(count_invoices(&t.pool, enrollment).await?, 1);
    assert_eq!(t.gateway.request_count(), 1);

    Ok(())
}

#[tokio::test]
async fn renewal_gate_skips_enrollment_with_recent_unpaid_invoice() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();

    insert_student(&t.pool, student, "Eko Wibowo", "eko@example.com").await?;
    insert_section(&t.pool, section, "English E", 90_000, 12, 7, "Active").await?;
    insert_enrollment(
        &t.pool,
        enrollment,
        student,
        Some(section),
        "Active",
        Some(now + Duration::days(2)),
        None,
    )
    .await?;
    insert_invoice(
        &t.pool,
        Uuid::new_v4(),
        "INV-TEST-0002",
        enrollment,
        None,
        "Unpaid",
        now - Duration::days(3),
    )
    .await?;

    let report = TaskRunner::new(t.ctx.clone()).run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    assert_eq!(count_invoices(&t.pool, enrollment).await?, 1);
    assert_eq!(t.gateway.request_count(), 0);

    Ok(())
}

#[tokio::test]
async fn gateway_outage_leaves_no_invoice_and_retry_succeeds() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let enrollment = Uuid::new_v4();

    insert_student(&t.pool, student, "Fitri Handayani", "fitri@example.com").await?;
    insert_section(&t.pool, section, "Geometry F", 110_000, 10, 4, "Active").await?;
    insert_enrollment(
        &t.pool,
        enrollment,
        student,
        Some(section),
        "Active",
        Some(now + Duration::days(1)),
        None,
    )
    .await?;

    t.gateway.set_fail(true);
    let runner = TaskRunner::new(t.ctx.clone());
    let report = runner.run(now).await?;
    // A gateway outage is an entity-level skip, not a task failure.
    assert!(report.success, "report: {:?}", report.results);
    assert_eq!(count_invoices(&t.pool, enrollment).await?, 0);

    // Next day's run finds no Unpaid invoice blocking the gate and bills.
    t.gateway.set_fail(false);
    let report = runner.run(now + Duration::hours(1)).await?;
    assert!(report.success);
    assert_eq!(count_invoices(&t.pool, enrollment).await?, 1);

    Ok(())
}

#[tokio::test]
async fn terminal_statuses_never_regress_across_repeated_sweeps() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let cancelled = Uuid::new_v4();
    let released = Uuid::new_v4();

    insert_student(&t.pool, student, "Gita Permata", "gita@example.com").await?;
    insert_section(&t.pool, section, "History G", 80_000, 6, 2, "Active").await?;
    insert_enrollment(&t.pool, cancelled, student, Some(section), "Cancelled", None, None).await?;
    insert_enrollment(
        &t.pool,
        released,
        student,
        Some(section),
        "SlotReleased",
        Some(now - Duration::days(20)),
        Some(now - Duration::days(10)),
    )
    .await?;

    let runner = TaskRunner::new(t.ctx.clone());
    for _ in 0..3 {
        let report = runner.run(now).await?;
        assert!(report.success);
    }

    assert_eq!(enrollment_status(&t.pool, cancelled).await?, "Cancelled");
    assert_eq!(enrollment_status(&t.pool, released).await?, "SlotReleased");
    let (count, _) = section_state(&t.pool, section).await?;
    assert_eq!(count, 2);

    Ok(())
}

#[tokio::test]
async fn unhealthy_record_does_not_abort_the_rest_of_the_task() -> anyhow::Result<()> {
    let t = setup().await?;
    let now = Utc::now();

    let student = Uuid::new_v4();
    let section = Uuid::new_v4();
    let broken = Uuid::new_v4();
    let healthy = Uuid::new_v4();

    insert_student(&t.pool, student, "Hadi Nugroho", "hadi@example.com").await?;
    insert_section(&t.pool, section, "Latin H", 70_000, 4, 2, "Active").await?;
    // Grace elapsed but no section: cannot release a slot for it.
    insert_enrollment(
        &t.pool,
        broken,
        student,
        None,
        "Expired",
        Some(now - Duration::days(9)),
        Some(now - Duration::days(2)),
    )
    .await?;
    insert_enrollment(
        &t.pool,
        healthy,
        student,
        Some(section),
        "Expired",
        Some(now - Duration::days(9)),
        Some(now - Duration::days(2)),
    )
    .await?;

    let report = TaskRunner::new(t.ctx.clone()).run(now).await?;
    assert!(report.success, "report: {:?}", report.results);

    // The healthy record was still processed.
    assert_eq!(enrollment_status(&t.pool, healthy).await?, "SlotReleased");
    assert_eq!(enrollment_status(&t.pool, broken).await?, "Expired");

    let grace = report
        .results
        .iter()
        .find(|r| r.task == "grace_period")
        .expect("grace_period result");
    assert!(grace.message.starts_with("1/2"), "message: {}", grace.message);

    Ok(())
}
