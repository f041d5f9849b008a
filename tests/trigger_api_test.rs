mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::util::ServiceExt;

use common::setup;
use tutoria::{api, config::Settings};

fn request(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/jobs/reconcile");
    if let Some(secret) = secret {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", secret));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn reconcile_rejects_missing_or_wrong_secret() -> anyhow::Result<()> {
    let t = setup().await?;
    let settings = Arc::new(Settings::default());
    let app = api::create_app(t.ctx.clone(), settings);

    let response = app.clone().oneshot(request(None)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(request(Some("not-the-secret"))).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // No run happened: no lease row was ever taken.
    let leases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_leases")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(leases, 0);

    Ok(())
}

#[tokio::test]
async fn reconcile_runs_all_six_tasks_with_the_right_secret() -> anyhow::Result<()> {
    let t = setup().await?;
    let settings = Arc::new(Settings::default());
    let secret = settings.reconciliation.trigger_secret.clone();
    let app = api::create_app(t.ctx.clone(), settings);

    let response = app.oneshot(request(Some(&secret))).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let report: serde_json::Value = serde_json::from_slice(&bytes)?;

    assert_eq!(report["success"], true);
    assert_eq!(report["results"].as_array().map(|r| r.len()), Some(6));
    assert_eq!(report["fail_count"], 0);

    Ok(())
}

#[tokio::test]
async fn recount_fixes_a_drifted_section_counter() -> anyhow::Result<()> {
    let t = setup().await?;
    let settings = Arc::new(Settings::default());
    let secret = settings.reconciliation.trigger_secret.clone();
    let app = api::create_app(t.ctx.clone(), settings);

    let student = uuid::Uuid::new_v4();
    let section = uuid::Uuid::new_v4();
    common::insert_student(&t.pool, student, "Mira Anggraini", "mira@example.com").await?;
    // Counter says 5, but only one enrollment actually holds a slot.
    common::insert_section(&t.pool, section, "Drifted M", 100_000, 5, 5, "Full").await?;
    common::insert_enrollment(&t.pool, uuid::Uuid::new_v4(), student, Some(section), "Active", None, None)
        .await?;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/recount-sections")
                .header(header::AUTHORIZATION, format!("Bearer {}", secret))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (count, status) = common::section_state(&t.pool, section).await?;
    assert_eq!(count, 1);
    assert_eq!(status, "Active");

    Ok(())
}
