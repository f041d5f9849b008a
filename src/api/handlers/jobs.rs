use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    service::reconciliation::{ReconciliationReport, TaskRunner},
};

/// The external scheduler's daily trigger. Auth is a shared bearer secret;
/// a mismatch runs nothing.
pub async fn reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReconciliationReport>> {
    authorize(&headers, &state.settings.reconciliation.trigger_secret)?;

    let runner = TaskRunner::new(state.service_context.clone());
    let report = runner.run(Utc::now()).await?;

    Ok(Json(report))
}

/// Self-healing pass for the denormalized section counters.
pub async fn recount_sections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    authorize(&headers, &state.settings.reconciliation.trigger_secret)?;

    let corrected = state
        .service_context
        .section_repo
        .recount_enrollments()
        .await?;

    for (section_id, old_count, new_count) in &corrected {
        tracing::warn!(
            "Section {} counter drifted: {} -> {}",
            section_id,
            old_count,
            new_count
        );
    }

    let report: Vec<Value> = corrected
        .into_iter()
        .map(|(id, old_count, new_count)| {
            json!({
                "section_id": id,
                "old_count": old_count,
                "new_count": new_count,
            })
        })
        .collect();

    Ok(Json(json!({ "corrected": report })))
}

fn authorize(headers: &HeaderMap, secret: &str) -> Result<()> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = value.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    if token != secret {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
