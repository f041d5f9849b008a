use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{Enrollment, EnrollmentStatus, Notification, NotificationKind},
    error::{AppError, Result},
    service::ServiceContext,
};

/// Release section capacity for enrollments whose grace window has elapsed.
/// A SlotReleased enrollment never matches the query again, so each one
/// decrements its section counter exactly once across repeated runs.
pub async fn run(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let candidates = ctx.enrollment_repo.list_grace_elapsed(now).await?;
    let total = candidates.len();
    let mut processed = 0;

    for enrollment in candidates {
        match release_one(ctx, &enrollment).await {
            Ok(()) => processed += 1,
            Err(e) => {
                tracing::warn!("Skipping enrollment {}: {}", enrollment.id, e);
            }
        }
    }

    Ok(format!("{}/{} grace releases processed", processed, total))
}

async fn release_one(ctx: &ServiceContext, enrollment: &Enrollment) -> Result<()> {
    let section_id = enrollment.section_id.ok_or_else(|| {
        AppError::BadRequest(format!("Enrollment {} has no section", enrollment.id))
    })?;

    ctx.enrollment_repo
        .update_status(enrollment.id, EnrollmentStatus::SlotReleased)
        .await?;

    let release = ctx.section_repo.release_slot(section_id).await?;
    if release.was_full {
        ctx.section_repo.reopen(section_id).await?;
    }

    let section_name = ctx
        .section_repo
        .find_by_id(section_id)
        .await?
        .map(|s| s.name)
        .unwrap_or_else(|| "your class".to_string());

    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: enrollment.student_id,
            title: "Slot Released".to_string(),
            message: format!(
                "The grace period for {} has ended and your seat was released. Re-enroll any time a seat is open.",
                section_name
            ),
            kind: NotificationKind::SlotReleased,
            link: None,
            dedup_key: None,
            created_at: Utc::now(),
        })
        .await?;

    Ok(())
}
