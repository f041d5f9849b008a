use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    domain::{Enrollment, Notification, NotificationKind},
    error::Result,
    service::ServiceContext,
};

/// Move active enrollments past their paid period into Expired. Idempotent
/// by construction: an Expired enrollment no longer matches the query.
pub async fn run(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let candidates = ctx.enrollment_repo.list_expired_active(now).await?;
    let total = candidates.len();
    let mut processed = 0;

    for enrollment in candidates {
        match expire_one(ctx, &enrollment, now).await {
            Ok(()) => processed += 1,
            Err(e) => {
                tracing::warn!("Skipping enrollment {}: {}", enrollment.id, e);
            }
        }
    }

    Ok(format!("{}/{} ended subscriptions processed", processed, total))
}

async fn expire_one(
    ctx: &ServiceContext,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
) -> Result<()> {
    // The grace window counts from the paid period's end, not from when
    // this run happens to notice it.
    let grace_from = enrollment.expiry_date.unwrap_or(now);
    let grace_expiry = grace_from + Duration::days(ctx.reconciliation.grace_period_days);

    ctx.enrollment_repo
        .mark_expired(enrollment.id, grace_expiry)
        .await?;

    let section_name = match enrollment.section_id {
        Some(section_id) => ctx
            .section_repo
            .find_by_id(section_id)
            .await?
            .map(|s| s.name),
        None => None,
    };

    let message = match section_name {
        Some(name) => format!(
            "Your subscription to {} has ended. Your seat stays reserved for {} more days.",
            name, ctx.reconciliation.grace_period_days
        ),
        None => format!(
            "Your subscription has ended. Your seat stays reserved for {} more days.",
            ctx.reconciliation.grace_period_days
        ),
    };

    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: enrollment.student_id,
            title: "Subscription Ended".to_string(),
            message,
            kind: NotificationKind::SubscriptionEnded,
            link: None,
            dedup_key: None,
            created_at: Utc::now(),
        })
        .await?;

    Ok(())
}
