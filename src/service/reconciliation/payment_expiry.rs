use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{EnrollmentStatus, Notification, NotificationKind, Payment},
    error::{AppError, Result},
    service::ServiceContext,
};

/// Expire stale unpaid payments and cascade: invoice goes Overdue, a still
/// Pending enrollment is cancelled and its waiting-list claim released.
pub async fn run(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let candidates = ctx.payment_repo.list_expired_pending(now).await?;
    let total = candidates.len();
    let mut processed = 0;

    for payment in candidates {
        match expire_one(ctx, &payment).await {
            Ok(()) => processed += 1,
            Err(e) => {
                tracing::warn!("Skipping payment {}: {}", payment.id, e);
            }
        }
    }

    Ok(format!("{}/{} expired payments processed", processed, total))
}

async fn expire_one(ctx: &ServiceContext, payment: &Payment) -> Result<()> {
    ctx.payment_repo.mark_expired(payment.id).await?;

    let invoice = ctx.invoice_repo.find_by_payment(payment.id).await?;
    if let Some(ref invoice) = invoice {
        ctx.invoice_repo.mark_overdue(invoice.id).await?;
    }

    let enrollment = ctx
        .enrollment_repo
        .find_by_id(payment.enrollment_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Enrollment {} for payment {}",
                payment.enrollment_id, payment.id
            ))
        })?;

    // A Pending enrollment never got its payment confirmed: cancel it and
    // give up the student's reserved waiting-list claim. It was never
    // counted in the section, so there is nothing to decrement.
    if enrollment.status == EnrollmentStatus::Pending {
        ctx.enrollment_repo
            .update_status(enrollment.id, EnrollmentStatus::Cancelled)
            .await?;
        if let Some(section_id) = enrollment.section_id {
            ctx.waiting_list_repo
                .expire_approved(section_id, enrollment.student_id)
                .await?;
        }
    }

    let message = match invoice {
        Some(invoice) => format!(
            "Your payment for invoice {} has expired. Please start a new checkout to keep your enrollment.",
            invoice.invoice_number
        ),
        None => "Your payment has expired. Please start a new checkout to keep your enrollment.".to_string(),
    };

    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: enrollment.student_id,
            title: "Payment Expired".to_string(),
            message,
            kind: NotificationKind::PaymentExpired,
            link: None,
            dedup_key: None,
            created_at: Utc::now(),
        })
        .await?;

    Ok(())
}
