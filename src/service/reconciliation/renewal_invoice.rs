use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    domain::{
        Enrollment, Invoice, InvoiceStatus, Notification, NotificationKind, Payment,
        PaymentMethod, PaymentStatus,
    },
    error::{AppError, Result},
    gateway::{CreateTransactionRequest, CustomerDetails, LineItem, PaymentGateway},
    service::ServiceContext,
};

/// Generate a renewal invoice + payment + gateway transaction for each
/// active enrollment nearing its expiry, at most once per billing cycle.
///
/// The gateway transaction is created before any row is written: a gateway
/// failure leaves no Unpaid invoice behind, so the idempotency gate will
/// let the enrollment be retried on the next daily run.
pub async fn run(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let gateway = ctx
        .gateway
        .as_ref()
        .ok_or_else(|| AppError::Gateway("Payment gateway is not configured".to_string()))?;

    let until = now + Duration::days(ctx.reconciliation.renewal_window_days);
    let candidates = ctx.enrollment_repo.list_expiring_within(now, until).await?;
    let total = candidates.len();
    let mut created = 0;
    let mut skipped = 0;

    for enrollment in candidates {
        match renew_one(ctx, gateway, &enrollment, now).await {
            Ok(true) => created += 1,
            Ok(false) => skipped += 1,
            Err(e) => {
                tracing::warn!("Skipping enrollment {}: {}", enrollment.id, e);
            }
        }
    }

    Ok(format!(
        "{} renewal invoices created, {} skipped, {} candidates",
        created, skipped, total
    ))
}

async fn renew_one(
    ctx: &ServiceContext,
    gateway: &Arc<dyn PaymentGateway>,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
) -> Result<bool> {
    // Idempotency gate: a fresh Unpaid invoice means this cycle is already
    // billed. A missing section reference means damaged data we will not
    // bill against.
    let section_id = match enrollment.section_id {
        Some(id) => id,
        None => {
            tracing::warn!("Enrollment {} has no section, not billing it", enrollment.id);
            return Ok(false);
        }
    };
    let gate_since = now - Duration::days(ctx.reconciliation.renewal_gate_days);
    if ctx
        .invoice_repo
        .has_recent_unpaid(enrollment.id, gate_since)
        .await?
    {
        return Ok(false);
    }

    let section = ctx
        .section_repo
        .find_by_id(section_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Section {}", section_id)))?;
    let student = ctx
        .student_repo
        .find_by_id(enrollment.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {}", enrollment.student_id)))?;
    let expiry = enrollment.expiry_date.ok_or_else(|| {
        AppError::BadRequest(format!("Enrollment {} has no expiry date", enrollment.id))
    })?;

    // The new billing period starts where the paid one ends.
    let period_start = expiry;
    let period_end = period_start + Duration::days(ctx.reconciliation.billing_period_days);
    let due_date = now + Duration::hours(ctx.reconciliation.due_hours);

    let invoice_number = next_invoice_number(now);
    let amount_cents = section.monthly_price_cents;
    let total_cents = amount_cents;

    let transaction = gateway
        .create_transaction(CreateTransactionRequest {
            order_id: invoice_number.clone(),
            gross_amount_cents: total_cents,
            customer: CustomerDetails {
                name: student.full_name.clone(),
                email: student.email.clone(),
            },
            line_items: vec![LineItem {
                id: section.id,
                name: format!("{} monthly subscription", section.name),
                price_cents: amount_cents,
                quantity: 1,
            }],
            expiry_minutes: ctx.reconciliation.due_hours * 60,
        })
        .await?;

    let invoice = ctx
        .invoice_repo
        .create(Invoice {
            id: Uuid::new_v4(),
            invoice_number: invoice_number.clone(),
            enrollment_id: enrollment.id,
            payment_id: None,
            period_start,
            period_end,
            amount_cents,
            tax_cents: 0,
            discount_cents: 0,
            total_cents,
            status: InvoiceStatus::Unpaid,
            due_date,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    let payment = ctx
        .payment_repo
        .create(Payment {
            id: Uuid::new_v4(),
            enrollment_id: enrollment.id,
            amount_cents: total_cents,
            method: PaymentMethod::Gateway,
            gateway_order_id: Some(invoice_number.clone()),
            gateway_token: Some(transaction.token.clone()),
            gateway_redirect_url: Some(transaction.redirect_url.clone()),
            status: PaymentStatus::Pending,
            expired_at: Some(due_date),
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    ctx.invoice_repo.set_payment(invoice.id, payment.id).await?;

    let days_remaining = (expiry - now).num_days().max(0);
    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: enrollment.student_id,
            title: "Renew Your Subscription".to_string(),
            message: format!(
                "Your subscription to {} ends in {} day(s). Pay invoice {} to keep your seat.",
                section.name, days_remaining, invoice_number
            ),
            kind: NotificationKind::RenewalInvoice,
            link: Some(transaction.redirect_url),
            dedup_key: None,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(
        "Created renewal invoice {} for enrollment {}",
        invoice_number,
        enrollment.id
    );

    Ok(true)
}

/// Unique, lexicographically time-ordered invoice number; also used as the
/// gateway order id.
fn next_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("INV-{}-{}", now.format("%Y%m%d%H%M%S"), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn invoice_numbers_are_unique_and_time_ordered() {
        let earlier = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();

        let a = next_invoice_number(earlier);
        let b = next_invoice_number(earlier);
        let c = next_invoice_number(later);

        assert_ne!(a, b);
        assert!(a < c);
        assert!(a.starts_with("INV-20250314090000-"));
    }
}
