//! The daily reconciliation engine: six tasks that advance the payment,
//! invoice, enrollment and section state machines from wall-clock time
//! alone. Tasks run sequentially and in isolation; one task failing, or one
//! record inside a task failing, never stops the sweep.

pub mod grace_period;
pub mod payment_expiry;
pub mod reminders;
pub mod renewal_invoice;
pub mod subscription_expiry;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    service::ServiceContext,
};

const RECONCILIATION_LEASE: &str = "reconciliation";

#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub run_at: DateTime<Utc>,
    pub success: bool,
    pub success_count: usize,
    pub fail_count: usize,
    pub results: Vec<TaskResult>,
}

pub struct TaskRunner {
    ctx: Arc<ServiceContext>,
}

impl TaskRunner {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// One full sweep. Refuses to start while another run holds the lease;
    /// otherwise always returns a report, however many tasks failed.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReconciliationReport> {
        let owner = Uuid::new_v4().to_string();
        let acquired = self
            .ctx
            .lease_repo
            .try_acquire(
                RECONCILIATION_LEASE,
                &owner,
                now,
                self.ctx.reconciliation.lease_ttl_minutes,
            )
            .await?;
        if !acquired {
            return Err(AppError::Conflict(
                "A reconciliation run is already in progress".to_string(),
            ));
        }

        tracing::info!("Starting reconciliation sweep at {}", now);

        let mut results = Vec::with_capacity(6);
        results.push(Self::record(
            "payment_expiry",
            payment_expiry::run(&self.ctx, now).await,
        ));
        results.push(Self::record(
            "subscription_expiry",
            subscription_expiry::run(&self.ctx, now).await,
        ));
        results.push(Self::record(
            "grace_period",
            grace_period::run(&self.ctx, now).await,
        ));
        results.push(Self::record(
            "renewal_invoice",
            renewal_invoice::run(&self.ctx, now).await,
        ));
        results.push(Self::record(
            "meeting_reminders",
            reminders::run_meetings(&self.ctx, now).await,
        ));
        results.push(Self::record(
            "assignment_reminders",
            reminders::run_assignments(&self.ctx, now).await,
        ));

        self.ctx
            .lease_repo
            .release(RECONCILIATION_LEASE, &owner)
            .await?;

        let success_count = results.iter().filter(|r| r.success).count();
        let fail_count = results.len() - success_count;

        tracing::info!(
            "Reconciliation sweep finished: {} succeeded, {} failed",
            success_count,
            fail_count
        );

        Ok(ReconciliationReport {
            run_at: now,
            success: fail_count == 0,
            success_count,
            fail_count,
            results,
        })
    }

    fn record(task: &str, outcome: Result<String>) -> TaskResult {
        match outcome {
            Ok(message) => {
                tracing::info!("Task {} succeeded: {}", task, message);
                TaskResult {
                    task: task.to_string(),
                    success: true,
                    message,
                }
            }
            Err(e) => {
                tracing::error!("Task {} failed: {}", task, e);
                TaskResult {
                    task: task.to_string(),
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

/// The business day containing `now`, as UTC bounds plus the local date.
/// The business timezone is a fixed offset from config.
pub(crate) fn local_day_bounds(
    now: DateTime<Utc>,
    utc_offset_hours: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>, NaiveDate)> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .ok_or_else(|| AppError::Internal(format!("Invalid UTC offset: {}", utc_offset_hours)))?;

    let local_date = now.with_timezone(&offset).date_naive();
    let midnight = local_date.and_time(NaiveTime::MIN);
    let start = midnight
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| AppError::Internal("Ambiguous local midnight".to_string()))?
        .with_timezone(&Utc);
    let end = start + chrono::Duration::days(1);

    Ok((start, end, local_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_follow_the_business_offset() {
        // 2025-03-14 20:00 UTC is already 03:00 on the 15th at UTC+7.
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap();
        let (start, end, date) = local_day_bounds(now, 7).unwrap();

        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 14, 17, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 15, 17, 0, 0).unwrap());
    }

    #[test]
    fn day_bounds_reject_nonsense_offsets() {
        let now = Utc::now();
        assert!(local_day_bounds(now, 99).is_err());
    }
}
