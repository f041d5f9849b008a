use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    domain::{reminder_dedup_key, Notification, NotificationKind},
    error::{AppError, Result},
    service::reconciliation::local_day_bounds,
    service::ServiceContext,
};

/// Remind every actively-enrolled student about meetings scheduled today.
/// "Today" is the business-timezone calendar day; the dedup key keeps a
/// second run on the same day from re-sending.
pub async fn run_meetings(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let (start, end, local_date) =
        local_day_bounds(now, ctx.reconciliation.utc_offset_hours)?;
    let meetings = ctx.reminder_repo.meetings_in_window(start, end).await?;

    let mut sent = 0;
    let mut deduped = 0;
    let mut failed = 0;

    for meeting in meetings {
        let recipients = ctx.reminder_repo.active_recipients(meeting.section_id).await?;
        for student_id in recipients {
            let outcome = remind_meeting(ctx, student_id, &meeting, local_date).await;
            match outcome {
                Ok(true) => sent += 1,
                Ok(false) => deduped += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        "Meeting reminder for student {} failed: {}",
                        student_id,
                        e
                    );
                }
            }
        }
    }

    Ok(format!(
        "{} meeting reminders sent, {} already sent today, {} failed",
        sent, deduped, failed
    ))
}

/// Remind students about assignments due today, skipping anyone who has
/// already submitted.
pub async fn run_assignments(ctx: &ServiceContext, now: DateTime<Utc>) -> Result<String> {
    let (start, end, local_date) =
        local_day_bounds(now, ctx.reconciliation.utc_offset_hours)?;
    let assignments = ctx
        .reminder_repo
        .assignments_due_in_window(start, end)
        .await?;

    let mut sent = 0;
    let mut deduped = 0;
    let mut failed = 0;

    for assignment in assignments {
        let recipients = ctx
            .reminder_repo
            .active_recipients(assignment.section_id)
            .await?;
        for student_id in recipients {
            let outcome = remind_assignment(ctx, student_id, &assignment, local_date).await;
            match outcome {
                Ok(true) => sent += 1,
                Ok(false) => deduped += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        "Assignment reminder for student {} failed: {}",
                        student_id,
                        e
                    );
                }
            }
        }
    }

    Ok(format!(
        "{} assignment reminders sent, {} skipped, {} failed",
        sent, deduped, failed
    ))
}

async fn remind_meeting(
    ctx: &ServiceContext,
    student_id: Uuid,
    meeting: &crate::domain::Meeting,
    local_date: NaiveDate,
) -> Result<bool> {
    let key = reminder_dedup_key(
        student_id,
        NotificationKind::MeetingReminder,
        meeting.id,
        local_date,
    );
    if ctx.notification_repo.exists_with_dedup_key(&key).await? {
        return Ok(false);
    }

    let local_time = to_local(meeting.scheduled_at, ctx.reconciliation.utc_offset_hours)?;
    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: student_id,
            title: "Meeting Today".to_string(),
            message: format!(
                "{} starts today at {}.",
                meeting.title,
                local_time.format("%H:%M")
            ),
            kind: NotificationKind::MeetingReminder,
            link: None,
            dedup_key: Some(key),
            created_at: Utc::now(),
        })
        .await?;

    Ok(true)
}

async fn remind_assignment(
    ctx: &ServiceContext,
    student_id: Uuid,
    assignment: &crate::domain::Assignment,
    local_date: NaiveDate,
) -> Result<bool> {
    if ctx
        .reminder_repo
        .has_submission(assignment.id, student_id)
        .await?
    {
        return Ok(false);
    }

    let key = reminder_dedup_key(
        student_id,
        NotificationKind::AssignmentReminder,
        assignment.id,
        local_date,
    );
    if ctx.notification_repo.exists_with_dedup_key(&key).await? {
        return Ok(false);
    }

    let local_time = to_local(assignment.due_at, ctx.reconciliation.utc_offset_hours)?;
    ctx.notification_repo
        .create(Notification {
            id: Uuid::new_v4(),
            recipient_id: student_id,
            title: "Assignment Due Today".to_string(),
            message: format!(
                "{} is due today at {}.",
                assignment.title,
                local_time.format("%H:%M")
            ),
            kind: NotificationKind::AssignmentReminder,
            link: None,
            dedup_key: Some(key),
            created_at: Utc::now(),
        })
        .await?;

    Ok(true)
}

fn to_local(at: DateTime<Utc>, utc_offset_hours: i32) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .ok_or_else(|| AppError::Internal(format!("Invalid UTC offset: {}", utc_offset_hours)))?;
    Ok(at.with_timezone(&offset))
}
