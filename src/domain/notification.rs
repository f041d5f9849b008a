use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A one-way message to a student. Reminder notifications carry a
/// `dedup_key` so a repeated run on the same day finds the earlier row by
/// equality instead of substring matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub dedup_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    PaymentExpired,
    SubscriptionEnded,
    SlotReleased,
    RenewalInvoice,
    MeetingReminder,
    AssignmentReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PaymentExpired => "PaymentExpired",
            NotificationKind::SubscriptionEnded => "SubscriptionEnded",
            NotificationKind::SlotReleased => "SlotReleased",
            NotificationKind::RenewalInvoice => "RenewalInvoice",
            NotificationKind::MeetingReminder => "MeetingReminder",
            NotificationKind::AssignmentReminder => "AssignmentReminder",
        }
    }
}

/// One key per (recipient, kind, event, local calendar day). Two runs on the
/// same day produce the same key; the next day produces a fresh one.
pub fn reminder_dedup_key(
    recipient_id: Uuid,
    kind: NotificationKind,
    event_id: Uuid,
    local_date: NaiveDate,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(recipient_id.as_bytes());
    hasher.update(kind.as_str().as_bytes());
    hasher.update(event_id.as_bytes());
    hasher.update(local_date.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
