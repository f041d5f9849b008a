use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod enrollment_repository;
pub mod invoice_repository;
pub mod lease_repository;
pub mod notification_repository;
pub mod payment_repository;
pub mod reminder_repository;
pub mod section_repository;
pub mod student_repository;
pub mod waiting_list_repository;

pub use enrollment_repository::SqliteEnrollmentRepository;
pub use invoice_repository::SqliteInvoiceRepository;
pub use lease_repository::SqliteLeaseRepository;
pub use notification_repository::SqliteNotificationRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use reminder_repository::SqliteReminderRepository;
pub use section_repository::SqliteSectionRepository;
pub use student_repository::SqliteStudentRepository;
pub use waiting_list_repository::SqliteWaitingListRepository;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    /// Pending payments whose expiry timestamp has passed.
    async fn list_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Payment>>;
    async fn mark_expired(&self, id: Uuid) -> Result<Payment>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn create(&self, invoice: Invoice) -> Result<Invoice>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>>;
    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Invoice>>;
    async fn mark_overdue(&self, id: Uuid) -> Result<Invoice>;
    async fn set_payment(&self, id: Uuid, payment_id: Uuid) -> Result<Invoice>;
    /// Renewal idempotency gate: is there an Unpaid invoice for this
    /// enrollment created at or after `since`?
    async fn has_recent_unpaid(&self, enrollment_id: Uuid, since: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enrollment>>;
    /// Active enrollments whose paid period has ended.
    async fn list_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>>;
    /// Expired enrollments whose grace window has elapsed.
    async fn list_grace_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<Enrollment>>;
    /// Active enrollments with expiry_date in (now, until].
    async fn list_expiring_within(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Enrollment>>;
    async fn update_status(&self, id: Uuid, status: EnrollmentStatus) -> Result<Enrollment>;
    /// Flip to Expired and stamp the grace deadline in one write.
    async fn mark_expired(
        &self,
        id: Uuid,
        grace_expiry_date: DateTime<Utc>,
    ) -> Result<Enrollment>;
}

/// Outcome of the single-statement slot decrement.
#[derive(Debug, Clone, Copy)]
pub struct SlotRelease {
    pub remaining: i64,
    pub was_full: bool,
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Section>>;
    /// Decrement current_enrollments and read the new count in one
    /// statement, so no read-then-write race exists on the counter.
    async fn release_slot(&self, id: Uuid) -> Result<SlotRelease>;
    /// Full -> Active, once a slot has been freed. No-op otherwise.
    async fn reopen(&self, id: Uuid) -> Result<()>;
    /// Recompute counters from enrollments and fix any drifted section.
    /// Returns (section id, old count, new count) for each correction.
    async fn recount_enrollments(&self) -> Result<Vec<(Uuid, i64, i64)>>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>>;
}

#[async_trait]
pub trait WaitingListRepository: Send + Sync {
    /// Expire the student's Approved entry for a section, releasing the
    /// reserved slot claim. Returns how many entries were expired.
    async fn expire_approved(&self, section_id: Uuid, student_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<Notification>;
    async fn exists_with_dedup_key(&self, dedup_key: &str) -> Result<bool>;
    async fn list_for_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>>;
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    async fn meetings_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>>;
    async fn assignments_due_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Assignment>>;
    /// Students with an Active enrollment in the section.
    async fn active_recipients(&self, section_id: Uuid) -> Result<Vec<Uuid>>;
    async fn has_submission(&self, assignment_id: Uuid, student_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait LeaseRepository: Send + Sync {
    /// Take the named lease if it is free or dead. Returns false when a
    /// live lease is held by someone else.
    async fn try_acquire(
        &self,
        name: &str,
        owner: &str,
        now: DateTime<Utc>,
        ttl_minutes: i64,
    ) -> Result<bool>;
    async fn release(&self, name: &str, owner: &str) -> Result<()>;
}
