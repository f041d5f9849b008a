use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student's subscription to a section.
///
/// Status only ever moves forward:
/// Pending -> {Active | Cancelled} -> Expired -> SlotReleased.
/// `expiry_date` is meaningful for Active/Expired enrollments,
/// `grace_expiry_date` only once Expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub section_id: Option<Uuid>,
    pub status: EnrollmentStatus,
    pub expiry_date: Option<DateTime<Utc>>,
    pub grace_expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Expired,
    SlotReleased,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WaitingListStatus {
    Pending,
    Approved,
    Expired,
    Enrolled,
}
