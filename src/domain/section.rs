use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A capacity-bounded cohort. `current_enrollments` is denormalized and
/// maintained incrementally; `Full` holds exactly when the counter is at
/// `max_students`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    pub monthly_price_cents: i64,
    pub max_students: i64,
    pub current_enrollments: i64,
    pub status: SectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SectionStatus {
    Active,
    Full,
    Archived,
}
