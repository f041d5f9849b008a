use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled class meeting for a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
}

/// An assignment with a due date; submissions are tracked per student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub due_at: DateTime<Utc>,
}
