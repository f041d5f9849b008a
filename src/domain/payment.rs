use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One gateway-backed attempt to pay an invoice. Created at checkout or by
/// the renewal task; the expiry task is the only writer of `Expired`, the
/// gateway webhook (outside this service) the only writer of `Paid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub gateway_order_id: Option<String>,
    pub gateway_token: Option<String>,
    pub gateway_redirect_url: Option<String>,
    pub status: PaymentStatus,
    pub expired_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Gateway,
    Manual,
}
