pub mod http;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use http::HttpGateway;

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    /// Caller-chosen order identifier; the renewal task uses the invoice
    /// number so gateway records stay joinable to ours.
    pub order_id: String,
    pub gross_amount_cents: i64,
    pub customer: CustomerDetails,
    pub line_items: Vec<LineItem>,
    pub expiry_minutes: i64,
}

/// What the hosted-checkout endpoint hands back: a token for embedding and
/// a URL the student can be redirected to.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayTransaction {
    pub token: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<GatewayTransaction>;
}
