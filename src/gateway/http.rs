use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::GatewayConfig,
    error::{AppError, Result},
    gateway::{CreateTransactionRequest, CustomerDetails, GatewayTransaction, LineItem, PaymentGateway},
};

/// Hosted-checkout client. The gateway authenticates with the server key as
/// HTTP basic auth username (empty password) and answers transaction
/// creation with a token and redirect URL.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    server_key: String,
}

#[derive(Serialize)]
struct TransactionBody<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: &'a CustomerDetails,
    item_details: &'a [LineItem],
    expiry: Expiry,
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct Expiry {
    unit: &'static str,
    duration: i64,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let (base_url, server_key) = match (config.base_url, config.server_key) {
            (Some(url), Some(key)) => (url, key),
            _ => {
                tracing::warn!("Gateway enabled but missing base_url or server_key");
                return None;
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            client,
            base_url,
            server_key,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<GatewayTransaction> {
        let body = TransactionBody {
            transaction_details: TransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.gross_amount_cents,
            },
            customer_details: &request.customer,
            item_details: &request.line_items,
            expiry: Expiry {
                unit: "minutes",
                duration: request.expiry_minutes,
            },
        };

        let url = format!("{}/v1/transactions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Transaction request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Gateway rejected order {}: {} {}",
                request.order_id, status, text
            )));
        }

        response
            .json::<GatewayTransaction>()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid gateway response: {}", e)))
    }
}
