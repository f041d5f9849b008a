use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    gateway::{CreateTransactionRequest, GatewayTransaction, PaymentGateway},
};

/// In-memory gateway for tests: records every request and hands back a
/// deterministic token/redirect pair, or fails on demand.
#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<CreateTransactionRequest>>,
    fail: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CreateTransactionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<GatewayTransaction> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("Simulated gateway outage".to_string()));
        }

        let transaction = GatewayTransaction {
            token: format!("tok-{}", request.order_id),
            redirect_url: format!("https://pay.example.test/redirect/{}", request.order_id),
        };
        self.requests.lock().unwrap().push(request);

        Ok(transaction)
    }
}
