pub mod reconciliation;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ReconciliationConfig;
use crate::gateway::PaymentGateway;
use crate::repository::*;

pub struct ServiceContext {
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub invoice_repo: Arc<dyn InvoiceRepository>,
    pub enrollment_repo: Arc<dyn EnrollmentRepository>,
    pub section_repo: Arc<dyn SectionRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub waiting_list_repo: Arc<dyn WaitingListRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub reminder_repo: Arc<dyn ReminderRepository>,
    pub lease_repo: Arc<dyn LeaseRepository>,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub reconciliation: ReconciliationConfig,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    /// Wire every Sqlite repository off one pool. Tests and `main` share
    /// this; tests swap in a FakeGateway.
    pub fn from_pool(
        pool: SqlitePool,
        gateway: Option<Arc<dyn PaymentGateway>>,
        reconciliation: ReconciliationConfig,
    ) -> Self {
        Self {
            payment_repo: Arc::new(SqlitePaymentRepository::new(pool.clone())),
            invoice_repo: Arc::new(SqliteInvoiceRepository::new(pool.clone())),
            enrollment_repo: Arc::new(SqliteEnrollmentRepository::new(pool.clone())),
            section_repo: Arc::new(SqliteSectionRepository::new(pool.clone())),
            student_repo: Arc::new(SqliteStudentRepository::new(pool.clone())),
            waiting_list_repo: Arc::new(SqliteWaitingListRepository::new(pool.clone())),
            notification_repo: Arc::new(SqliteNotificationRepository::new(pool.clone())),
            reminder_repo: Arc::new(SqliteReminderRepository::new(pool.clone())),
            lease_repo: Arc::new(SqliteLeaseRepository::new(pool.clone())),
            gateway,
            reconciliation,
            db_pool: pool,
        }
    }
}
