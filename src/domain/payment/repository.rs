//! Payment repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewPayment, PaymentReceipt};
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a completed payment for a reservation owned by the payer and,
    /// when the reservation is pending and due, activate it in the same
    /// transaction.
    async fn record(&self, payment: NewPayment, now: DateTime<Utc>) -> DomainResult<PaymentReceipt>;
}
