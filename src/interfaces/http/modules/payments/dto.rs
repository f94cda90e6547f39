//! Payment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Payment, PaymentMethod, PaymentReceipt, PaymentStatus};
use crate::interfaces::http::modules::reservations::ReservationDto;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    #[validate(range(min = 1))]
    pub reservation_id: i32,
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub amount: f64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: i32,
    pub reservation_id: i32,
    pub user_id: i32,
    pub amount: f64,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            reservation_id: p.reservation_id,
            user_id: p.user_id,
            amount: p.amount,
            status: p.status,
            payment_method: p.method,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment: PaymentDto,
    pub reservation: ReservationDto,
    /// Whether this payment moved the reservation to `active`
    pub activated: bool,
}

impl From<PaymentReceipt> for PaymentResponse {
    fn from(r: PaymentReceipt) -> Self {
        Self {
            payment: r.payment.into(),
            reservation: r.reservation.into(),
            activated: r.activated,
        }
    }
}
