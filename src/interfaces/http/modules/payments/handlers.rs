//! Payment HTTP handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::reservations::ReservationAppState;

use super::dto::*;

/// Record a completed payment for one of the caller's reservations.
///
/// A pending reservation whose start time has passed is activated in the
/// same transaction; earlier payments leave activation to the scheduler.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = ProcessPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<PaymentResponse>),
        (status = 404, description = "No such reservation for this user"),
        (status = 409, description = "Reservation is cancelled or completed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn process_payment(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ProcessPaymentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PaymentResponse>>)> {
    let receipt = state
        .engine
        .process_payment(
            &user.actor(),
            request.reservation_id,
            request.amount,
            request.payment_method,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt.into()))))
}
