//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::application::{CreateReservation, ReservationEngine};
use crate::domain::DomainError;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct ReservationAppState {
    pub engine: Arc<ReservationEngine>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created as pending", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid time range (code INVALID_TIME_RANGE)"),
        (status = 404, description = "Parking spot not found"),
        (status = 409, description = "Overlapping reservation exists (code SPOT_UNAVAILABLE)")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ReservationDto>>)> {
    let user_id = request.user_id.unwrap_or(user.user_id);
    if user_id != user.user_id && !user.is_admin() {
        return Err(DomainError::Forbidden("Cannot reserve on behalf of another user".into()).into());
    }

    let created = state
        .engine
        .create(CreateReservation {
            user_id,
            vehicle_id: request.vehicle_id,
            spot_id: request.parking_spot_id,
            start: request.start_time,
            end: request.end_time,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let reservation = state.engine.get(&user.actor(), reservation_id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = i32, Path, description = "Reservation ID")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Updated reservation with recomputed price", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid time range"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Overlap or illegal status transition")
    )
)]
pub async fn update_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateReservationRequest>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let updated = state
        .engine
        .update(&user.actor(), reservation_id, request.into())
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("reservation_id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled (repeat calls succeed)", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already completed")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let cancelled = state.engine.cancel(&user.actor(), reservation_id).await?;
    Ok(Json(ApiResponse::success(cancelled.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Reservations with spot address and rate, newest start first", body = ApiResponse<Vec<UserReservationDto>>),
        (status = 403, description = "Listing another user's reservations")
    )
)]
pub async fn list_user_reservations(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<Vec<UserReservationDto>>>> {
    let history = state.engine.history(&user.actor(), user_id).await?;
    Ok(Json(ApiResponse::success(
        history.into_iter().map(UserReservationDto::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "Owner user ID"),
        ("reservation_id" = i32, Path, description = "Reservation ID")
    ),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Updated reservation with recomputed price", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid time range"),
        (status = 403, description = "Acting for another user"),
        (status = 404, description = "No such reservation for this user"),
        (status = 409, description = "Overlap or illegal status transition")
    )
)]
pub async fn update_user_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path((user_id, reservation_id)): Path<(i32, i32)>,
    ValidatedJson(request): ValidatedJson<UpdateReservationRequest>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let actor = user.actor();
    state
        .engine
        .get_for_user(&actor, user_id, reservation_id)
        .await?;
    let updated = state
        .engine
        .update(&actor, reservation_id, request.into())
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/reservations/{reservation_id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "Owner user ID"),
        ("reservation_id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled (repeat calls succeed)", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Acting for another user"),
        (status = 404, description = "No such reservation for this user"),
        (status = 409, description = "Reservation already completed")
    )
)]
pub async fn cancel_user_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path((user_id, reservation_id)): Path<(i32, i32)>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let actor = user.actor();
    state
        .engine
        .get_for_user(&actor, user_id, reservation_id)
        .await?;
    let cancelled = state.engine.cancel(&actor, reservation_id).await?;
    Ok(Json(ApiResponse::success(cancelled.into())))
}
