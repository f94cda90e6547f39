//! Parking spot HTTP handlers

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::info;

use crate::application::SpotDirectory;
use crate::domain::{DomainError, GeoPoint, NewParkingSpot};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::notifications::SharedBroadcaster;

use super::dto::*;

#[derive(Clone)]
pub struct SpotAppState {
    pub directory: Arc<SpotDirectory>,
    pub broadcaster: SharedBroadcaster,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
}

#[utoipa::path(
    get,
    path = "/api/v1/parking-spots",
    tag = "Parking Spots",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Spots within the radius, nearest first", body = ApiResponse<NearbySpotsResponse>),
        (status = 400, description = "Missing or invalid coordinates")
    )
)]
pub async fn list_nearby_spots(
    State(state): State<SpotAppState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<ApiResponse<NearbySpotsResponse>>> {
    let (Some(latitude), Some(longitude), Some(radius)) =
        (query.latitude, query.longitude, query.radius)
    else {
        return Err(DomainError::InvalidInput(
            "latitude, longitude and radius are required".into(),
        )
        .into());
    };

    let center = GeoPoint::new(latitude, longitude)?;
    let spots: Vec<NearbySpotDto> = state
        .directory
        .nearby(center, radius)
        .await?
        .into_iter()
        .map(NearbySpotDto::from)
        .collect();

    Ok(Json(ApiResponse::success(NearbySpotsResponse {
        meta: NearbyMeta {
            timestamp: Utc::now(),
            total: spots.len(),
            radius,
        },
        spots,
    })))
}

/// Live snapshot stream over Server-Sent Events.
///
/// The first event is the current snapshot; every state change pushes the
/// full snapshot again. The subscription is released when the client leaves.
#[utoipa::path(
    get,
    path = "/api/v1/parking-spots/stream",
    tag = "Parking Spots",
    responses(
        (status = 200, description = "text/event-stream of JSON snapshots", content_type = "text/event-stream")
    )
)]
pub async fn stream_spots(
    State(state): State<SpotAppState>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.broadcaster.subscribe().await?;
    info!(subscriber = %subscription.id(), "📡 SSE stream opened");

    let events =
        subscription.map(|snapshot| Ok::<_, Infallible>(Event::default().data(snapshot.as_ref())));
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/parking-spots",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    request_body = ProvisionSpotRequest,
    responses(
        (status = 201, description = "Spot created", body = ApiResponse<SpotDto>),
        (status = 403, description = "Caller is not an admin"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn provision_spot(
    State(state): State<SpotAppState>,
    ValidatedJson(request): ValidatedJson<ProvisionSpotRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SpotDto>>)> {
    let spot = state
        .directory
        .provision(NewParkingSpot {
            location: GeoPoint::new(request.latitude, request.longitude)?,
            address: request.address,
            price_per_hour: request.price_per_hour,
            spot_type: request.spot_type,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(spot.into()))))
}
