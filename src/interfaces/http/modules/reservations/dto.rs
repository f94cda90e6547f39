//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{ParkingSpot, Reservation, ReservationChanges, ReservationStatus};

/// Request to book a spot for `[startTime, endTime)`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    /// Defaults to the caller; only admins may book for someone else
    #[validate(range(min = 1))]
    pub user_id: Option<i32>,
    #[validate(range(min = 1))]
    pub vehicle_id: i32,
    #[validate(range(min = 1))]
    pub parking_spot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Partial update; omitted fields stay unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
}

impl From<UpdateReservationRequest> for ReservationChanges {
    fn from(r: UpdateReservationRequest) -> Self {
        Self {
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: i32,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub parking_spot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            parking_spot_id: r.spot_id,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            total_price: r.total_price,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Entry of a user's reservation history, with the booked spot's address and rate
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserReservationDto {
    #[serde(flatten)]
    pub reservation: ReservationDto,
    pub address: Option<String>,
    pub price_per_hour: Option<f64>,
}

impl From<(Reservation, Option<ParkingSpot>)> for UserReservationDto {
    fn from((reservation, spot): (Reservation, Option<ParkingSpot>)) -> Self {
        let (address, price_per_hour) = match spot {
            Some(spot) => (Some(spot.address), Some(spot.price_per_hour)),
            None => (None, None),
        };
        Self {
            reservation: reservation.into(),
            address,
            price_per_hour,
        }
    }
}
