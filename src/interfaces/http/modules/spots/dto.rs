//! Parking spot DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::NearbySpot;
use crate::domain::{ParkingSpot, SpotType};
use crate::notifications::IntervalView;

/// Nearby-spots query; all three parameters are required
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in kilometres
    pub radius: Option<f64>,
}

/// Occupancy right now
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotStatusDto {
    /// `pending`, `active` or `available`
    pub current: String,
    pub occupied_since: Option<DateTime<Utc>>,
    pub occupied_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbySpotDto {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub is_occupied: bool,
    pub price_per_hour: f64,
    #[serde(rename = "type")]
    pub spot_type: SpotType,
    pub status: SpotStatusDto,
    /// Kilometres from the query point, two decimals
    pub distance: f64,
    pub occupied_intervals: Vec<IntervalView>,
}

impl From<NearbySpot> for NearbySpotDto {
    fn from(n: NearbySpot) -> Self {
        let o = n.occupancy;
        let status = match &o.current {
            Some(current) => SpotStatusDto {
                current: current.status.to_string(),
                occupied_since: Some(current.range.start),
                occupied_until: Some(current.range.end),
            },
            None => SpotStatusDto {
                current: "available".to_string(),
                occupied_since: None,
                occupied_until: None,
            },
        };
        Self {
            id: o.spot.id,
            latitude: o.spot.location.latitude,
            longitude: o.spot.location.longitude,
            is_occupied: o.is_occupied(),
            price_per_hour: o.spot.price_per_hour,
            spot_type: o.spot.spot_type,
            status,
            distance: (n.distance_km * 100.0).round() / 100.0,
            occupied_intervals: o.intervals.iter().map(IntervalView::from).collect(),
            address: o.spot.address,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyMeta {
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub radius: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NearbySpotsResponse {
    pub spots: Vec<NearbySpotDto>,
    pub meta: NearbyMeta,
}

/// Admin request to register a spot
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionSpotRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(range(min = 0.0))]
    pub price_per_hour: f64,
    #[serde(rename = "type", default = "default_spot_type")]
    pub spot_type: SpotType,
}

fn default_spot_type() -> SpotType {
    SpotType::Standard
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotDto {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub price_per_hour: f64,
    #[serde(rename = "type")]
    pub spot_type: SpotType,
    pub is_occupied: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ParkingSpot> for SpotDto {
    fn from(s: ParkingSpot) -> Self {
        Self {
            id: s.id,
            latitude: s.location.latitude,
            longitude: s.location.longitude,
            address: s.address,
            price_per_hour: s.price_per_hour,
            spot_type: s.spot_type,
            is_occupied: s.is_occupied,
            created_at: s.created_at,
        }
    }
}
