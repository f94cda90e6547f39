//! Live snapshot payload
//!
//! Wire shape pushed to subscribers: an array ordered by spot id, each entry
//! carrying its live intervals and the derived `isOccupied` flag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::occupancy::{OccupiedInterval, SpotOccupancy};
use crate::domain::{ReservationStatus, SpotType};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntervalView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl From<&OccupiedInterval> for IntervalView {
    fn from(i: &OccupiedInterval) -> Self {
        Self {
            start: i.range.start,
            end: i.range.end,
            status: i.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpotSnapshot {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub is_occupied: bool,
    pub price_per_hour: f64,
    #[serde(rename = "type")]
    pub spot_type: SpotType,
    pub occupied_intervals: Vec<IntervalView>,
}

impl From<&SpotOccupancy> for SpotSnapshot {
    fn from(o: &SpotOccupancy) -> Self {
        Self {
            id: o.spot.id,
            latitude: o.spot.location.latitude,
            longitude: o.spot.location.longitude,
            address: o.spot.address.clone(),
            is_occupied: o.is_occupied(),
            price_per_hour: o.spot.price_per_hour,
            spot_type: o.spot.spot_type,
            occupied_intervals: o.intervals.iter().map(IntervalView::from).collect(),
        }
    }
}

/// Serialize the full snapshot once; the same text goes to every subscriber.
pub fn render_snapshot(occupancy: &[SpotOccupancy]) -> Result<String, serde_json::Error> {
    let spots: Vec<SpotSnapshot> = occupancy.iter().map(SpotSnapshot::from).collect();
    serde_json::to_string(&spots)
}
