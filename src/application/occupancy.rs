//! Derived occupancy
//!
//! A spot is occupied iff one of its pending/active reservations contains
//! "now" under half-open `[start, end)` semantics. Both the nearby-spots
//! query and the live snapshot are built from this view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{DomainResult, ParkingSpot, RepositoryProvider, Reservation, ReservationStatus, TimeRange};

#[derive(Debug, Clone, PartialEq)]
pub struct OccupiedInterval {
    pub range: TimeRange,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotOccupancy {
    pub spot: ParkingSpot,
    /// Live intervals ordered by start
    pub intervals: Vec<OccupiedInterval>,
    /// Interval containing the evaluation instant, if any
    pub current: Option<OccupiedInterval>,
}

impl SpotOccupancy {
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}

/// Join spots with their live reservations, evaluated at `now`.
pub fn derive_occupancy(
    spots: Vec<ParkingSpot>,
    live: Vec<Reservation>,
    now: DateTime<Utc>,
) -> Vec<SpotOccupancy> {
    let mut by_spot: HashMap<i32, Vec<OccupiedInterval>> = HashMap::new();
    for r in live.into_iter().filter(|r| r.status.is_live()) {
        by_spot.entry(r.spot_id).or_default().push(OccupiedInterval {
            range: r.range(),
            status: r.status,
        });
    }

    spots
        .into_iter()
        .map(|spot| {
            let mut intervals = by_spot.remove(&spot.id).unwrap_or_default();
            intervals.sort_by_key(|i| i.range.start);
            let current = intervals.iter().find(|i| i.range.contains(now)).cloned();
            SpotOccupancy {
                spot,
                intervals,
                current,
            }
        })
        .collect()
}

/// Read spots and live reservations from the store and derive occupancy.
pub async fn load_occupancy(
    repos: &dyn RepositoryProvider,
    now: DateTime<Utc>,
) -> DomainResult<Vec<SpotOccupancy>> {
    let spots = repos.spots().find_all().await?;
    let live = repos.reservations().find_live().await?;
    Ok(derive_occupancy(spots, live, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoPoint, SpotType};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn spot(id: i32) -> ParkingSpot {
        ParkingSpot {
            id,
            location: GeoPoint {
                latitude: 44.0,
                longitude: 26.0,
            },
            address: format!("Spot {id}"),
            price_per_hour: 2.0,
            spot_type: SpotType::Standard,
            is_occupied: false,
            created_at: at(0),
        }
    }

    fn reservation(id: i32, spot_id: i32, start: u32, end: u32, status: ReservationStatus) -> Reservation {
        Reservation {
            id,
            user_id: 1,
            vehicle_id: 1,
            spot_id,
            start_time: at(start),
            end_time: at(end),
            status,
            total_price: 0.0,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn occupancy_follows_half_open_intervals() {
        let live = vec![
            reservation(2, 1, 12, 13, ReservationStatus::Pending),
            reservation(1, 1, 10, 11, ReservationStatus::Active),
        ];

        let at_ten = derive_occupancy(vec![spot(1), spot(2)], live.clone(), at(10));
        assert!(at_ten[0].is_occupied());
        assert_eq!(at_ten[0].intervals.len(), 2);
        assert_eq!(at_ten[0].intervals[0].range.start, at(10));
        assert!(!at_ten[1].is_occupied());
        assert!(at_ten[1].intervals.is_empty());

        let at_eleven = derive_occupancy(vec![spot(1)], live, at(11));
        assert!(!at_eleven[0].is_occupied());
    }

    #[test]
    fn pending_interval_covering_now_counts() {
        let live = vec![reservation(1, 1, 10, 11, ReservationStatus::Pending)];
        let view = derive_occupancy(vec![spot(1)], live, at(10));
        assert_eq!(
            view[0].current.as_ref().map(|c| c.status),
            Some(ReservationStatus::Pending)
        );
    }

    #[test]
    fn terminal_reservations_ignored() {
        let live = vec![reservation(1, 1, 9, 12, ReservationStatus::Cancelled)];
        let view = derive_occupancy(vec![spot(1)], live, at(10));
        assert!(!view[0].is_occupied());
        assert!(view[0].intervals.is_empty());
    }
}
