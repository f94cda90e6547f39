//! Spot lookup and provisioning

use std::sync::Arc;

use tracing::info;

use crate::application::occupancy::{load_occupancy, SpotOccupancy};
use crate::application::ports::SharedNotifier;
use crate::domain::{DomainError, DomainResult, GeoPoint, NewParkingSpot, ParkingSpot, RepositoryProvider};
use crate::support::time::SharedClock;

/// Spot with its occupancy and distance from the query point
#[derive(Debug, Clone)]
pub struct NearbySpot {
    pub occupancy: SpotOccupancy,
    pub distance_km: f64,
}

pub struct SpotDirectory {
    repos: Arc<dyn RepositoryProvider>,
    notifier: SharedNotifier,
    clock: SharedClock,
}

impl SpotDirectory {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: SharedNotifier, clock: SharedClock) -> Self {
        Self {
            repos,
            notifier,
            clock,
        }
    }

    /// Spots within `radius_km` of `center`, nearest first.
    pub async fn nearby(&self, center: GeoPoint, radius_km: f64) -> DomainResult<Vec<NearbySpot>> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(DomainError::InvalidInput(
                "Radius must be a positive number of kilometres".into(),
            ));
        }

        let occupancy = load_occupancy(self.repos.as_ref(), self.clock.now()).await?;
        let mut nearby: Vec<NearbySpot> = occupancy
            .into_iter()
            .map(|occupancy| NearbySpot {
                distance_km: center.distance_km(&occupancy.spot.location),
                occupancy,
            })
            .filter(|s| s.distance_km <= radius_km)
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    /// Register a new spot and push it to live viewers.
    pub async fn provision(&self, spot: NewParkingSpot) -> DomainResult<ParkingSpot> {
        let created = self.repos.spots().create(spot).await?;
        info!(spot_id = created.id, address = %created.address, "📍 Parking spot provisioned");
        self.notifier.notify().await;
        Ok(created)
    }
}
