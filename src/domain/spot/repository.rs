//! Parking spot repository interface

use async_trait::async_trait;

use super::model::{NewParkingSpot, ParkingSpot};
use crate::domain::DomainResult;

#[async_trait]
pub trait SpotRepository: Send + Sync {
    /// Find spot by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ParkingSpot>>;

    /// All spots ordered by ID
    async fn find_all(&self) -> DomainResult<Vec<ParkingSpot>>;

    /// Provision a new spot
    async fn create(&self, spot: NewParkingSpot) -> DomainResult<ParkingSpot>;
}
