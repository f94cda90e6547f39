//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewReservation, Reservation, ReservationChanges};
use crate::domain::DomainResult;

/// Every write runs as one store transaction; a failed call leaves no
/// partial state behind.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find reservation by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    /// All reservations of a user, newest start first
    async fn find_by_user(&self, user_id: i32) -> DomainResult<Vec<Reservation>>;

    /// Pending and active reservations across all spots
    async fn find_live(&self) -> DomainResult<Vec<Reservation>>;

    /// Lock the spot row, reject on any overlapping live reservation,
    /// price the interval and insert as pending.
    async fn create_exclusive(
        &self,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation>;

    /// Apply `changes` under the spot lock. A changed interval is rechecked
    /// for overlap (excluding the reservation itself) and repriced.
    async fn update_exclusive(
        &self,
        id: i32,
        changes: ReservationChanges,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation>;

    /// Set status to cancelled. Cancelling twice returns the stored row.
    async fn cancel(&self, id: i32, now: DateTime<Utc>) -> DomainResult<Reservation>;

    /// Promote every pending reservation with `start <= now` to active.
    async fn activate_due(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// Retire every active reservation with `end <= now` as completed.
    async fn complete_due(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;
}
