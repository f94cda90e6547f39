//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to every per-aggregate repository.

use super::payment::PaymentRepository;
use super::reservation::ReservationRepository;
use super::spot::SpotRepository;

pub use crate::support::errors::DomainResult;

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let spot = repos.spots().find_by_id(4).await?;
///     let live = repos.reservations().find_live().await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn spots(&self) -> &dyn SpotRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn payments(&self) -> &dyn PaymentRepository;
}
