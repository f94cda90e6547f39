//! Reservation aggregate
//!
//! Contains the Reservation entity, its lifecycle rules, and repository interface.

pub mod model;
pub mod repository;

pub use model::{
    NewReservation, PlannedUpdate, Reservation, ReservationChanges, ReservationStatus, TimeRange,
};
pub use repository::ReservationRepository;
