//! Parking spot aggregate

pub mod model;
pub mod repository;

pub use model::{GeoPoint, NewParkingSpot, ParkingSpot, SpotType};
pub use repository::SpotRepository;
