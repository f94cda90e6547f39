//! Database entities module

pub mod parking_spot;
pub mod payment;
pub mod reservation;

pub use parking_spot::Entity as ParkingSpot;
pub use payment::Entity as Payment;
pub use reservation::Entity as Reservation;
