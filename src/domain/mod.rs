pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod spot;

// Re-export commonly used types
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentReceipt, PaymentStatus};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{NewReservation, Reservation, ReservationChanges, ReservationStatus, TimeRange};
pub use spot::{GeoPoint, NewParkingSpot, ParkingSpot, SpotType};

pub use crate::support::errors::DomainError;
