//! Application services

mod lifecycle_scheduler;
mod reservation_engine;
mod spot_directory;
mod spot_locks;

pub use lifecycle_scheduler::{LifecycleScheduler, SchedulerConfig, TickReport};
pub use reservation_engine::{Actor, CreateReservation, ReservationEngine};
pub use spot_directory::{NearbySpot, SpotDirectory};
pub use spot_locks::SpotLocks;
