pub mod occupancy;
pub mod ports;
pub mod services;

pub use occupancy::{derive_occupancy, load_occupancy, OccupiedInterval, SpotOccupancy};
pub use ports::{SharedNotifier, StateChangeNotifier};
pub use services::{
    Actor, CreateReservation, LifecycleScheduler, NearbySpot, ReservationEngine, SchedulerConfig,
    SpotDirectory, SpotLocks, TickReport,
};
