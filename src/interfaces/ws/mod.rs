//! WebSocket interfaces
//!
//! - `notifications`: live occupancy snapshots for map clients

pub mod notifications;

pub use notifications::{ws_spots_handler, NotificationState};
