//! Parking spot lookup, live stream and provisioning

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
