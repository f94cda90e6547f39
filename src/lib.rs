//! # Parking Service
//!
//! Backend for reserving parking spots: overlap-safe reservations, a
//! lifecycle scheduler and a live occupancy feed over SSE and WebSocket.
//!
//! ## Architecture
//!
//! - **domain**: Spots, reservations, payments and the repository traits
//! - **application**: Reservation engine, lifecycle scheduler, spot directory
//! - **infrastructure**: SeaORM persistence, migrations, JWT verification
//! - **notifications**: Live-state broadcaster and snapshot rendering
//! - **interfaces**: REST API (with Swagger), SSE and WebSocket transports
//! - **server**: Runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod notifications;
pub mod server;
pub mod support;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::create_api_router;
pub use notifications::{Broadcaster, SharedBroadcaster};
pub use server::{ServerHandle, ServerOptions};
