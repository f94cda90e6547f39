//! Live-state notifications
//!
//! The [`Broadcaster`] keeps the registry of live viewers and pushes full
//! occupancy snapshots to them. Transports (SSE, WebSocket) live in
//! `interfaces` and only adapt a [`Subscription`] to their wire format.

pub mod broadcaster;
pub mod snapshot;

pub use broadcaster::{Broadcaster, SharedBroadcaster, Subscription};
pub use snapshot::{render_snapshot, IntervalView, SpotSnapshot};
