//! Outbound ports
//!
//! [`StateChangeNotifier`] decouples the reservation engine and lifecycle
//! scheduler from the live-state transport. The production implementation is
//! [`Broadcaster`](crate::notifications::Broadcaster).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

#[async_trait]
pub trait StateChangeNotifier: Send + Sync {
    /// Push fresh state to every live viewer. Delivery problems are handled
    /// by the implementation and never reach the caller.
    async fn notify(&self);
}

pub type SharedNotifier = Arc<dyn StateChangeNotifier>;

/// Notifier that only counts calls
#[derive(Debug, Default)]
pub struct CountingNotifier {
    calls: AtomicUsize,
}

impl CountingNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateChangeNotifier for CountingNotifier {
    async fn notify(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
