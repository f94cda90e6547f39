//! Live-State Broadcaster
//!
//! Process-local registry of snapshot subscribers. Every subscriber gets the
//! current snapshot on registration and the same full snapshot on every
//! [`Broadcaster::notify`]. A subscriber whose channel is closed or full is
//! dropped from the registry; dropping the [`Subscription`] unregisters it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::render_snapshot;
use crate::application::occupancy::load_occupancy;
use crate::application::ports::StateChangeNotifier;
use crate::domain::{DomainResult, RepositoryProvider};
use crate::support::time::SharedClock;

/// Default per-subscriber buffer (snapshots)
const DEFAULT_BUFFER: usize = 16;

type Registry = DashMap<Uuid, mpsc::Sender<Arc<str>>>;

pub struct Broadcaster {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
    subscribers: Arc<Registry>,
    buffer: usize,
    /// Serializes snapshot builds so subscribers see snapshots in commit order.
    render_lock: Mutex<()>,
}

impl Broadcaster {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self {
            repos,
            clock,
            subscribers: Arc::new(DashMap::new()),
            buffer: DEFAULT_BUFFER,
            render_lock: Mutex::new(()),
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Register a subscriber and queue the current snapshot as its first message.
    pub async fn subscribe(&self) -> DomainResult<Subscription> {
        let _render = self.render_lock.lock().await;
        let payload = self.render().await?;

        let (sender, receiver) = mpsc::channel(self.buffer);
        // Fresh channel with capacity >= 1
        let _ = sender.try_send(payload);

        let id = Uuid::new_v4();
        self.subscribers.insert(id, sender);
        self.record_gauge();
        info!(subscriber = %id, total = self.subscribers.len(), "👀 Live subscriber connected");

        Ok(Subscription {
            id,
            receiver,
            registry: self.subscribers.clone(),
        })
    }

    /// Recompute the snapshot and push it to everyone.
    ///
    /// Failures never reach the caller: a store error skips this round, a
    /// failed delivery removes that subscriber.
    pub async fn notify(&self) {
        let _render = self.render_lock.lock().await;
        if self.subscribers.is_empty() {
            debug!("State changed, no live subscribers");
            return;
        }

        let payload = match self.render().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to build live snapshot");
                return;
            }
        };

        let failed: Vec<Uuid> = self
            .subscribers
            .iter()
            .filter_map(|entry| match entry.value().try_send(payload.clone()) {
                Ok(()) => None,
                Err(_) => Some(*entry.key()),
            })
            .collect();

        for id in &failed {
            self.subscribers.remove(id);
            warn!(subscriber = %id, "Dropping live subscriber after failed delivery");
        }

        metrics::counter!("broadcast_notifications_total").increment(1);
        self.record_gauge();
        debug!(
            delivered = self.subscribers.len(),
            dropped = failed.len(),
            "Live snapshot broadcast"
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drop every subscriber; their streams end once drained.
    pub fn close_all(&self) {
        let count = self.subscribers.len();
        self.subscribers.clear();
        self.record_gauge();
        info!(count, "👋 Live subscribers closed");
    }

    async fn render(&self) -> DomainResult<Arc<str>> {
        let occupancy = load_occupancy(self.repos.as_ref(), self.clock.now()).await?;
        Ok(Arc::from(render_snapshot(&occupancy)?))
    }

    fn record_gauge(&self) {
        metrics::gauge!("broadcast_subscribers").set(self.subscribers.len() as f64);
    }
}

#[async_trait]
impl StateChangeNotifier for Broadcaster {
    async fn notify(&self) {
        Broadcaster::notify(self).await
    }
}

/// Shared broadcaster type
pub type SharedBroadcaster = Arc<Broadcaster>;

/// Registered snapshot feed
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<Arc<str>>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next serialized snapshot; `None` once the broadcaster dropped us.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = Arc<str>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            metrics::gauge!("broadcast_subscribers").set(self.registry.len() as f64);
            info!(subscriber = %self.id, remaining = self.registry.len(), "Live subscriber disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{CreateReservation, ReservationEngine, SpotLocks};
    use crate::infrastructure::database::testing::{seed_spot, test_db};
    use crate::infrastructure::SeaOrmRepositoryProvider;
    use crate::support::time::ManualClock;
    use chrono::{DateTime, TimeZone, Utc};
    use futures_util::StreamExt;
    use std::time::Duration;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<Broadcaster>, Arc<dyn RepositoryProvider>, Arc<ManualClock>, i32) {
        let db = test_db().await;
        let spot = seed_spot(&db, 2.0).await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        let clock = Arc::new(ManualClock::new(at(8)));
        let broadcaster = Arc::new(Broadcaster::new(repos.clone(), clock.clone()).with_buffer(2));
        (broadcaster, repos, clock, spot)
    }

    fn parse(payload: &str) -> serde_json::Value {
        serde_json::from_str(payload).unwrap()
    }

    async fn next(sub: &mut Subscription) -> serde_json::Value {
        let payload = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("snapshot expected")
            .expect("subscription open");
        parse(&payload)
    }

    #[tokio::test]
    async fn first_message_is_current_snapshot() {
        let (broadcaster, _, _, spot) = setup().await;
        let mut sub = broadcaster.subscribe().await.unwrap();

        let snapshot = next(&mut sub).await;
        assert_eq!(snapshot[0]["id"], spot);
        assert_eq!(snapshot[0]["isOccupied"], false);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn every_subscriber_sees_committed_reservation() {
        let (broadcaster, repos, clock, spot) = setup().await;
        let engine = ReservationEngine::new(
            repos,
            Arc::new(SpotLocks::new()),
            broadcaster.clone(),
            clock.clone(),
        );
        let mut first = broadcaster.subscribe().await.unwrap();
        let mut second = broadcaster.subscribe().await.unwrap();
        next(&mut first).await;
        next(&mut second).await;

        engine
            .create(CreateReservation {
                user_id: 1,
                vehicle_id: 1,
                spot_id: spot,
                start: at(10),
                end: at(11),
            })
            .await
            .unwrap();

        for sub in [&mut first, &mut second] {
            let snapshot = next(sub).await;
            assert_eq!(snapshot[0]["occupiedIntervals"][0]["status"], "pending");
            assert_eq!(snapshot[0]["isOccupied"], false);
        }

        clock.set(at(10));
        broadcaster.notify().await;
        assert_eq!(next(&mut first).await[0]["isOccupied"], true);
    }

    #[tokio::test]
    async fn dropped_subscription_unregisters() {
        let (broadcaster, _, _, _) = setup().await;
        let sub = broadcaster.subscribe().await.unwrap();
        let keep = broadcaster.subscribe().await.unwrap();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 1);
        broadcaster.notify().await;
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(keep);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn stalled_subscriber_is_removed_without_affecting_others() {
        let (broadcaster, _, _, _) = setup().await;
        // Buffer of 2: initial snapshot + one more fills it
        let stalled = broadcaster.subscribe().await.unwrap();
        let mut healthy = broadcaster.subscribe().await.unwrap();
        next(&mut healthy).await;

        broadcaster.notify().await;
        next(&mut healthy).await;
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.notify().await;
        assert_eq!(broadcaster.subscriber_count(), 1);
        next(&mut healthy).await;

        // The removed subscriber still drains what it had, then ends
        let drained: Vec<_> = stalled.collect().await;
        assert_eq!(drained.len(), 2);
    }

    #[tokio::test]
    async fn close_all_ends_streams() {
        let (broadcaster, _, _, _) = setup().await;
        let mut sub = broadcaster.subscribe().await.unwrap();
        next(&mut sub).await;

        broadcaster.close_all();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(sub.recv().await.is_none());
    }
}
