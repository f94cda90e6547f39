//! Lifecycle Scheduler
//!
//! Fixed-cadence background task with two independent jobs:
//! - activation: `pending` with `start <= now` becomes `active`
//! - completion: `active` with `end <= now` becomes `completed`
//!
//! Both jobs of a tick decide against one captured `now`. A failing job is
//! logged and simply runs again on the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::ports::SharedNotifier;
use crate::domain::{DomainResult, RepositoryProvider, Reservation};
use crate::support::shutdown::ShutdownSignal;
use crate::support::time::SharedClock;

/// Configuration for the lifecycle scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Rows moved by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub activated: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Activation,
    Completion,
}

impl Job {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Completion => "completion",
        }
    }
}

pub struct LifecycleScheduler {
    repos: Arc<dyn RepositoryProvider>,
    notifier: SharedNotifier,
    clock: SharedClock,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
}

impl LifecycleScheduler {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: SharedNotifier, clock: SharedClock) -> Self {
        Self {
            repos,
            notifier,
            clock,
            config: SchedulerConfig::default(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the tick loop; it stops when `shutdown` fires.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.running.store(true, Ordering::SeqCst);
            info!(
                interval_secs = self.config.interval_secs,
                "📅 Lifecycle scheduler started"
            );

            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown.notified().wait() => {
                        info!("📅 Lifecycle scheduler shutting down");
                        break;
                    }
                }
            }

            self.running.store(false, Ordering::SeqCst);
            info!("📅 Lifecycle scheduler stopped");
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One tick: activation then completion against the same instant.
    pub async fn run_once(&self) -> TickReport {
        let now = self.clock.now();
        let report = TickReport {
            activated: self.run_activation(now).await,
            completed: self.run_completion(now).await,
        };
        debug!(
            activated = report.activated,
            completed = report.completed,
            "Lifecycle tick finished"
        );
        report
    }

    pub async fn run_activation(&self, now: DateTime<Utc>) -> usize {
        let outcome = self.repos.reservations().activate_due(now).await;
        self.finish(Job::Activation, outcome).await
    }

    pub async fn run_completion(&self, now: DateTime<Utc>) -> usize {
        let outcome = self.repos.reservations().complete_due(now).await;
        self.finish(Job::Completion, outcome).await
    }

    async fn finish(&self, job: Job, outcome: DomainResult<Vec<Reservation>>) -> usize {
        match outcome {
            Ok(moved) if moved.is_empty() => 0,
            Ok(moved) => {
                let ids: Vec<i32> = moved.iter().map(|r| r.id).collect();
                info!(job = job.as_str(), count = moved.len(), ?ids, "🔄 Reservations transitioned");
                metrics::counter!("scheduler_transitions_total", "job" => job.as_str())
                    .increment(moved.len() as u64);
                self.notifier.notify().await;
                moved.len()
            }
            Err(e) => {
                metrics::counter!("scheduler_job_failures_total", "job" => job.as_str()).increment(1);
                warn!(job = job.as_str(), error = %e, "Lifecycle job failed, retrying next tick");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CountingNotifier;
    use crate::application::services::{CreateReservation, ReservationEngine, SpotLocks};
    use crate::domain::ReservationStatus;
    use crate::infrastructure::database::testing::{seed_reservation, seed_spot, test_db};
    use crate::infrastructure::SeaOrmRepositoryProvider;
    use crate::support::time::ManualClock;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, minute, 0).unwrap()
    }

    struct Harness {
        scheduler: Arc<LifecycleScheduler>,
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<CountingNotifier>,
        clock: Arc<ManualClock>,
        db: sea_orm::DatabaseConnection,
    }

    async fn harness() -> Harness {
        let db = test_db().await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let notifier = Arc::new(CountingNotifier::default());
        let clock = Arc::new(ManualClock::new(at(8, 0)));
        let scheduler = Arc::new(LifecycleScheduler::new(
            repos.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        Harness {
            scheduler,
            repos,
            notifier,
            clock,
            db,
        }
    }

    async fn status_of(repos: &Arc<dyn RepositoryProvider>, id: i32) -> ReservationStatus {
        repos.reservations().find_by_id(id).await.unwrap().unwrap().status
    }

    async fn spot_occupied(repos: &Arc<dyn RepositoryProvider>, id: i32) -> bool {
        repos.spots().find_by_id(id).await.unwrap().unwrap().is_occupied
    }

    #[tokio::test]
    async fn example_day_on_one_spot() {
        let h = harness().await;
        let spot = seed_spot(&h.db, 2.0).await;
        let engine = ReservationEngine::new(
            h.repos.clone(),
            Arc::new(SpotLocks::new()),
            h.notifier.clone(),
            h.clock.clone(),
        );
        let request = |start, end| CreateReservation {
            user_id: 1,
            vehicle_id: 1,
            spot_id: spot,
            start,
            end,
        };

        let a = engine.create(request(at(10, 0), at(11, 0))).await.unwrap();
        assert!((a.total_price - 2.0).abs() < 1e-9);
        assert_eq!(
            engine
                .create(request(at(10, 30), at(11, 30)))
                .await
                .unwrap_err()
                .code(),
            "SPOT_UNAVAILABLE"
        );
        let after_create = h.notifier.calls();

        h.clock.set(at(10, 0));
        let tick = h.scheduler.run_once().await;
        assert_eq!(tick, TickReport { activated: 1, completed: 0 });
        assert_eq!(status_of(&h.repos, a.id).await, ReservationStatus::Active);
        assert!(spot_occupied(&h.repos, spot).await);
        assert_eq!(h.notifier.calls(), after_create + 1);

        h.clock.set(at(11, 0));
        let tick = h.scheduler.run_once().await;
        assert_eq!(tick, TickReport { activated: 0, completed: 1 });
        assert_eq!(status_of(&h.repos, a.id).await, ReservationStatus::Completed);
        assert!(!spot_occupied(&h.repos, spot).await);
        assert_eq!(h.notifier.calls(), after_create + 2);
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let h = harness().await;
        let spot = seed_spot(&h.db, 1.0).await;
        seed_reservation(&h.db, spot, at(9, 0), at(12, 0), "pending").await;
        seed_reservation(&h.db, spot, at(7, 0), at(8, 0), "active").await;
        seed_reservation(&h.db, spot, at(13, 0), at(14, 0), "pending").await;

        h.clock.set(at(9, 30));
        let first = h.scheduler.run_once().await;
        assert_eq!(first, TickReport { activated: 1, completed: 1 });
        assert_eq!(h.notifier.calls(), 2);

        let second = h.scheduler.run_once().await;
        assert_eq!(second, TickReport::default());
        assert_eq!(h.notifier.calls(), 2);
    }

    #[tokio::test]
    async fn one_notification_per_job_not_per_row() {
        let h = harness().await;
        for _ in 0..3 {
            let spot = seed_spot(&h.db, 1.0).await;
            seed_reservation(&h.db, spot, at(9, 0), at(10, 0), "pending").await;
        }

        let activated = h.scheduler.run_activation(at(9, 0)).await;
        assert_eq!(activated, 3);
        assert_eq!(h.notifier.calls(), 1);
    }

    #[tokio::test]
    async fn missed_window_completes_in_one_tick() {
        let h = harness().await;
        let spot = seed_spot(&h.db, 1.0).await;
        let id = seed_reservation(&h.db, spot, at(9, 0), at(10, 0), "pending").await;

        h.clock.set(at(12, 0));
        let tick = h.scheduler.run_once().await;
        assert_eq!(tick, TickReport { activated: 1, completed: 1 });
        assert_eq!(status_of(&h.repos, id).await, ReservationStatus::Completed);
        assert!(!spot_occupied(&h.repos, spot).await);
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let h = harness().await;
        h.db.clone().close().await.unwrap();

        let tick = h.scheduler.run_once().await;
        assert_eq!(tick, TickReport::default());
        assert_eq!(h.notifier.calls(), 0);
    }

    #[tokio::test]
    async fn loop_stops_on_shutdown() {
        let h = harness().await;
        let shutdown = ShutdownSignal::new();
        let handle = h.scheduler.clone().start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.scheduler.is_running());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
        assert!(!h.scheduler.is_running());
    }
}
