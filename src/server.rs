//! Service runtime
//!
//! [`ServerHandle`] owns the full lifecycle: metrics recorder, database and
//! migrations, the reservation engine, the lifecycle scheduler, the live-state
//! broadcaster and the HTTP server, plus graceful shutdown of all of them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{LifecycleScheduler, ReservationEngine, SharedNotifier, SpotDirectory, SpotLocks};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, SeaOrmRepositoryProvider};
use crate::interfaces::http::middleware::AuthState;
use crate::interfaces::http::modules::metrics::prometheus_handle;
use crate::interfaces::http::{create_api_router, ApiState};
use crate::notifications::{Broadcaster, SharedBroadcaster};
use crate::support::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::support::time::{SharedClock, SystemClock};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running parking service.
///
/// ```rust,no_run
/// use parking_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub engine: Arc<ReservationEngine>,
    pub broadcaster: SharedBroadcaster,
    pub scheduler: Arc<LifecycleScheduler>,
    pub config: AppConfig,
    /// Bound address of the HTTP server (resolves port 0)
    pub api_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    scheduler_task: JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting parking service v{}...", env!("CARGO_PKG_VERSION"));

        let prometheus = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db = init_database(&config.database_config()).await?;
        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Core services ──────────────────────────────────────
        let clock: SharedClock = Arc::new(SystemClock);
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        let broadcaster = Arc::new(
            Broadcaster::new(repos.clone(), clock.clone())
                .with_buffer(config.broadcast.subscriber_buffer),
        );
        let notifier: SharedNotifier = broadcaster.clone();
        info!("🔔 Live-state broadcaster ready");

        let engine = Arc::new(ReservationEngine::new(
            repos.clone(),
            Arc::new(SpotLocks::new()),
            notifier.clone(),
            clock.clone(),
        ));
        let directory = Arc::new(SpotDirectory::new(repos.clone(), notifier.clone(), clock.clone()));

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let scheduler = Arc::new(
            LifecycleScheduler::new(repos.clone(), notifier, clock)
                .with_config(config.scheduler_config()),
        );
        let scheduler_task = scheduler.clone().start(shutdown.signal());

        // ── REST API server ────────────────────────────────────
        let router = create_api_router(ApiState {
            engine: engine.clone(),
            directory,
            broadcaster: broadcaster.clone(),
            auth: AuthState {
                jwt_config: config.jwt_config(),
            },
            db: db.clone(),
            metrics: prometheus,
            started_at: Arc::new(Instant::now()),
            keep_alive: Duration::from_secs(config.broadcast.keep_alive_secs.max(1)),
        });

        let listener = tokio::net::TcpListener::bind(config.api_addr()).await?;
        let api_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown.signal();
        let shutdown_broadcaster = broadcaster.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            // Open SSE/WebSocket streams end once their subscription is gone
            shutdown_broadcaster.close_all();
            info!("🛑 REST API server received shutdown signal");
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Parking service started");

        Ok(Self {
            repos,
            engine,
            broadcaster,
            scheduler,
            config,
            api_addr,
            db,
            shutdown,
            api_task,
            scheduler_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then stop every task within the
    /// configured timeout and close the database.
    pub async fn wait(self) {
        let Self {
            broadcaster,
            db,
            shutdown,
            api_task,
            scheduler_task,
            ..
        } = self;

        let finished = shutdown
            .shutdown_with_cleanup(|| async move {
                info!("⏳ Waiting for server tasks to complete...");
                if let Err(e) = api_task.await {
                    error!("REST API server task panicked: {}", e);
                }
                if let Err(e) = scheduler_task.await {
                    error!("Lifecycle scheduler task panicked: {}", e);
                }
                broadcaster.close_all();
            })
            .await;
        if !finished {
            warn!("Shutdown timed out; closing database anyway");
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }
        info!("👋 Parking service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down parking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished() || !self.scheduler_task.is_finished()
    }
}

// ── Tracing ────────────────────────────────────────────────────────

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// `logging.level`. Call once, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".into();
        config.server.api_port = 0;
        config.server.shutdown_timeout = 5;
        config.database.url = "sqlite::memory:".into();
        config.database.max_connections = 1;
        config
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_health_and_shuts_down() {
        let handle = ServerHandle::start(ServerOptions {
            config: test_config(),
            auto_migrate: true,
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let response = http_get(handle.api_addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
        assert!(response.contains("\"status\":\"ok\""));

        let scheduler = handle.scheduler.clone();
        tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown should complete");
        assert!(!scheduler.is_running());
    }
}
