//! API router with Swagger UI

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{ReservationEngine, SpotDirectory};
use crate::domain::{PaymentMethod, PaymentStatus, ReservationStatus, SpotType};
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{admin_middleware, auth_middleware, AuthState};
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::metrics::{self, http_metrics_middleware, MetricsState};
use crate::interfaces::http::modules::payments;
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::reservations::{self, ReservationAppState};
use crate::interfaces::http::modules::spots::{self, SpotAppState};
use crate::interfaces::ws::{ws_spots_handler, NotificationState};
use crate::notifications::{IntervalView, SharedBroadcaster, SpotSnapshot};

/// Everything the handlers need. Each handler extracts its own slice via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ReservationEngine>,
    pub directory: Arc<SpotDirectory>,
    pub broadcaster: SharedBroadcaster,
    pub auth: AuthState,
    pub db: DatabaseConnection,
    pub metrics: PrometheusHandle,
    pub started_at: Arc<Instant>,
    /// SSE keep-alive interval
    pub keep_alive: Duration,
}

impl FromRef<ApiState> for SpotAppState {
    fn from_ref(s: &ApiState) -> Self {
        SpotAppState {
            directory: Arc::clone(&s.directory),
            broadcaster: Arc::clone(&s.broadcaster),
            keep_alive: s.keep_alive,
        }
    }
}

impl FromRef<ApiState> for ReservationAppState {
    fn from_ref(s: &ApiState) -> Self {
        ReservationAppState {
            engine: Arc::clone(&s.engine),
        }
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        HealthState {
            db: s.db.clone(),
            broadcaster: Arc::clone(&s.broadcaster),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

impl FromRef<ApiState> for NotificationState {
    fn from_ref(s: &ApiState) -> Self {
        NotificationState {
            broadcaster: Arc::clone(&s.broadcaster),
        }
    }
}

impl FromRef<ApiState> for MetricsState {
    fn from_ref(s: &ApiState) -> Self {
        MetricsState {
            handle: s.metrics.clone(),
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by the identity service"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        spots::list_nearby_spots,
        spots::stream_spots,
        spots::provision_spot,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::update_reservation,
        reservations::cancel_reservation,
        reservations::list_user_reservations,
        reservations::update_user_reservation,
        reservations::cancel_user_reservation,
        payments::process_payment,
    ),
    components(
        schemas(
            ApiResponse<String>,
            ReservationStatus,
            SpotType,
            PaymentMethod,
            PaymentStatus,
            SpotSnapshot,
            IntervalView,
            health::HealthResponse,
            health::ComponentHealth,
            spots::NearbySpotsResponse,
            spots::NearbySpotDto,
            spots::NearbyMeta,
            spots::SpotStatusDto,
            spots::ProvisionSpotRequest,
            spots::SpotDto,
            reservations::CreateReservationRequest,
            reservations::UpdateReservationRequest,
            reservations::ReservationDto,
            reservations::UserReservationDto,
            payments::ProcessPaymentRequest,
            payments::PaymentDto,
            payments::PaymentResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Parking Spots", description = "Nearby search, live occupancy stream, provisioning"),
        (name = "Reservations", description = "Overlap-safe reservations on parking spots"),
        (name = "Payments", description = "Payment records for reservations"),
    ),
    info(
        title = "Parking Reservation API",
        version = "1.0.0",
        description = "Parking spot search, reservations and live occupancy"
    )
)]
pub struct ApiDoc;

/// Build the full HTTP application
pub fn create_api_router(state: ApiState) -> Router {
    let auth_state = state.auth.clone();

    // ── Public ────────────────────────────────────────────────
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/api/v1/parking-spots", get(spots::list_nearby_spots))
        .route("/api/v1/parking-spots/stream", get(spots::stream_spots))
        .route("/api/v1/parking-spots/ws", get(ws_spots_handler));

    // ── Authenticated ─────────────────────────────────────────
    let user_routes = Router::new()
        .route("/api/v1/reservations", post(reservations::create_reservation))
        .route(
            "/api/v1/reservations/{reservation_id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::cancel_reservation),
        )
        .route(
            "/api/v1/users/{user_id}/reservations",
            get(reservations::list_user_reservations),
        )
        .route(
            "/api/v1/users/{user_id}/reservations/{reservation_id}",
            put(reservations::update_user_reservation)
                .delete(reservations::cancel_user_reservation),
        )
        .route("/api/v1/payments", post(payments::process_payment))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    // ── Admin ─────────────────────────────────────────────────
    let admin_routes = Router::new()
        .route("/api/v1/admin/parking-spots", post(spots::provision_spot))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
