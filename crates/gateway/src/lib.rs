//! bibstore API gateway
//!
//! Serves the `/v2` REST surface:
//! - Token issue and bearer authentication
//! - Generic CRUD and bulk create for every corpus table
//! - Checksum lookups, identity resolution and disambiguation runs
//! - Rate limiting, request ids, tracing and request metrics

pub mod handlers;
pub mod middleware;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use bibstore_common::{
    auth::JwtManager,
    config::AppConfig,
    db::resource::{
        AffiliationInstances, Affiliations, AuthorIdentities, AuthorInstances, Authors, Corpora,
        DisambiguationModels, InstanceIdentifiers, InstanceMetadata, InstitutionIdentities,
        InstitutionInstances, Institutions, PaperIdentities, PaperInstances, Papers, API_PREFIX,
    },
    DbPool, Repository,
};
use handlers::resources::routes;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let jwt = JwtManager::new(&config.auth.jwt_secret, config.auth.jwt_expiration_secs);
        Self {
            config: Arc::new(config),
            repo: Repository::new(db),
            jwt: Arc::new(jwt),
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/auth/token", post(handlers::auth::issue_token))
        // Accounts
        .route("/user", get(handlers::users::list_users))
        .route("/user/{id}", get(handlers::users::get_user))
        // Re-import detection
        .route(
            "/paper_instance/checksum",
            get(handlers::checksum::checksum_exists).post(handlers::checksum::checksums_present),
        )
        // Identity
        .route("/resolve/{kind}/{instance_id}", get(handlers::identity::resolve_identity))
        .route("/disambiguation", post(handlers::identity::record_disambiguation))
        // Tables
        .merge(routes::<Corpora>())
        .merge(routes::<DisambiguationModels>())
        .merge(routes::<Papers>())
        .merge(routes::<PaperInstances>())
        .merge(routes::<InstanceMetadata>())
        .merge(routes::<InstanceIdentifiers>())
        .merge(routes::<Authors>())
        .merge(routes::<AuthorInstances>())
        .merge(routes::<Institutions>())
        .merge(routes::<InstitutionInstances>())
        .merge(routes::<AffiliationInstances>())
        .merge(routes::<AuthorIdentities>())
        .merge(routes::<InstitutionIdentities>())
        .merge(routes::<PaperIdentities>())
        .merge(routes::<Affiliations>());

    let mut app = Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()));

    if let Some(limit) = middleware::rate_limit::create_rate_limiter(&state.config.rate_limit) {
        app = app.layer(axum::middleware::from_fn_with_state(
            limit,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Request ids are set before anything else sees the request
    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
