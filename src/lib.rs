use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod services;

use config::{Config, StorageBackend};
use services::{
    help_requests::HelpRequestRegistry, live_streams::LiveStreamTracker, storage::ObjectStore,
};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub help_requests: HelpRequestRegistry,
    pub live_streams: LiveStreamTracker,
    pub storage: Arc<dyn ObjectStore>,
}

/// Routes served under `/api`. Kept separate so the binary can wrap them in
/// the rate limiter.
pub fn api_router(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/streams", routes::streams::router())
        .nest("/chat", routes::chat::router())
        .nest("/expert", routes::expert::router())
        .nest(
            "/upload",
            routes::upload::router(config.storage.upload_max_bytes),
        )
}

pub fn app_router(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    let mut router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api);

    // Local uploads are served by this process; the HTTP backend has its own CDN
    if state.config.storage.backend == StorageBackend::Fs {
        router = router.nest_service(
            "/uploads",
            ServeDir::new(&state.config.storage.fs_root),
        );
    }

    router
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
}
