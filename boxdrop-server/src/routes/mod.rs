pub mod v1;

use axum::{Router, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{AppState, handlers::health::health_handler};

/// Create the main API router with all versions
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/api/v1", v1::create_v1_router())
}

/// The full application: health check, versioned API and the receipt
/// artifacts under the configured public prefix.
pub fn create_app(state: AppState) -> Router {
    let artifacts = ServeDir::new(&state.config.artifact_dir);
    let prefix = state.config.artifact_public_prefix.trim_matches('/').to_string();

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(create_api_router());
    let router = if prefix.is_empty() {
        router.fallback_service(artifacts)
    } else {
        router.nest_service(&format!("/{prefix}"), artifacts)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
