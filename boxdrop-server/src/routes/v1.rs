use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{box_types, deliveries, stores},
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/stores",
            get(stores::list_stores).post(stores::create_store),
        )
        .route("/stores/{id}", get(stores::get_store))
        .route(
            "/stores/{id}/deliveries",
            get(stores::list_store_deliveries),
        )
        .route(
            "/box-types",
            get(box_types::list_box_types).post(box_types::create_box_type),
        )
        .route(
            "/deliveries",
            get(deliveries::list_deliveries).post(deliveries::create_delivery),
        )
        .route("/deliveries/{id}/receipt", post(deliveries::send_receipt))
}
