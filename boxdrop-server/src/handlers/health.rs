use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    let mut is_unhealthy = false;

    match state.stores.list_stores().await {
        Ok(stores) => {
            health_status["checks"]["database"] = json!({
                "status": "healthy",
                "stores": stores.len(),
            });
        }
        Err(e) => {
            health_status["checks"]["database"] = json!({
                "status": "unhealthy",
                "error": e.to_string()
            });
            is_unhealthy = true;
        }
    }

    let artifacts = state.workflow.layout().dir();
    health_status["checks"]["artifacts"] = json!({
        "status": if artifacts.is_dir() { "healthy" } else { "missing" },
        "path": artifacts.display().to_string(),
    });

    if is_unhealthy {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    } else {
        Ok(Json(health_status))
    }
}
