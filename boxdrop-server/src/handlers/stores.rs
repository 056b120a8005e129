use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};
use boxdrop_core::api_types::{ApiResponse, MonthQuery};
use boxdrop_core::domain::records::{Delivery, NewStore, Store, StoreId};

pub async fn list_stores(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Store>>>> {
    let stores = state.stores.list_stores().await?;
    Ok(Json(ApiResponse::success(stores)))
}

pub async fn create_store(
    State(state): State<AppState>,
    Json(input): Json<NewStore>,
) -> AppResult<(StatusCode, Json<ApiResponse<Store>>)> {
    let store = state.stores.create_store(input.validated()?).await?;
    info!(store = %store.id, name = %store.name, "store created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(store).with_message("Store added!".to_string())),
    ))
}

pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Store>>> {
    let id = StoreId(id);
    let store = state
        .stores
        .get_store(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{id} not found")))?;
    Ok(Json(ApiResponse::success(store)))
}

/// Deliveries of one store whose date falls in the given month of any year.
pub async fn list_store_deliveries(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ApiResponse<Vec<Delivery>>>> {
    let id = StoreId(id);
    if state.stores.get_store(id).await?.is_none() {
        return Err(AppError::not_found(format!("{id} not found")));
    }
    let deliveries = state
        .deliveries
        .list_deliveries_for_store_month(id, query.month)
        .await?;
    Ok(Json(ApiResponse::success(deliveries)))
}
