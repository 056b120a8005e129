use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};
use boxdrop_core::api_types::ApiResponse;
use boxdrop_core::domain::records::{BoxType, NewBoxType};

pub async fn list_box_types(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<BoxType>>>> {
    let box_types = state.box_types.list_box_types().await?;
    Ok(Json(ApiResponse::success(box_types)))
}

pub async fn create_box_type(
    State(state): State<AppState>,
    Json(input): Json<NewBoxType>,
) -> AppResult<(StatusCode, Json<ApiResponse<BoxType>>)> {
    let box_type = state.box_types.create_box_type(input.validated()?).await?;
    info!(box_type = %box_type.id, name = %box_type.type_name, "box type created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(box_type).with_message("Box type added!".to_string())),
    ))
}
