use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{error, info, warn};

use crate::infra::{app_state::AppState, errors::AppResult};
use boxdrop_core::api_types::{ApiResponse, DeliverySubmission};
use boxdrop_core::domain::receipts::DispatchReport;
use boxdrop_core::domain::records::{Delivery, DeliveryId, NewDelivery};

pub async fn list_deliveries(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Delivery>>>> {
    let deliveries = state.deliveries.list_deliveries().await?;
    Ok(Json(ApiResponse::success(deliveries)))
}

/// Store a delivery and run its receipt workflow.
///
/// Receipt failures do not fail the request: the delivery is already
/// stored, so the response carries the outcome and an operator message.
pub async fn create_delivery(
    State(state): State<AppState>,
    Json(input): Json<NewDelivery>,
) -> AppResult<(StatusCode, Json<ApiResponse<DeliverySubmission>>)> {
    let stored = state.deliveries.create_delivery(input.validated()?).await?;
    info!(delivery = %stored.id, store = %stored.store_id, "delivery stored");

    let result = state.workflow.run(stored.id).await;
    let refreshed = match &result {
        Ok(_) => None,
        Err(err) => {
            error!(
                delivery = %stored.id,
                stage = ?err.stage(),
                kind = err.kind(),
                error = %err,
                "receipt workflow failed"
            );
            if err.receipt_generated() {
                // Pick up the receipt number and artifact path.
                match state.deliveries.get_delivery(stored.id).await {
                    Ok(delivery) => delivery,
                    Err(reload) => {
                        warn!(delivery = %stored.id, error = %reload, "failed to reload delivery");
                        None
                    }
                }
            } else {
                None
            }
        }
    };

    let submission = DeliverySubmission::from_workflow(stored, &result, refreshed);
    let message = submission.message.clone();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(submission).with_message(message)),
    ))
}

/// Run the receipt workflow again. A delivery that already has a receipt is
/// resent with its existing number.
pub async fn send_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DispatchReport>>> {
    let report = state.workflow.run(DeliveryId(id)).await?;
    let message = format!("Receipt {} sent", report.receipt_number);
    Ok(Json(ApiResponse::success(report).with_message(message)))
}
