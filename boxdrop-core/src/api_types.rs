use serde::{Deserialize, Serialize};

use crate::domain::receipts::{DispatchReport, WorkflowError};
use crate::domain::records::Delivery;

/// Standard API envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

/// How the receipt step of a delivery submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcome {
    Sent,
    RenderFailed,
    InvalidPhone,
    DispatchFailed,
    StorageFailed,
}

/// A stored delivery together with the result of its receipt workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySubmission {
    pub delivery: Delivery,
    pub outcome: ReceiptOutcome,
    pub message: String,
}

impl DeliverySubmission {
    /// `stored` is the delivery as inserted, used when the workflow failed
    /// before returning an updated record.
    pub fn from_workflow(
        stored: Delivery,
        result: &Result<DispatchReport, WorkflowError>,
        refreshed: Option<Delivery>,
    ) -> Self {
        match result {
            Ok(report) => Self {
                delivery: report.delivery.clone(),
                outcome: ReceiptOutcome::Sent,
                message: "Delivery added and receipt sent!".to_string(),
            },
            Err(err) => Self {
                delivery: refreshed.unwrap_or(stored),
                outcome: ReceiptOutcome::from(err),
                message: err.operator_message(),
            },
        }
    }
}

impl From<&WorkflowError> for ReceiptOutcome {
    fn from(err: &WorkflowError) -> Self {
        match err {
            WorkflowError::RenderFailure { .. } => ReceiptOutcome::RenderFailed,
            WorkflowError::InvalidPhone { .. } => ReceiptOutcome::InvalidPhone,
            WorkflowError::DispatchFailure { .. } => ReceiptOutcome::DispatchFailed,
            WorkflowError::NotFound(_) | WorkflowError::Storage(_) => {
                ReceiptOutcome::StorageFailed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MonthQuery {
    pub month: u32,
}
