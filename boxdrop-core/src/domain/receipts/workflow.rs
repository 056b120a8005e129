use std::{any::type_name_of_val, fmt, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::ports::deliveries::DeliveryRepository;
use crate::domain::receipts::{
    artifacts::ArtifactLayout,
    dispatch::{DispatchError, Dispatcher, receipt_caption},
    numbering::ReceiptNumberAllocator,
    phone::normalize_phone,
    render::{ReceiptFields, ReceiptRenderer, RenderError},
};
use crate::domain::records::{Delivery, DeliveryId, ReceiptContext};
use crate::error::BoxdropError;

/// Progress of one delivery through the receipt workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Created,
    NumberAllocated,
    Rendered,
    ArtifactPersisted,
    PhoneValid,
    Dispatched,
    Aborted,
}

/// Successful outcome: the receipt exists, is recorded, and was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivery: Delivery,
    pub receipt_number: i64,
    pub artifact_path: String,
    pub destination: String,
    /// True when an already numbered receipt was sent again instead of
    /// issuing a new one.
    pub resent: bool,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} does not exist")]
    NotFound(DeliveryId),

    /// Nothing was recorded; the delivery stays unnumbered.
    #[error("failed to render receipt {receipt_number}: {source}")]
    RenderFailure {
        receipt_number: i64,
        #[source]
        source: RenderError,
    },

    /// The receipt is numbered and stored but was not sent.
    #[error("invalid phone number for {store_name}; receipt {receipt_number} generated but not sent")]
    InvalidPhone {
        store_name: String,
        receipt_number: i64,
    },

    /// The receipt is numbered and stored; only the send failed.
    #[error("failed to send receipt {receipt_number}: {}", .source.detail())]
    DispatchFailure {
        receipt_number: i64,
        #[source]
        source: DispatchError,
    },

    #[error(transparent)]
    Storage(#[from] BoxdropError),
}

impl WorkflowError {
    /// Stage the delivery was left in.
    pub fn stage(&self) -> WorkflowStage {
        match self {
            WorkflowError::NotFound(_) | WorkflowError::Storage(_) => WorkflowStage::Aborted,
            WorkflowError::RenderFailure { .. } => WorkflowStage::NumberAllocated,
            WorkflowError::InvalidPhone { .. } => WorkflowStage::Aborted,
            WorkflowError::DispatchFailure { .. } => WorkflowStage::PhoneValid,
        }
    }

    /// Stable machine-readable name for API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::RenderFailure { .. } => "render_failed",
            WorkflowError::InvalidPhone { .. } => "invalid_phone",
            WorkflowError::DispatchFailure { .. } => "dispatch_failed",
            WorkflowError::Storage(_) => "storage_failed",
        }
    }

    /// Whether a numbered receipt document exists despite the failure.
    pub fn receipt_generated(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidPhone { .. } | WorkflowError::DispatchFailure { .. }
        )
    }

    pub fn operator_message(&self) -> String {
        match self {
            WorkflowError::NotFound(id) => format!("Delivery {} was not found.", id.0),
            WorkflowError::RenderFailure { source, .. } => {
                format!("Error generating receipt: {source}")
            }
            WorkflowError::InvalidPhone { store_name, .. } => format!(
                "Invalid phone number for {store_name}. Receipt generated but not sent."
            ),
            WorkflowError::DispatchFailure { source, .. } => {
                format!("Receipt generated but sending failed: {}", source.detail())
            }
            WorkflowError::Storage(err) => format!("Error recording receipt: {err}"),
        }
    }
}

/// Allocates, renders, records and sends the receipt of one delivery.
pub struct ReceiptWorkflow<R>
where
    R: DeliveryRepository + ?Sized,
{
    repository: Arc<R>,
    allocator: ReceiptNumberAllocator<R>,
    renderer: Arc<dyn ReceiptRenderer>,
    dispatcher: Arc<dyn Dispatcher>,
    layout: ArtifactLayout,
}

impl<R> fmt::Debug for ReceiptWorkflow<R>
where
    R: DeliveryRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptWorkflow")
            .field("repository", &type_name_of_val(self.repository.as_ref()))
            .field("renderer", &type_name_of_val(self.renderer.as_ref()))
            .field("dispatcher", &type_name_of_val(self.dispatcher.as_ref()))
            .field("layout", &self.layout)
            .finish()
    }
}

impl<R> ReceiptWorkflow<R>
where
    R: DeliveryRepository + ?Sized,
{
    pub fn new(
        repository: Arc<R>,
        renderer: Arc<dyn ReceiptRenderer>,
        dispatcher: Arc<dyn Dispatcher>,
        layout: ArtifactLayout,
    ) -> Self {
        Self {
            allocator: ReceiptNumberAllocator::new(Arc::clone(&repository)),
            repository,
            renderer,
            dispatcher,
            layout,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Run the workflow for a stored delivery.
    ///
    /// A delivery that already carries a receipt is not renumbered: the
    /// stored document is sent again.
    pub async fn run(&self, id: DeliveryId) -> Result<DispatchReport, WorkflowError> {
        let context = self
            .repository
            .load_receipt_context(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))?;
        info!(delivery = %id, stage = ?WorkflowStage::Created, "receipt workflow started");

        let (delivery, resent) = match (
            context.delivery.receipt_number,
            context.delivery.generated_image_path.as_deref(),
        ) {
            (Some(receipt_number), Some(_)) => {
                info!(delivery = %id, receipt_number, "receipt already issued, resending");
                (context.delivery.clone(), true)
            }
            (Some(receipt_number), None) => {
                return Err(BoxdropError::Internal(format!(
                    "{id} has receipt number {receipt_number} but no artifact"
                ))
                .into());
            }
            (None, _) => (self.issue(&context).await?, false),
        };

        let (receipt_number, artifact_path) = match (
            delivery.receipt_number,
            delivery.generated_image_path.clone(),
        ) {
            (Some(number), Some(path)) => (number, path),
            _ => {
                return Err(BoxdropError::Internal(format!(
                    "{id} was not recorded with a receipt"
                ))
                .into());
            }
        };

        let destination = match normalize_phone(context.store.phone.as_deref()) {
            Ok(destination) => destination,
            Err(_) => {
                warn!(
                    delivery = %id,
                    receipt_number,
                    store = %context.store.name,
                    stage = ?WorkflowStage::Aborted,
                    "skipping send: invalid or missing phone number"
                );
                return Err(WorkflowError::InvalidPhone {
                    store_name: context.store.name.clone(),
                    receipt_number,
                });
            }
        };
        info!(delivery = %id, receipt_number, stage = ?WorkflowStage::PhoneValid, "destination resolved");

        let file = self.layout.resolve_public_path(&artifact_path);
        self.dispatcher
            .send(&destination, &file, &receipt_caption(receipt_number))
            .await
            .map_err(|source| WorkflowError::DispatchFailure {
                receipt_number,
                source,
            })?;
        info!(delivery = %id, receipt_number, stage = ?WorkflowStage::Dispatched, "receipt workflow finished");

        Ok(DispatchReport {
            delivery,
            receipt_number,
            artifact_path,
            destination: destination.to_string(),
            resent,
        })
    }

    /// Allocate, render and durably record a new receipt.
    async fn issue(&self, context: &ReceiptContext) -> Result<Delivery, WorkflowError> {
        let id = context.delivery.id;
        let receipt_number = self.allocator.allocate().await?;
        info!(delivery = %id, receipt_number, stage = ?WorkflowStage::NumberAllocated, "receipt number allocated");

        let fields = ReceiptFields::from_context(context, receipt_number);
        let target = self.layout.file_path(receipt_number);
        self.renderer
            .render(&fields, &target)
            .await
            .map_err(|source| {
                warn!(delivery = %id, receipt_number, error = %source, "receipt rendering failed");
                WorkflowError::RenderFailure {
                    receipt_number,
                    source,
                }
            })?;
        info!(delivery = %id, receipt_number, stage = ?WorkflowStage::Rendered, "receipt rendered");

        let public_path = self.layout.public_path(receipt_number);
        let delivery = self
            .repository
            .assign_receipt(id, receipt_number, &public_path)
            .await?;
        info!(
            delivery = %id,
            receipt_number,
            artifact = %public_path,
            stage = ?WorkflowStage::ArtifactPersisted,
            "receipt recorded"
        );
        Ok(delivery)
    }
}
