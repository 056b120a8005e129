//! Receipt numbering, rendering and dispatch.
//!
//! [`workflow::ReceiptWorkflow`] composes the pieces: it allocates a number,
//! renders the receipt image, records it on the delivery, normalizes the
//! store's phone and hands the image to the messaging channel.

pub mod artifacts;
pub mod dispatch;
pub mod numbering;
pub mod phone;
pub mod render;
pub mod workflow;

pub use artifacts::ArtifactLayout;
pub use dispatch::{
    CommandDispatcher, CommandDispatcherConfig, DispatchError, Dispatcher, receipt_caption,
};
pub use numbering::{RECEIPT_NUMBER_FLOOR, ReceiptNumberAllocator, next_receipt_number};
pub use phone::{Destination, PhoneError, normalize_phone};
pub use render::{
    HtmlImageRenderer, HtmlImageRendererConfig, ReceiptFields, ReceiptRenderer, ReceiptTemplate,
    RenderError,
};
pub use workflow::{DispatchReport, ReceiptWorkflow, WorkflowError, WorkflowStage};
