use async_trait::async_trait;

use crate::domain::records::{Delivery, DeliveryId, ReceiptContext, StoreId, ValidDelivery};
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Insert a delivery with no receipt number and no artifact. Unknown
    /// store or box type references yield `BoxdropError::NotFound`.
    async fn create_delivery(&self, delivery: ValidDelivery) -> Result<Delivery>;

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>>;

    /// Newest delivery date first.
    async fn list_deliveries(&self) -> Result<Vec<Delivery>>;

    /// Deliveries of one store whose date falls in `month` (1-12) of any year.
    async fn list_deliveries_for_store_month(
        &self,
        store_id: StoreId,
        month: u32,
    ) -> Result<Vec<Delivery>>;

    /// Load a delivery together with its store and box type.
    async fn load_receipt_context(&self, id: DeliveryId) -> Result<Option<ReceiptContext>>;

    /// Highest receipt number ever assigned, ignoring unnumbered rows.
    async fn max_receipt_number(&self) -> Result<Option<i64>>;

    /// Durably record the receipt number and artifact path of a delivery.
    ///
    /// Implementations must refuse to overwrite an existing number
    /// (`BoxdropError::Conflict`) and must reject a number already used by a
    /// different delivery.
    async fn assign_receipt(
        &self,
        id: DeliveryId,
        receipt_number: i64,
        artifact_path: &str,
    ) -> Result<Delivery>;
}
