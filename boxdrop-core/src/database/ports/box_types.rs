use async_trait::async_trait;

use crate::domain::records::{BoxType, BoxTypeId, NewBoxType};
use crate::error::Result;

#[async_trait]
pub trait BoxTypeRepository: Send + Sync {
    /// Insert a box type. A duplicate type name yields `BoxdropError::Conflict`.
    async fn create_box_type(&self, box_type: NewBoxType) -> Result<BoxType>;

    async fn get_box_type(&self, id: BoxTypeId) -> Result<Option<BoxType>>;

    async fn list_box_types(&self) -> Result<Vec<BoxType>>;
}
