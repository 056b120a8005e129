use async_trait::async_trait;

use crate::domain::records::{NewStore, Store, StoreId};
use crate::error::Result;

#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Insert a store. A duplicate name yields `BoxdropError::Conflict`.
    async fn create_store(&self, store: NewStore) -> Result<Store>;

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>>;

    /// All stores ordered by name.
    async fn list_stores(&self) -> Result<Vec<Store>>;
}
