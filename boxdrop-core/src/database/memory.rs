//! Process-local implementation of every repository port.
//!
//! Backs the test suites and the server's `--memory` mode. Constraint
//! behaviour (unique names, unique receipt numbers, write-once receipts,
//! foreign keys) mirrors the Postgres schema. Column widths are enforced by
//! the `validated()` constructors of the input records before either adapter
//! sees a row.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Datelike;
use tokio::sync::Mutex;

use crate::database::ports::{BoxTypeRepository, DeliveryRepository, StoreRepository};
use crate::domain::records::{
    BoxType, BoxTypeId, Delivery, DeliveryId, NewBoxType, NewStore, ReceiptContext, Store,
    StoreId, ValidDelivery,
};
use crate::error::{BoxdropError, Result};

#[derive(Debug, Default)]
struct Tables {
    stores: BTreeMap<StoreId, Store>,
    box_types: BTreeMap<BoxTypeId, BoxType>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a box type row, leaving deliveries that reference it dangling.
    /// Only useful for exercising the receipt content fallback.
    pub async fn forget_box_type(&self, id: BoxTypeId) {
        self.tables.lock().await.box_types.remove(&id);
    }

    /// Change a store's phone after creation.
    pub async fn set_store_phone(&self, id: StoreId, phone: Option<String>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let store = tables
            .stores
            .get_mut(&id)
            .ok_or_else(|| BoxdropError::NotFound(format!("{id} does not exist")))?;
        store.phone = phone;
        Ok(())
    }
}

#[async_trait]
impl StoreRepository for InMemoryDatabase {
    async fn create_store(&self, store: NewStore) -> Result<Store> {
        let mut tables = self.tables.lock().await;
        if tables.stores.values().any(|s| s.name == store.name) {
            return Err(BoxdropError::Conflict(format!(
                "store named {:?} already exists",
                store.name
            )));
        }
        let id = StoreId(tables.next_id());
        let record = Store {
            id,
            name: store.name,
            phone: store.phone,
            address: store.address,
            keywords: store.keywords,
        };
        tables.stores.insert(id, record.clone());
        Ok(record)
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>> {
        Ok(self.tables.lock().await.stores.get(&id).cloned())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let tables = self.tables.lock().await;
        let mut stores: Vec<Store> = tables.stores.values().cloned().collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }
}

#[async_trait]
impl BoxTypeRepository for InMemoryDatabase {
    async fn create_box_type(&self, box_type: NewBoxType) -> Result<BoxType> {
        let mut tables = self.tables.lock().await;
        if tables
            .box_types
            .values()
            .any(|b| b.type_name == box_type.type_name)
        {
            return Err(BoxdropError::Conflict(format!(
                "box type {:?} already exists",
                box_type.type_name
            )));
        }
        let id = BoxTypeId(tables.next_id());
        let record = BoxType {
            id,
            type_name: box_type.type_name,
            keywords: box_type.keywords,
        };
        tables.box_types.insert(id, record.clone());
        Ok(record)
    }

    async fn get_box_type(&self, id: BoxTypeId) -> Result<Option<BoxType>> {
        Ok(self.tables.lock().await.box_types.get(&id).cloned())
    }

    async fn list_box_types(&self) -> Result<Vec<BoxType>> {
        let tables = self.tables.lock().await;
        let mut box_types: Vec<BoxType> = tables.box_types.values().cloned().collect();
        box_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(box_types)
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDatabase {
    async fn create_delivery(&self, delivery: ValidDelivery) -> Result<Delivery> {
        let mut tables = self.tables.lock().await;
        if !tables.stores.contains_key(&delivery.store_id) {
            return Err(BoxdropError::NotFound(format!(
                "{} does not exist",
                delivery.store_id
            )));
        }
        if !tables.box_types.contains_key(&delivery.box_type_id) {
            return Err(BoxdropError::NotFound(format!(
                "{} does not exist",
                delivery.box_type_id
            )));
        }

        let id = DeliveryId(tables.next_id());
        let record = Delivery {
            id,
            store_id: delivery.store_id,
            box_type_id: delivery.box_type_id,
            date: delivery.date,
            delivery_content: delivery.delivery_content,
            quantity_carton: delivery.quantity_carton,
            quantity_basket: delivery.quantity_basket,
            vehicle_number: delivery.vehicle_number,
            exit_time: delivery.exit_time,
            receipt_number: None,
            generated_image_path: None,
        };
        tables.deliveries.insert(id, record.clone());
        Ok(record)
    }

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        Ok(self.tables.lock().await.deliveries.get(&id).cloned())
    }

    async fn list_deliveries(&self) -> Result<Vec<Delivery>> {
        let tables = self.tables.lock().await;
        let mut deliveries: Vec<Delivery> = tables.deliveries.values().cloned().collect();
        deliveries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(deliveries)
    }

    async fn list_deliveries_for_store_month(
        &self,
        store_id: StoreId,
        month: u32,
    ) -> Result<Vec<Delivery>> {
        if !(1..=12).contains(&month) {
            return Err(BoxdropError::InvalidInput(format!(
                "month out of range: {month}"
            )));
        }
        let tables = self.tables.lock().await;
        let mut deliveries: Vec<Delivery> = tables
            .deliveries
            .values()
            .filter(|d| d.store_id == store_id && d.date.month() == month)
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(deliveries)
    }

    async fn load_receipt_context(&self, id: DeliveryId) -> Result<Option<ReceiptContext>> {
        let tables = self.tables.lock().await;
        let Some(delivery) = tables.deliveries.get(&id).cloned() else {
            return Ok(None);
        };
        let store = tables
            .stores
            .get(&delivery.store_id)
            .cloned()
            .ok_or_else(|| {
                BoxdropError::Internal(format!("{id} references missing {}", delivery.store_id))
            })?;
        let box_type = tables.box_types.get(&delivery.box_type_id).cloned();
        Ok(Some(ReceiptContext {
            delivery,
            store,
            box_type,
        }))
    }

    async fn max_receipt_number(&self) -> Result<Option<i64>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .deliveries
            .values()
            .filter_map(|d| d.receipt_number)
            .max())
    }

    async fn assign_receipt(
        &self,
        id: DeliveryId,
        receipt_number: i64,
        artifact_path: &str,
    ) -> Result<Delivery> {
        let mut tables = self.tables.lock().await;
        if tables
            .deliveries
            .values()
            .any(|d| d.id != id && d.receipt_number == Some(receipt_number))
        {
            return Err(BoxdropError::Conflict(format!(
                "receipt number {receipt_number} is already in use"
            )));
        }
        let delivery = tables
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| BoxdropError::NotFound(format!("{id} does not exist")))?;
        if let Some(existing) = delivery.receipt_number {
            return Err(BoxdropError::Conflict(format!(
                "{id} already carries receipt number {existing}"
            )));
        }
        delivery.receipt_number = Some(receipt_number);
        delivery.generated_image_path = Some(artifact_path.to_string());
        Ok(delivery.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn seeded() -> (InMemoryDatabase, StoreId, BoxTypeId) {
        let db = InMemoryDatabase::new();
        let store = db
            .create_store(NewStore {
                name: "Corner Market".into(),
                phone: Some("050-1234567".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let box_type = db
            .create_box_type(NewBoxType {
                type_name: "Fruit Box".into(),
                keywords: None,
            })
            .await
            .unwrap();
        (db, store.id, box_type.id)
    }

    fn delivery_on(store_id: StoreId, box_type_id: BoxTypeId, date: NaiveDate) -> ValidDelivery {
        ValidDelivery {
            store_id,
            box_type_id,
            date,
            delivery_content: None,
            quantity_carton: 1,
            quantity_basket: 0,
            vehicle_number: None,
            exit_time: None,
        }
    }

    #[tokio::test]
    async fn duplicate_store_names_conflict() {
        let (db, _, _) = seeded().await;
        let err = db
            .create_store(NewStore {
                name: "Corner Market".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoxdropError::Conflict(_)));
    }

    #[tokio::test]
    async fn deliveries_require_existing_references() {
        let (db, store_id, _) = seeded().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = db
            .create_delivery(delivery_on(store_id, BoxTypeId(999), date))
            .await
            .unwrap_err();
        assert!(matches!(err, BoxdropError::NotFound(_)));
    }

    #[tokio::test]
    async fn receipts_are_write_once_and_unique() {
        let (db, store_id, box_type_id) = seeded().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let first = db
            .create_delivery(delivery_on(store_id, box_type_id, date))
            .await
            .unwrap();
        let second = db
            .create_delivery(delivery_on(store_id, box_type_id, date))
            .await
            .unwrap();

        db.assign_receipt(first.id, 17421, "static/receipt_17421.png")
            .await
            .unwrap();

        let again = db
            .assign_receipt(first.id, 17422, "static/receipt_17422.png")
            .await
            .unwrap_err();
        assert!(matches!(again, BoxdropError::Conflict(_)));

        let reused = db
            .assign_receipt(second.id, 17421, "static/receipt_17421.png")
            .await
            .unwrap_err();
        assert!(matches!(reused, BoxdropError::Conflict(_)));

        assert_eq!(db.max_receipt_number().await.unwrap(), Some(17421));
    }

    #[tokio::test]
    async fn month_filter_ignores_year_and_other_stores() {
        let (db, store_id, box_type_id) = seeded().await;
        let other = db
            .create_store(NewStore {
                name: "Bakery".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        for date in [
            NaiveDate::from_ymd_opt(2023, 3, 9).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        ] {
            db.create_delivery(delivery_on(store_id, box_type_id, date))
                .await
                .unwrap();
        }
        db.create_delivery(delivery_on(
            other.id,
            box_type_id,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        ))
        .await
        .unwrap();

        let march = db
            .list_deliveries_for_store_month(store_id, 3)
            .await
            .unwrap();
        assert_eq!(march.len(), 2);
        assert!(march.iter().all(|d| d.store_id == store_id));

        let err = db
            .list_deliveries_for_store_month(store_id, 13)
            .await
            .unwrap_err();
        assert!(matches!(err, BoxdropError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let (db, store_id, box_type_id) = seeded().await;
        let older = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let newer = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        db.create_delivery(delivery_on(store_id, box_type_id, older))
            .await
            .unwrap();
        db.create_delivery(delivery_on(store_id, box_type_id, newer))
            .await
            .unwrap();

        let dates: Vec<NaiveDate> = db
            .list_deliveries()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.date)
            .collect();
        assert_eq!(dates, vec![newer, older]);
    }
}
