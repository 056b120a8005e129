use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::database::ports::deliveries::DeliveryRepository;
use crate::database::postgres::map_db_error;
use crate::domain::records::{
    BoxType, BoxTypeId, Delivery, DeliveryId, ReceiptContext, Store, StoreId, ValidDelivery,
};
use crate::error::{BoxdropError, Result};

const DELIVERY_COLUMNS: &str = r#"
    id, store_id, box_type_id, delivery_date, delivery_content,
    quantity_carton, quantity_basket, vehicle_number, exit_time,
    receipt_number, generated_image_path
"#;

#[derive(Debug, Clone)]
pub struct PostgresDeliveryRepository {
    pool: PgPool,
}

impl PostgresDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, context: &str) -> Result<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, context))?;
        Ok(rows.into_iter().map(Delivery::from).collect())
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: i64,
    store_id: i64,
    box_type_id: i64,
    delivery_date: NaiveDate,
    delivery_content: Option<String>,
    quantity_carton: i32,
    quantity_basket: i32,
    vehicle_number: Option<String>,
    exit_time: Option<String>,
    receipt_number: Option<i64>,
    generated_image_path: Option<String>,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            id: DeliveryId(row.id),
            store_id: StoreId(row.store_id),
            box_type_id: BoxTypeId(row.box_type_id),
            date: row.delivery_date,
            delivery_content: row.delivery_content,
            quantity_carton: row.quantity_carton,
            quantity_basket: row.quantity_basket,
            vehicle_number: row.vehicle_number,
            exit_time: row.exit_time,
            receipt_number: row.receipt_number,
            generated_image_path: row.generated_image_path,
        }
    }
}

/// Delivery joined with its store and (left-joined) box type.
#[derive(Debug, FromRow)]
struct ReceiptContextRow {
    #[sqlx(flatten)]
    delivery: DeliveryRow,
    store_name: String,
    store_phone: Option<String>,
    store_address: Option<String>,
    store_keywords: Option<String>,
    box_type_name: Option<String>,
    box_type_keywords: Option<String>,
    box_type_found: bool,
}

impl From<ReceiptContextRow> for ReceiptContext {
    fn from(row: ReceiptContextRow) -> Self {
        let delivery = Delivery::from(row.delivery);
        let store = Store {
            id: delivery.store_id,
            name: row.store_name,
            phone: row.store_phone,
            address: row.store_address,
            keywords: row.store_keywords,
        };
        let box_type = match (row.box_type_found, row.box_type_name) {
            (true, Some(type_name)) => Some(BoxType {
                id: delivery.box_type_id,
                type_name,
                keywords: row.box_type_keywords,
            }),
            _ => None,
        };
        ReceiptContext {
            delivery,
            store,
            box_type,
        }
    }
}

#[async_trait]
impl DeliveryRepository for PostgresDeliveryRepository {
    async fn create_delivery(&self, delivery: ValidDelivery) -> Result<Delivery> {
        let sql = format!(
            r#"
            INSERT INTO deliveries (
                store_id, box_type_id, delivery_date, delivery_content,
                quantity_carton, quantity_basket, vehicle_number, exit_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DELIVERY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(delivery.store_id.0)
            .bind(delivery.box_type_id.0)
            .bind(delivery.date)
            .bind(&delivery.delivery_content)
            .bind(delivery.quantity_carton)
            .bind(delivery.quantity_basket)
            .bind(&delivery.vehicle_number)
            .bind(&delivery.exit_time)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to create delivery"))?;

        Ok(row.into())
    }

    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1");
        let row = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to load delivery"))?;

        Ok(row.map(Delivery::from))
    }

    async fn list_deliveries(&self) -> Result<Vec<Delivery>> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries ORDER BY delivery_date DESC, id DESC"
        );
        self.fetch_many(&sql, "Failed to list deliveries").await
    }

    async fn list_deliveries_for_store_month(
        &self,
        store_id: StoreId,
        month: u32,
    ) -> Result<Vec<Delivery>> {
        let month = i32::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| BoxdropError::InvalidInput(format!("month out of range: {month}")))?;

        let sql = format!(
            r#"
            SELECT {DELIVERY_COLUMNS}
            FROM deliveries
            WHERE store_id = $1
              AND EXTRACT(MONTH FROM delivery_date)::int = $2
            ORDER BY delivery_date, id
            "#
        );
        let rows = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(store_id.0)
            .bind(month)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to filter deliveries"))?;

        Ok(rows.into_iter().map(Delivery::from).collect())
    }

    async fn load_receipt_context(&self, id: DeliveryId) -> Result<Option<ReceiptContext>> {
        let row = sqlx::query_as::<_, ReceiptContextRow>(
            r#"
            SELECT
                d.id, d.store_id, d.box_type_id, d.delivery_date, d.delivery_content,
                d.quantity_carton, d.quantity_basket, d.vehicle_number, d.exit_time,
                d.receipt_number, d.generated_image_path,
                s.name      AS store_name,
                s.phone     AS store_phone,
                s.address   AS store_address,
                s.keywords  AS store_keywords,
                b.type_name AS box_type_name,
                b.keywords  AS box_type_keywords,
                (b.id IS NOT NULL) AS box_type_found
            FROM deliveries d
            JOIN stores s ON s.id = d.store_id
            LEFT JOIN box_types b ON b.id = d.box_type_id
            WHERE d.id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to load receipt context"))?;

        Ok(row.map(ReceiptContext::from))
    }

    async fn max_receipt_number(&self) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(receipt_number) FROM deliveries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to read last receipt number"))
    }

    async fn assign_receipt(
        &self,
        id: DeliveryId,
        receipt_number: i64,
        artifact_path: &str,
    ) -> Result<Delivery> {
        let sql = format!(
            r#"
            UPDATE deliveries
            SET receipt_number = $2,
                generated_image_path = $3
            WHERE id = $1
              AND receipt_number IS NULL
            RETURNING {DELIVERY_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, DeliveryRow>(&sql)
            .bind(id.0)
            .bind(receipt_number)
            .bind(artifact_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to record receipt"))?;

        if let Some(row) = updated {
            debug!(delivery = %id, receipt_number, "receipt committed");
            return Ok(row.into());
        }

        match self.get_delivery(id).await? {
            Some(existing) => Err(BoxdropError::Conflict(format!(
                "{id} already carries receipt number {}",
                existing.receipt_number.unwrap_or_default()
            ))),
            None => Err(BoxdropError::NotFound(format!("{id} does not exist"))),
        }
    }
}
