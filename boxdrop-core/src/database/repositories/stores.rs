use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::database::ports::stores::StoreRepository;
use crate::database::postgres::map_db_error;
use crate::domain::records::{NewStore, Store, StoreId};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PostgresStoreRepository {
    pool: PgPool,
}

impl PostgresStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct StoreRow {
    id: i64,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    keywords: Option<String>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store {
            id: StoreId(row.id),
            name: row.name,
            phone: row.phone,
            address: row.address,
            keywords: row.keywords,
        }
    }
}

#[async_trait]
impl StoreRepository for PostgresStoreRepository {
    async fn create_store(&self, store: NewStore) -> Result<Store> {
        let row = sqlx::query_as::<_, StoreRow>(
            r#"
            INSERT INTO stores (name, phone, address, keywords)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, phone, address, keywords
            "#,
        )
        .bind(&store.name)
        .bind(&store.phone)
        .bind(&store.address)
        .bind(&store.keywords)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to create store"))?;

        Ok(row.into())
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, phone, address, keywords FROM stores WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to load store"))?;

        Ok(row.map(Store::from))
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let rows = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, phone, address, keywords FROM stores ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to list stores"))?;

        Ok(rows.into_iter().map(Store::from).collect())
    }
}
