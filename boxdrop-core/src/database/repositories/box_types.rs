use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::database::ports::box_types::BoxTypeRepository;
use crate::database::postgres::map_db_error;
use crate::domain::records::{BoxType, BoxTypeId, NewBoxType};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PostgresBoxTypeRepository {
    pool: PgPool,
}

impl PostgresBoxTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BoxTypeRow {
    id: i64,
    type_name: String,
    keywords: Option<String>,
}

impl From<BoxTypeRow> for BoxType {
    fn from(row: BoxTypeRow) -> Self {
        BoxType {
            id: BoxTypeId(row.id),
            type_name: row.type_name,
            keywords: row.keywords,
        }
    }
}

#[async_trait]
impl BoxTypeRepository for PostgresBoxTypeRepository {
    async fn create_box_type(&self, box_type: NewBoxType) -> Result<BoxType> {
        let row = sqlx::query_as::<_, BoxTypeRow>(
            r#"
            INSERT INTO box_types (type_name, keywords)
            VALUES ($1, $2)
            RETURNING id, type_name, keywords
            "#,
        )
        .bind(&box_type.type_name)
        .bind(&box_type.keywords)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to create box type"))?;

        Ok(row.into())
    }

    async fn get_box_type(&self, id: BoxTypeId) -> Result<Option<BoxType>> {
        let row = sqlx::query_as::<_, BoxTypeRow>(
            "SELECT id, type_name, keywords FROM box_types WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to load box type"))?;

        Ok(row.map(BoxType::from))
    }

    async fn list_box_types(&self) -> Result<Vec<BoxType>> {
        let rows = sqlx::query_as::<_, BoxTypeRow>(
            "SELECT id, type_name, keywords FROM box_types ORDER BY type_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to list box types"))?;

        Ok(rows.into_iter().map(BoxType::from).collect())
    }
}
