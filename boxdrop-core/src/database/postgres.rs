use std::fmt;
use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::database::repositories::{
    PostgresBoxTypeRepository, PostgresDeliveryRepository, PostgresStoreRepository,
};
use crate::error::{BoxdropError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Statistics about the connection pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_size: u32,
}

/// Connection pool plus the repositories that share it.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    stores: PostgresStoreRepository,
    box_types: PostgresBoxTypeRepository,
    deliveries: PostgresDeliveryRepository,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MIN_CONNECTIONS)
            .min(max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| BoxdropError::Internal(format!("Database connection failed: {e}")))?;

        info!(
            max_connections,
            min_connections, "database pool initialized"
        );

        Ok(Self::with_limits(pool, max_connections))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::with_limits(pool, DEFAULT_MAX_CONNECTIONS)
    }

    fn with_limits(pool: PgPool, max_connections: u32) -> Self {
        Self {
            stores: PostgresStoreRepository::new(pool.clone()),
            box_types: PostgresBoxTypeRepository::new(pool.clone()),
            deliveries: PostgresDeliveryRepository::new(pool.clone()),
            pool,
            max_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn stores(&self) -> &PostgresStoreRepository {
        &self.stores
    }

    pub fn box_types(&self) -> &PostgresBoxTypeRepository {
        &self.box_types
    }

    pub fn deliveries(&self) -> &PostgresDeliveryRepository {
        &self.deliveries
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
        }
    }

    /// Apply the embedded migrations.
    pub async fn initialize_schema(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| BoxdropError::Internal(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

/// Translate constraint violations into domain errors so callers can tell a
/// duplicate name from a dead connection.
pub(crate) fn map_db_error(err: sqlx::Error, context: &str) -> BoxdropError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return BoxdropError::Conflict(format!("{context}: {}", db_err.message()));
        }
        if db_err.is_foreign_key_violation() {
            return BoxdropError::NotFound(format!("{context}: {}", db_err.message()));
        }
        // 22001: string_data_right_truncation (value wider than its column)
        if db_err.is_check_violation() || db_err.code().as_deref() == Some("22001") {
            return BoxdropError::InvalidInput(format!("{context}: {}", db_err.message()));
        }
    }
    BoxdropError::Internal(format!("{context}: {err}"))
}
