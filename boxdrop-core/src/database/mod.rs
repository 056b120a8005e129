pub mod memory;
pub mod ports;

#[cfg(feature = "database")]
pub mod postgres;
#[cfg(feature = "database")]
pub mod repositories;

pub use memory::InMemoryDatabase;
#[cfg(feature = "database")]
pub use postgres::{PoolStats, PostgresDatabase};
