//! Postgres adapters for the repository ports.

pub mod box_types;
pub mod deliveries;
pub mod stores;

pub use box_types::PostgresBoxTypeRepository;
pub use deliveries::PostgresDeliveryRepository;
pub use stores::PostgresStoreRepository;
