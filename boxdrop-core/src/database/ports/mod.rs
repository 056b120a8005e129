//! Repository ports (interfaces) for the three record kinds.
//!
//! The receipt workflow only depends on [`deliveries::DeliveryRepository`];
//! the store and box type ports back the data-entry endpoints. Postgres
//! implementations live under `database::repositories`, the in-memory one in
//! `database::memory`.

pub mod box_types;
pub mod deliveries;
pub mod stores;

pub use box_types::BoxTypeRepository;
pub use deliveries::DeliveryRepository;
pub use stores::StoreRepository;
