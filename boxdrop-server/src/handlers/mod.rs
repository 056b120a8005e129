pub mod box_types;
pub mod deliveries;
pub mod health;
pub mod stores;
