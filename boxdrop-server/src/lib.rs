//! HTTP service for recording box deliveries and sending their receipts.
//!
//! The binary in `main.rs` loads [`infra::config::Config`], connects the
//! repositories and serves [`routes::create_app`].

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
