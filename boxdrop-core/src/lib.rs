//! # Boxdrop Core
//!
//! Core library for Boxdrop: the record types for stores, box types and
//! deliveries, their repository ports and adapters, and the receipt workflow
//! that numbers, renders and sends a delivery note to the receiving store.
//!
//! ## Overview
//!
//! - **Records**: [`domain::records`] with input validation for new rows
//! - **Receipt workflow**: [`domain::receipts`]: phone normalization,
//!   serialized receipt numbering, HTML-to-image rendering, and dispatch
//!   through an external messaging CLI
//! - **Storage**: repository ports in [`database::ports`], a PostgreSQL
//!   adapter and an in-memory adapter
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL/SQLx support (default)
//! - `pg-tests`: run the Postgres-backed test suite (needs `DATABASE_URL`)
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use boxdrop_core::{
//!     database::InMemoryDatabase,
//!     domain::receipts::{
//!         ArtifactLayout, CommandDispatcher, CommandDispatcherConfig, HtmlImageRenderer,
//!         HtmlImageRendererConfig, ReceiptTemplate, ReceiptWorkflow,
//!     },
//!     domain::records::DeliveryId,
//! };
//!
//! async fn send_receipt(id: DeliveryId) -> Result<(), Box<dyn std::error::Error>> {
//!     let workflow = ReceiptWorkflow::new(
//!         Arc::new(InMemoryDatabase::new()),
//!         Arc::new(HtmlImageRenderer::new(
//!             HtmlImageRendererConfig::default(),
//!             ReceiptTemplate::default(),
//!         )),
//!         Arc::new(CommandDispatcher::new(CommandDispatcherConfig::default())),
//!         ArtifactLayout::new("/srv/boxdrop/static", "static"),
//!     );
//!     let report = workflow.run(id).await?;
//!     println!("sent receipt {}", report.receipt_number);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Common API types shared with the HTTP layer
pub mod api_types;

/// Database ports and adapters
pub mod database;

/// Records and the receipt workflow
pub mod domain;

/// Error types and error handling utilities
pub mod error;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{BoxdropError, Result};
