//! List management for hospital administration records: search, filters,
//! pagination and create/edit/delete against a record store, with the local
//! collection refetched after every successful mutation.
//!
//! # Examples
//!
//! Synchronous state with [`core::state::ListState`]:
//! ```
//! use hospadmin::{core::state::ListState, entities::Pharmacist, types::Status};
//!
//! let mut state = ListState::<Pharmacist>::new(5);
//! assert!(state.begin_load());
//! state
//!     .finish_load(Ok(vec![Pharmacist {
//!         id: Some(1),
//!         name: "Alice Smith".to_string(),
//!         email: "alice.pharma@example.com".to_string(),
//!         phone: "9876543210".to_string(),
//!         shift: "Morning".to_string(),
//!         status: Status::Active,
//!     }]))
//!     .expect("load");
//! let page = state.set_search("ALICE");
//! assert_eq!(page.rows.len(), 1);
//! ```
//!
//! Runtime usage with an in-memory store:
//! ```
//! use hospadmin::{
//!     entities::Outpatient,
//!     remote::memory::MemoryStore,
//!     runtime::handle::{spawn_list_manager, ManagerConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handle = spawn_list_manager(MemoryStore::<Outpatient>::new(), ManagerConfig::default());
//! handle.load().await.expect("load");
//! handle.begin_create().await.expect("open form");
//! for (field, value) in [
//!     ("outpatientID", "OP-1"),
//!     ("name", "John Doe"),
//!     ("age", "42"),
//!     ("gender", "Male"),
//!     ("shift", "Morning"),
//!     ("email", "john@example.com"),
//!     ("phoneNumber", "555-0100"),
//! ] {
//!     handle.set_field(field, value).await.expect("field");
//! }
//! handle.submit().await.expect("submit");
//! let snap = handle.snapshot().await.expect("snapshot");
//! assert_eq!(snap.projection.total_count, 1);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Synchronous list state.
pub mod core;
/// Canonical entity schemas.
pub mod entities;
/// Operation error types.
pub mod error;
/// Create/edit form state.
pub mod form;
/// Entity trait and field helpers.
pub mod record;
/// Record store trait and backends.
pub mod remote;
/// Single-writer manager task and events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
/// Search, filter and pagination.
pub mod view;
