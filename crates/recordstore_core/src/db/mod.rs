//! SQLite storage bootstrap, internal migrations and record-type registry.
//!
//! # Responsibility
//! - Open and configure SQLite connections for primary and background contexts.
//! - Apply internal bookkeeping migrations in deterministic order.
//! - Create record tables from registered entity descriptors.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No record data is read or written before migrations succeed.

pub mod migrations;
mod open;
mod registry;

pub(crate) use open::open_worker_db;
pub use open::{open_db, open_db_in_memory, StoreLocation};
pub use registry::{read_metadata, register_entities, StoreMetadata};
