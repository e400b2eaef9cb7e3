//! Typed record store over an embedded SQLite database.
//! Provides fetch/exists/delete helpers, execution contexts and store teardown
//! for a mobile application's persistence layer.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

pub use config::StoreConfig;
pub use context::{BackgroundTask, Context, ContextKind};
pub use db::{StoreLocation, StoreMetadata};
pub use error::{StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::entity::{Attribute, AttributeType, EntityDescriptor};
pub use model::query::{Query, SortOrder};
pub use model::record::{FieldValue, Record, RecordField};
pub use store::{delete_store_file, RecordStore, RecordStoreBuilder};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
