//! Record-type model shared by contexts and the store facade.
//!
//! # Responsibility
//! - Describe record types statically (`EntityDescriptor`).
//! - Map caller types to rows through the `Record` trait.
//! - Build typed queries from `RecordField` selectors.
//!
//! # Invariants
//! - Every SQL identifier originates from a validated descriptor.
//! - Record identity is the hidden `_pk` column plus caller-chosen attributes.

pub mod entity;
pub mod query;
pub mod record;
