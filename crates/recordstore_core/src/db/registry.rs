//! Record-type registration and store metadata.
//!
//! # Responsibility
//! - Create record tables from entity descriptors.
//! - Remember each registered layout so incompatible reopen attempts fail.
//! - Own the store UUID generated on first open.
//!
//! # Invariants
//! - Registration of all entities happens in one transaction.
//! - A stored signature is never silently rewritten.

use super::migrations::current_user_version;
use crate::error::{StoreError, StoreResult};
use crate::model::entity::EntityDescriptor;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

const STORE_UUID_KEY: &str = "store_uuid";
const RESERVED_TABLES: &[&str] = &["store_metadata", "record_types"];

/// Identity and layout summary of an open store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreMetadata {
    pub store_uuid: Uuid,
    pub schema_version: u32,
    /// Registered record type names, sorted.
    pub record_types: Vec<String>,
}

/// Registers `entities`, creating missing tables.
///
/// # Errors
/// - `InvalidIdentifier` for malformed or reserved names.
/// - `SchemaMismatch` when a stored layout differs from its descriptor.
pub fn register_entities(
    conn: &mut Connection,
    entities: &[&'static EntityDescriptor],
) -> StoreResult<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT OR IGNORE INTO store_metadata (key, value) VALUES (?1, ?2);",
        params![STORE_UUID_KEY, Uuid::new_v4().to_string()],
    )?;

    for entity in entities {
        entity.validate()?;
        if is_reserved_table(entity.name) {
            return Err(StoreError::InvalidIdentifier(format!(
                "{} is reserved for store bookkeeping",
                entity.name
            )));
        }

        let declared = entity.signature();
        let stored: Option<String> = tx
            .query_row(
                "SELECT signature FROM record_types WHERE name = ?1;",
                [entity.name],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(stored) if stored != declared => {
                return Err(StoreError::SchemaMismatch {
                    record_type: entity.name.to_string(),
                    stored,
                    declared,
                });
            }
            Some(_) => {}
            None => {
                tx.execute_batch(&entity.create_table_sql())?;
                tx.execute(
                    "INSERT INTO record_types (name, signature) VALUES (?1, ?2);",
                    params![entity.name, declared],
                )?;
                info!(
                    "event=record_type_register module=db status=ok record_type={} attributes={}",
                    entity.name,
                    entity.attributes.len()
                );
            }
        }
        tx.execute_batch(&entity.create_indexes_sql())?;
    }

    tx.commit()?;
    Ok(())
}

/// Reads store identity and registered record types.
pub fn read_metadata(conn: &Connection) -> StoreResult<StoreMetadata> {
    let uuid_text: String = conn.query_row(
        "SELECT value FROM store_metadata WHERE key = ?1;",
        [STORE_UUID_KEY],
        |row| row.get(0),
    )?;
    let store_uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in store_metadata.store_uuid"
        ))
    })?;

    let mut stmt = conn.prepare("SELECT name FROM record_types ORDER BY name ASC;")?;
    let record_types = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StoreMetadata {
        store_uuid,
        schema_version: current_user_version(conn)?,
        record_types,
    })
}

fn is_reserved_table(name: &str) -> bool {
    RESERVED_TABLES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
        || name.to_ascii_lowercase().starts_with("sqlite_")
}
