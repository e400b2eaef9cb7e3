//! Execution contexts: confined units of work over the store.
//!
//! # Responsibility
//! - Run typed reads (fetch, count, exists) against one SQLite connection.
//! - Stage writes (insert, delete, batch delete) until an explicit save.
//! - Track the pending-changes flag per context.
//!
//! # Invariants
//! - The first staged write opens an immediate transaction; `save` commits it
//!   and `rollback` discards it.
//! - A staged delete that matches nothing leaves no transaction open when the
//!   context had no other pending work.
//! - A failed commit rolls the whole context back before returning
//!   `StoreError::Commit`.
//! - Dropping a context with pending changes discards them.

mod background;

pub use background::BackgroundTask;
pub(crate) use background::spawn_background;

use crate::db::StoreLocation;
use crate::error::{StoreError, StoreResult};
use crate::model::entity::{quote_identifier, EntityDescriptor, PRIMARY_KEY_COLUMN};
use crate::model::query::Query;
use crate::model::record::{FieldValue, Record};
use log::{debug, error, info, warn};
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Which execution surface a context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Owned by the store; bound to the caller's (usually UI) thread.
    Primary,
    /// Short-lived context on its own connection.
    Background,
}

impl Display for ContextKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Background => f.write_str("background"),
        }
    }
}

/// Registered record types shared by every context of one store.
#[derive(Debug)]
pub(crate) struct Model {
    entities: BTreeMap<&'static str, &'static EntityDescriptor>,
}

impl Model {
    pub(crate) fn new(entities: &[&'static EntityDescriptor]) -> Self {
        Self {
            entities: entities
                .iter()
                .map(|entity| (entity.name, *entity))
                .collect(),
        }
    }

    fn entity_of<R: Record>(&self) -> StoreResult<&'static EntityDescriptor> {
        let declared = R::entity();
        match self.entities.get(declared.name) {
            Some(registered) if *registered == declared => Ok(*registered),
            _ => Err(StoreError::UnregisteredRecordType(declared.name)),
        }
    }
}

/// A unit of work over one SQLite connection.
///
/// `Context` is `Send` but not `Sync`: it may move to a worker thread, but only
/// one thread touches it at a time.
pub struct Context {
    conn: Connection,
    kind: ContextKind,
    model: Arc<Model>,
    pending_changes: usize,
    // Declared after `conn` so the connection closes before an ephemeral
    // directory can be removed.
    location: StoreLocation,
}

impl Context {
    pub(crate) fn new(
        conn: Connection,
        kind: ContextKind,
        model: Arc<Model>,
        location: StoreLocation,
    ) -> Self {
        Self {
            conn,
            kind,
            model,
            pending_changes: 0,
            location,
        }
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Whether staged writes are waiting for `save`.
    pub fn has_changes(&self) -> bool {
        self.pending_changes > 0
    }

    /// Number of rows touched by staged writes since the last save/rollback.
    pub fn pending_changes(&self) -> usize {
        self.pending_changes
    }

    /// Raw connection, for diagnostics and bookkeeping queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Fetches records matching `query`.
    pub fn fetch<R: Record>(&self, query: &Query<R>) -> StoreResult<Vec<R>> {
        let started_at = Instant::now();
        let result = self
            .model
            .entity_of::<R>()
            .and_then(|entity| self.select(entity, query));
        self.log_outcome("fetch", R::entity().name, started_at, &result, |records| {
            format!("count={}", records.len())
        });
        result
    }

    /// Fetches every record of type `R` in store order.
    pub fn fetch_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.fetch(&Query::all())
    }

    /// Fetches the first record matching `query`, if any.
    pub fn fetch_first<R: Record>(&self, query: Query<R>) -> StoreResult<Option<R>> {
        Ok(self.fetch(&query.limit(1))?.into_iter().next())
    }

    /// Counts records matching `query`.
    pub fn count<R: Record>(&self, query: &Query<R>) -> StoreResult<usize> {
        let started_at = Instant::now();
        let result = self
            .model
            .entity_of::<R>()
            .and_then(|entity| self.count_rows(entity, query));
        self.log_outcome("count", R::entity().name, started_at, &result, |count| {
            format!("count={count}")
        });
        result
    }

    /// Whether any record has `field == value`.
    pub fn exists<R: Record>(
        &self,
        field: R::Field,
        value: impl Into<FieldValue>,
    ) -> StoreResult<bool> {
        Ok(self.count(&Query::<R>::where_eq(field, value))? > 0)
    }

    /// Stages an insert. The record becomes durable on `save`.
    pub fn insert<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = self.model.entity_of::<R>().and_then(|entity| {
            let values = checked_values(entity, record.values())?;
            let placeholders = vec!["?"; values.len()].join(", ");
            let columns = entity
                .attributes
                .iter()
                .map(|attr| quote_identifier(attr.name))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                quote_identifier(entity.name)
            );
            self.stage(|conn| {
                let changed = conn.execute(
                    &sql,
                    params_from_iter(values.iter().map(FieldValue::to_sql_value)),
                )?;
                Ok(changed)
            })
        });
        self.log_outcome("insert", R::entity().name, started_at, &result, |_| {
            format!("pending_changes={}", self.pending_changes)
        });
        result.map(|_| ())
    }

    /// Stages deletion of records matching `query`; returns the deleted count.
    pub fn delete_matching<R: Record>(&mut self, query: &Query<R>) -> StoreResult<usize> {
        self.delete_rows("delete", query)
    }

    /// Stages deletion of every record of type `R` without loading any of them.
    pub fn batch_delete<R: Record>(&mut self) -> StoreResult<usize> {
        self.delete_rows("batch_delete", &Query::<R>::all())
    }

    /// Commits staged writes. No-op when nothing is pending.
    ///
    /// # Errors
    /// - `Commit` when SQLite refuses the commit; the context is rolled back.
    pub fn save(&mut self) -> StoreResult<()> {
        if self.conn.is_autocommit() {
            self.pending_changes = 0;
            return Ok(());
        }

        let started_at = Instant::now();
        let pending = self.pending_changes;
        match self.conn.execute_batch("COMMIT;") {
            Ok(()) => {
                self.pending_changes = 0;
                info!(
                    "event=context_save module=context status=ok context={} pending_changes={} duration_ms={}",
                    self.kind,
                    pending,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=context_save module=context status=error context={} pending_changes={} duration_ms={} error_code=commit_failed error={}",
                    self.kind,
                    pending,
                    started_at.elapsed().as_millis(),
                    err
                );
                self.discard_transaction();
                Err(StoreError::Commit(err))
            }
        }
    }

    /// Discards staged writes.
    pub fn rollback(&mut self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
            info!(
                "event=context_rollback module=context status=ok context={} pending_changes={}",
                self.kind, self.pending_changes
            );
        }
        self.pending_changes = 0;
        Ok(())
    }

    fn select<R: Record>(
        &self,
        entity: &EntityDescriptor,
        query: &Query<R>,
    ) -> StoreResult<Vec<R>> {
        let (where_sql, mut bind_values) = query.where_sql()?;
        let tail_sql = query.tail_sql(&mut bind_values)?;
        let sql = format!(
            "SELECT {} FROM {}{where_sql}{tail_sql};",
            entity.select_columns_sql(),
            quote_identifier(entity.name)
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(R::from_row(row)?);
        }
        Ok(records)
    }

    fn count_rows<R: Record>(
        &self,
        entity: &EntityDescriptor,
        query: &Query<R>,
    ) -> StoreResult<usize> {
        let (sql, bind_values) = matching_rows_sql(entity, query, "COUNT(*)")?;
        let count: i64 = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params_from_iter(bind_values), |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative row count {count}")))
    }

    fn delete_rows<R: Record>(&mut self, event: &str, query: &Query<R>) -> StoreResult<usize> {
        let started_at = Instant::now();
        let result = self.model.entity_of::<R>().and_then(|entity| {
            let (where_sql, mut bind_values) = query.where_sql()?;
            let table = quote_identifier(entity.name);
            let sql = if query.is_windowed() {
                let tail_sql = query.tail_sql(&mut bind_values)?;
                let pk = quote_identifier(PRIMARY_KEY_COLUMN);
                format!(
                    "DELETE FROM {table} WHERE {pk} IN (SELECT {pk} FROM {table}{where_sql}{tail_sql});"
                )
            } else {
                format!("DELETE FROM {table}{where_sql};")
            };
            self.stage(|conn| Ok(conn.execute(&sql, params_from_iter(bind_values))?))
        });
        self.log_outcome(event, R::entity().name, started_at, &result, |deleted| {
            format!(
                "deleted={deleted} pending_changes={}",
                self.pending_changes
            )
        });
        result
    }

    /// Runs one write inside the context transaction, opening it if needed.
    fn stage(&mut self, write: impl FnOnce(&Connection) -> StoreResult<usize>) -> StoreResult<usize> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        }

        let outcome = write(&self.conn);
        if let Ok(changed) = &outcome {
            self.pending_changes += *changed;
        }

        if self.pending_changes == 0 && !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        outcome
    }

    fn discard_transaction(&mut self) {
        if !self.conn.is_autocommit() {
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                warn!(
                    "event=context_rollback module=context status=error context={} error={}",
                    self.kind, err
                );
            }
        }
        self.pending_changes = 0;
    }

    fn log_outcome<T>(
        &self,
        event: &str,
        record_type: &str,
        started_at: Instant,
        result: &StoreResult<T>,
        detail: impl FnOnce(&T) -> String,
    ) {
        match result {
            Ok(value) => debug!(
                "event={event} module=context status=ok context={} record_type={record_type} duration_ms={} {}",
                self.kind,
                started_at.elapsed().as_millis(),
                detail(value)
            ),
            Err(err) => error!(
                "event={event} module=context status=error context={} record_type={record_type} duration_ms={} error_code={} error={}",
                self.kind,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.has_changes() {
            warn!(
                "event=context_drop module=context status=discarded context={} pending_changes={}",
                self.kind, self.pending_changes
            );
        }
        self.discard_transaction();
    }
}

fn matching_rows_sql<R: Record>(
    entity: &EntityDescriptor,
    query: &Query<R>,
    projection: &str,
) -> StoreResult<(String, Vec<rusqlite::types::Value>)> {
    let (where_sql, mut bind_values) = query.where_sql()?;
    let table = quote_identifier(entity.name);
    let sql = if query.is_windowed() {
        let tail_sql = query.tail_sql(&mut bind_values)?;
        format!(
            "SELECT {projection} FROM (SELECT {} FROM {table}{where_sql}{tail_sql});",
            quote_identifier(PRIMARY_KEY_COLUMN)
        )
    } else {
        format!("SELECT {projection} FROM {table}{where_sql};")
    };
    Ok((sql, bind_values))
}

fn checked_values(
    entity: &EntityDescriptor,
    values: Vec<FieldValue>,
) -> StoreResult<Vec<FieldValue>> {
    if values.len() != entity.attributes.len() {
        return Err(StoreError::InvalidData(format!(
            "{} expects {} attribute values, got {}",
            entity.name,
            entity.attributes.len(),
            values.len()
        )));
    }
    if let Some(attr) = entity
        .attributes
        .iter()
        .zip(&values)
        .find_map(|(attr, value)| (value.is_null() && !attr.optional).then_some(attr))
    {
        return Err(StoreError::InvalidData(format!(
            "{}.{} is required",
            entity.name, attr.name
        )));
    }
    Ok(values)
}
