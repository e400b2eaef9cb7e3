//! Record store facade.
//!
//! # Responsibility
//! - Own the store lifecycle: open, register record types, destroy.
//! - Expose typed fetch/exists/delete helpers over the primary context.
//! - Hand out background contexts for work that must not block the caller.
//!
//! # Invariants
//! - Stores are constructed explicitly; there is no process-wide instance.
//! - `delete` and `delete_all` write and save in one transaction; a failed
//!   save leaves neither the deletion nor other pending primary changes behind.
//! - Operations on record types not registered at open time fail with
//!   `UnregisteredRecordType`.

mod file;

pub use file::delete_store_file;

use crate::config::StoreConfig;
use crate::context::{spawn_background, BackgroundTask, Context, ContextKind, Model};
use crate::db::{
    open_db, open_worker_db, read_metadata, register_entities, StoreLocation, StoreMetadata,
};
use crate::error::StoreResult;
use crate::model::entity::EntityDescriptor;
use crate::model::query::Query;
use crate::model::record::{FieldValue, Record};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

/// Collects record types before opening a [`RecordStore`].
pub struct RecordStoreBuilder {
    config: StoreConfig,
    entities: Vec<&'static EntityDescriptor>,
}

impl RecordStoreBuilder {
    /// Registers record type `R`.
    pub fn register<R: Record>(self) -> Self {
        self.register_entity(R::entity())
    }

    pub fn register_entity(mut self, entity: &'static EntityDescriptor) -> Self {
        if !self.entities.iter().any(|known| *known == entity) {
            self.entities.push(entity);
        }
        self
    }

    /// Opens the store, applying migrations and creating record tables.
    ///
    /// # Errors
    /// - `DirectoryNotFound` when no support directory can be resolved.
    /// - `SchemaMismatch` when a registered layout changed since last open.
    /// - `UnsupportedSchemaVersion` when the file was written by a newer build.
    pub fn open(self) -> StoreResult<RecordStore> {
        let started_at = Instant::now();
        let Self { config, entities } = self;

        let result = open_store(&config, &entities);
        match &result {
            Ok((location, _, _)) => info!(
                "event=store_open module=store status=ok app={} location={:?} record_types={} duration_ms={}",
                config.app_name,
                location,
                entities.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_open module=store status=error app={} duration_ms={} error_code={} error={}",
                config.app_name,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result.map(|(location, model, primary)| RecordStore {
            config,
            location,
            model,
            primary,
        })
    }
}

fn open_store(
    config: &StoreConfig,
    entities: &[&'static EntityDescriptor],
) -> StoreResult<(StoreLocation, Arc<Model>, Context)> {
    let location = if config.in_memory {
        StoreLocation::ephemeral()?
    } else {
        let path = config.store_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        StoreLocation::File(path)
    };

    let mut conn = open_db(&location, config.busy_timeout())?;
    register_entities(&mut conn, entities)?;

    let model = Arc::new(Model::new(entities));
    let primary = Context::new(
        conn,
        ContextKind::Primary,
        Arc::clone(&model),
        location.clone(),
    );
    Ok((location, model, primary))
}

/// Typed persistence facade over one embedded store.
pub struct RecordStore {
    config: StoreConfig,
    location: StoreLocation,
    model: Arc<Model>,
    primary: Context,
}

impl RecordStore {
    pub fn builder(config: StoreConfig) -> RecordStoreBuilder {
        RecordStoreBuilder {
            config,
            entities: Vec::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// The primary (foreground) context.
    pub fn context(&self) -> &Context {
        &self.primary
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.primary
    }

    pub fn metadata(&self) -> StoreResult<StoreMetadata> {
        read_metadata(self.primary.connection())
    }

    /// All records of type `R` in store order; empty when none exist.
    pub fn fetch_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.primary.fetch_all()
    }

    /// Fetches all records of type `R` on a background context.
    ///
    /// `completion` runs on the worker thread once the fetch finishes. The
    /// fetch reads everything committed before it started, including earlier
    /// primary saves.
    ///
    /// Every outcome reaches `completion`, including a worker connection that
    /// fails to open. The returned task only reports a panic in `completion`.
    pub fn fetch_all_async<R, F>(&self, completion: F) -> StoreResult<BackgroundTask<()>>
    where
        R: Record + 'static,
        F: FnOnce(StoreResult<Vec<R>>) + Send + 'static,
    {
        spawn_background(
            self.location.clone(),
            self.config.busy_timeout(),
            Arc::clone(&self.model),
            move |opened| {
                completion(opened.and_then(|context| context.fetch_all::<R>()));
                Ok(())
            },
        )
    }

    pub fn fetch<R: Record>(&self, query: &Query<R>) -> StoreResult<Vec<R>> {
        self.primary.fetch(query)
    }

    /// First record whose `field` equals `value`, in store order.
    pub fn fetch_one<R: Record>(
        &self,
        field: R::Field,
        value: impl Into<FieldValue>,
    ) -> StoreResult<Option<R>> {
        self.primary.fetch_first(Query::where_eq(field, value))
    }

    pub fn count<R: Record>(&self, query: &Query<R>) -> StoreResult<usize> {
        self.primary.count(query)
    }

    /// Whether a record with `field == value` is visible to the primary context.
    ///
    /// Use [`Context::exists`] to check on another context.
    pub fn exists<R: Record>(
        &self,
        field: R::Field,
        value: impl Into<FieldValue>,
    ) -> StoreResult<bool> {
        self.primary.exists::<R>(field, value)
    }

    /// Stages an insert on the primary context; call `save_context` to persist.
    pub fn insert<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        self.primary.insert(record)
    }

    /// Deletes the first record whose `field` equals `value` and saves.
    ///
    /// Returns `Ok(false)` when nothing matches; the store is left untouched.
    pub fn delete<R: Record>(
        &mut self,
        field: R::Field,
        value: impl Into<FieldValue>,
    ) -> StoreResult<bool> {
        let deleted = self
            .primary
            .delete_matching(&Query::<R>::where_eq(field, value).limit(1))?;
        if deleted == 0 {
            return Ok(false);
        }
        self.primary.save()?;
        Ok(true)
    }

    /// Deletes every record of type `R` without loading them, then saves.
    ///
    /// Returns the number of deleted records. Other record types are untouched.
    pub fn delete_all<R: Record>(&mut self) -> StoreResult<usize> {
        let deleted = self.primary.batch_delete::<R>()?;
        self.primary.save()?;
        Ok(deleted)
    }

    /// Commits pending primary-context changes, if any.
    pub fn save_context(&mut self) -> StoreResult<()> {
        self.primary.save()
    }

    pub fn rollback(&mut self) -> StoreResult<()> {
        self.primary.rollback()
    }

    pub fn has_changes(&self) -> bool {
        self.primary.has_changes()
    }

    /// Opens a background context the caller may move to its own thread.
    pub fn new_background_context(&self) -> StoreResult<Context> {
        let conn = open_worker_db(&self.location, self.config.busy_timeout())?;
        Ok(Context::new(
            conn,
            ContextKind::Background,
            Arc::clone(&self.model),
            self.location.clone(),
        ))
    }

    /// Runs `work` on a fresh background context on a worker thread.
    ///
    /// Unsaved writes made by `work` are discarded when it returns.
    pub fn perform_background<T, F>(&self, work: F) -> StoreResult<BackgroundTask<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut Context) -> StoreResult<T> + Send + 'static,
    {
        spawn_background(
            self.location.clone(),
            self.config.busy_timeout(),
            Arc::clone(&self.model),
            move |opened| {
                let mut context = opened?;
                work(&mut context)
            },
        )
    }

    /// Closes the store and deletes its backing file.
    ///
    /// Ephemeral stores are closed and their scratch directory removed.
    pub fn destroy(self) -> StoreResult<()> {
        let Self {
            config,
            location,
            model,
            primary,
        } = self;
        drop(primary);
        drop(model);

        match location {
            StoreLocation::File(_) => delete_store_file(&config),
            StoreLocation::Ephemeral(_) => Ok(()),
        }
    }
}
