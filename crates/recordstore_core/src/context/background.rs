//! Worker-thread execution for background contexts.
//!
//! # Responsibility
//! - Open a fresh connection for each background unit of work.
//! - Run caller work off the primary thread and hand back a join handle.
//!
//! # Invariants
//! - A background context never shares a connection with the primary context.
//! - Every statement on a background connection reads the latest committed
//!   state, which is how primary commits reach background work.
//! - Unsaved background writes are discarded when the work returns.
//! - Work always runs, even when the worker connection cannot be opened; it
//!   receives the open error instead of a context.

use super::{Context, ContextKind, Model};
use crate::db::{open_worker_db, StoreLocation};
use crate::error::{StoreError, StoreResult};
use log::{debug, error};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WORKER_THREAD_NAME: &str = "recordstore-bg";

/// Handle to work running on a background context.
#[must_use = "dropping the task detaches it; call `wait` to observe its result"]
pub struct BackgroundTask<T> {
    handle: JoinHandle<StoreResult<T>>,
}

impl<T> BackgroundTask<T> {
    /// Blocks until the work finishes and returns its result.
    pub fn wait(self) -> StoreResult<T> {
        self.handle
            .join()
            .map_err(|_| StoreError::BackgroundPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns `work` on a worker thread with a freshly opened background context.
pub(crate) fn spawn_background<T, F>(
    location: StoreLocation,
    busy_timeout: Duration,
    model: Arc<Model>,
    work: F,
) -> StoreResult<BackgroundTask<T>>
where
    T: Send + 'static,
    F: FnOnce(StoreResult<Context>) -> StoreResult<T> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let started_at = Instant::now();
            let opened = open_worker_db(&location, busy_timeout)
                .map(|conn| Context::new(conn, ContextKind::Background, model, location));
            let outcome = work(opened);
            match &outcome {
                Ok(_) => debug!(
                    "event=background_perform module=context status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                ),
                Err(err) => error!(
                    "event=background_perform module=context status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                ),
            }
            outcome
        })?;

    Ok(BackgroundTask { handle })
}
