//! Store configuration and store-file location rules.
//!
//! # Responsibility
//! - Describe where the persistent store lives and how connections behave.
//! - Resolve the per-user application-support directory.
//!
//! # Invariants
//! - The store file is always named `<app_name>.sqlite`.
//! - An explicit `support_dir` always wins over platform resolution.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const STORE_FILE_EXTENSION: &str = "sqlite";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration for opening a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Application name; drives the store file name.
    pub app_name: String,
    /// Overrides the platform application-support directory.
    #[serde(default)]
    pub support_dir: Option<PathBuf>,
    /// Uses a throwaway scratch database that disappears when the store closes.
    #[serde(default)]
    pub in_memory: bool,
    /// How long a connection waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            support_dir: None,
            in_memory: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Places the store file under `dir` instead of the platform default.
    pub fn with_support_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.support_dir = Some(dir.into());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Store file name, e.g. `VHIRegister.sqlite`.
    pub fn store_file_name(&self) -> String {
        format!("{}.{STORE_FILE_EXTENSION}", self.app_name)
    }

    /// Resolves the application-support directory.
    ///
    /// Returns `None` when neither an override nor a platform directory exists.
    pub fn resolve_support_dir(&self) -> Option<PathBuf> {
        self.support_dir.clone().or_else(dirs::data_dir)
    }

    /// Full path of the backing store file.
    ///
    /// # Errors
    /// - `DirectoryNotFound` when the support directory cannot be resolved.
    /// - `InvalidIdentifier` when `app_name` is empty or contains a path separator.
    pub fn store_path(&self) -> StoreResult<PathBuf> {
        let name = self.app_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(StoreError::InvalidIdentifier(self.app_name.clone()));
        }
        let dir = self
            .resolve_support_dir()
            .ok_or(StoreError::DirectoryNotFound)?;
        Ok(dir.join(self.store_file_name()))
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
