//! Persistent store file teardown.
//!
//! # Responsibility
//! - Remove the backing `<AppName>.sqlite` file and its SQLite sidecars.
//!
//! # Invariants
//! - Open handles are never touched here; callers close the store first
//!   (or use `RecordStore::destroy`).
//! - A missing store file is reported, not ignored.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use log::{error, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

/// Deletes the store file described by `config`.
///
/// # Errors
/// - `DirectoryNotFound` when the application-support directory cannot be resolved.
/// - `FileDoesNotExist` when the store file is already absent.
/// - `Io` when removal fails.
pub fn delete_store_file(config: &StoreConfig) -> StoreResult<()> {
    let store_path = match config.store_path() {
        Ok(path) => path,
        Err(err) => {
            error!(
                "event=store_file_delete module=store status=error error_code={} error={}",
                err.code(),
                err
            );
            return Err(err);
        }
    };

    if !store_path.is_file() {
        warn!(
            "event=store_file_delete module=store status=error error_code=file_does_not_exist path={}",
            store_path.display()
        );
        return Err(StoreError::FileDoesNotExist(store_path));
    }

    if let Err(err) = fs::remove_file(&store_path) {
        error!(
            "event=store_file_delete module=store status=error error_code=io path={} error={}",
            store_path.display(),
            err
        );
        return Err(err.into());
    }

    let mut removed_sidecars = 0usize;
    for sidecar in sidecar_paths(&store_path) {
        match fs::remove_file(&sidecar) {
            Ok(()) => removed_sidecars += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(
                    "event=store_file_delete module=store status=error error_code=io path={} error={}",
                    sidecar.display(),
                    err
                );
                return Err(err.into());
            }
        }
    }

    info!(
        "event=store_file_delete module=store status=ok path={} sidecars_removed={}",
        store_path.display(),
        removed_sidecars
    );
    Ok(())
}

fn sidecar_paths(store_path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    SIDECAR_SUFFIXES.iter().map(move |suffix| {
        let mut name = OsString::from(store_path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    })
}

#[cfg(test)]
mod tests {
    use super::{delete_store_file, sidecar_paths};
    use crate::config::StoreConfig;
    use crate::error::StoreError;
    use std::path::PathBuf;

    #[test]
    fn sidecars_sit_next_to_store_file() {
        let paths: Vec<_> = sidecar_paths(&PathBuf::from("/data/App.sqlite")).collect();
        assert_eq!(paths[0], PathBuf::from("/data/App.sqlite-wal"));
        assert_eq!(paths[1], PathBuf::from("/data/App.sqlite-shm"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new("Missing").with_support_dir(dir.path());

        let err = delete_store_file(&config).unwrap_err();
        assert!(matches!(err, StoreError::FileDoesNotExist(path) if path.ends_with("Missing.sqlite")));
    }

    #[test]
    fn removes_file_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new("App").with_support_dir(dir.path());
        std::fs::write(dir.path().join("App.sqlite"), b"db").unwrap();
        std::fs::write(dir.path().join("App.sqlite-wal"), b"wal").unwrap();

        delete_store_file(&config).unwrap();

        assert!(!dir.path().join("App.sqlite").exists());
        assert!(!dir.path().join("App.sqlite-wal").exists());
    }
}
