mod support;

use recordstore_core::db::migrations::latest_version;
use recordstore_core::{
    delete_store_file, Attribute, AttributeType, EntityDescriptor, RecordStore, StoreConfig,
    StoreError, StoreLocation,
};
use rusqlite::Connection;
use support::{file_config, open_file_store, patient, seed, Patient, PatientField, APP_NAME};

static PATIENT_WITH_EMAIL: EntityDescriptor = EntityDescriptor::new(
    "Patient",
    &[
        Attribute::required("id", AttributeType::Text).indexed(),
        Attribute::required("name", AttributeType::Text),
        Attribute::optional("age", AttributeType::Integer),
        Attribute::required("active", AttributeType::Bool),
        Attribute::optional("email", AttributeType::Text),
    ],
);

#[test]
fn file_store_is_created_under_support_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_file_store(dir.path());

    let expected = dir.path().join(format!("{APP_NAME}.sqlite"));
    assert_eq!(store.location(), &StoreLocation::File(expected.clone()));
    assert!(expected.is_file());
}

#[test]
fn missing_support_directory_is_created_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("Library").join("Application Support");
    let store = open_file_store(&nested);

    assert!(nested.join(format!("{APP_NAME}.sqlite")).is_file());
    drop(store);
}

#[test]
fn records_and_store_identity_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let first_uuid = {
        let mut store = open_file_store(dir.path());
        seed(&mut store, &[patient("X", "Ada")]);
        store.metadata().unwrap().store_uuid
    };

    let store = open_file_store(dir.path());
    let metadata = store.metadata().unwrap();
    assert_eq!(metadata.store_uuid, first_uuid);
    assert_eq!(metadata.schema_version, latest_version());
    assert_eq!(metadata.record_types, vec!["Patient", "Visit"]);
    assert!(store.exists::<Patient>(PatientField::Id, "X").unwrap());
}

#[test]
fn unsaved_changes_are_discarded_when_store_closes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = open_file_store(dir.path());
        store.insert(&patient("X", "Ada")).unwrap();
        assert!(store.has_changes());
    }

    let store = open_file_store(dir.path());
    assert!(store.fetch_all::<Patient>().unwrap().is_empty());
}

#[test]
fn reopening_with_changed_layout_returns_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    drop(open_file_store(dir.path()));

    let result = RecordStore::builder(file_config(dir.path()))
        .register_entity(&PATIENT_WITH_EMAIL)
        .open();
    match result {
        Err(StoreError::SchemaMismatch { record_type, .. }) => assert_eq!(record_type, "Patient"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected schema mismatch"),
    }
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    let conn = Connection::open(config.store_path().unwrap()).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let result = RecordStore::builder(config).register::<Patient>().open();
    match result {
        Err(StoreError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected unsupported schema version"),
    }
}

#[test]
fn delete_store_file_reports_absent_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = delete_store_file(&file_config(dir.path())).unwrap_err();
    assert!(matches!(err, StoreError::FileDoesNotExist(_)));
}

#[test]
fn delete_store_file_succeeds_once_then_reports_absent_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    {
        let mut store = open_file_store(dir.path());
        seed(&mut store, &[patient("X", "Ada")]);
    }

    delete_store_file(&config).unwrap();
    assert!(!config.store_path().unwrap().exists());

    let err = delete_store_file(&config).unwrap_err();
    assert!(matches!(err, StoreError::FileDoesNotExist(_)));
}

#[test]
fn destroy_closes_store_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    let mut store = open_file_store(dir.path());
    seed(&mut store, &[patient("X", "Ada")]);

    store.destroy().unwrap();

    assert!(!config.store_path().unwrap().exists());
    assert!(matches!(
        delete_store_file(&config),
        Err(StoreError::FileDoesNotExist(_))
    ));

    let reopened = open_file_store(dir.path());
    assert!(reopened.fetch_all::<Patient>().unwrap().is_empty());
}

#[test]
fn destroying_in_memory_store_removes_only_its_scratch_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path()).in_memory();
    let store = RecordStore::builder(config.clone())
        .register::<Patient>()
        .open()
        .unwrap();
    let scratch = store.location().db_path();
    assert!(!scratch.starts_with(dir.path()));

    store.destroy().unwrap();
    assert!(!scratch.exists());
    assert!(!config.store_path().unwrap().exists());
}

#[test]
fn in_memory_scratch_directory_outlives_store_until_last_context() {
    let store = support::open_memory_store();
    let db_path = store.location().db_path();
    assert!(db_path.is_file());

    let background = store.new_background_context().unwrap();
    assert_eq!(background.location(), store.location());
    drop(store);
    assert!(background.fetch_all::<Patient>().unwrap().is_empty());

    drop(background);
    assert!(!db_path.exists());
    assert!(!db_path.parent().unwrap().exists());
}

#[test]
fn config_deserializes_with_defaults() {
    let config: StoreConfig =
        serde_json::from_str(r#"{"app_name":"VHIRegister","support_dir":"/data/app"}"#).unwrap();

    assert_eq!(config.app_name, "VHIRegister");
    assert!(!config.in_memory);
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(
        config.store_path().unwrap(),
        std::path::PathBuf::from("/data/app/VHIRegister.sqlite")
    );
}
