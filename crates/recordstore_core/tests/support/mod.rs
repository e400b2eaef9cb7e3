#![allow(dead_code)]

use recordstore_core::{
    Attribute, AttributeType, EntityDescriptor, FieldValue, Record, RecordField, RecordStore,
    StoreConfig,
};
use rusqlite::Row;
use std::path::Path;

pub const APP_NAME: &str = "Clinic";

pub static PATIENT_ENTITY: EntityDescriptor = EntityDescriptor::new(
    "Patient",
    &[
        Attribute::required("id", AttributeType::Text).indexed(),
        Attribute::required("name", AttributeType::Text),
        Attribute::optional("age", AttributeType::Integer),
        Attribute::required("active", AttributeType::Bool),
    ],
);

pub static VISIT_ENTITY: EntityDescriptor = EntityDescriptor::new(
    "Visit",
    &[
        Attribute::required("id", AttributeType::Text).indexed(),
        Attribute::required("patient_id", AttributeType::Text).indexed(),
        Attribute::optional("notes", AttributeType::Text),
    ],
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum PatientField {
    Id,
    Name,
    Age,
    Active,
}

impl RecordField for PatientField {
    fn attribute(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Age => "age",
            Self::Active => "active",
        }
    }
}

impl Record for Patient {
    type Field = PatientField;

    fn entity() -> &'static EntityDescriptor {
        &PATIENT_ENTITY
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            active: row.get("active")?,
        })
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.as_str().into(),
            self.name.as_str().into(),
            self.age.into(),
            self.active.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: String,
    pub patient_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum VisitField {
    Id,
    PatientId,
    Notes,
}

impl RecordField for VisitField {
    fn attribute(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::PatientId => "patient_id",
            Self::Notes => "notes",
        }
    }
}

impl Record for Visit {
    type Field = VisitField;

    fn entity() -> &'static EntityDescriptor {
        &VISIT_ENTITY
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            notes: row.get("notes")?,
        })
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.as_str().into(),
            self.patient_id.as_str().into(),
            self.notes.clone().into(),
        ]
    }
}

pub fn patient(id: &str, name: &str) -> Patient {
    Patient {
        id: id.to_string(),
        name: name.to_string(),
        age: None,
        active: true,
    }
}

pub fn visit(id: &str, patient_id: &str) -> Visit {
    Visit {
        id: id.to_string(),
        patient_id: patient_id.to_string(),
        notes: None,
    }
}

pub fn open_memory_store() -> RecordStore {
    RecordStore::builder(StoreConfig::new(APP_NAME).in_memory())
        .register::<Patient>()
        .register::<Visit>()
        .open()
        .unwrap()
}

pub fn file_config(dir: &Path) -> StoreConfig {
    StoreConfig::new(APP_NAME).with_support_dir(dir)
}

pub fn open_file_store(dir: &Path) -> RecordStore {
    open_file_store_with(file_config(dir))
}

pub fn open_file_store_with(config: StoreConfig) -> RecordStore {
    RecordStore::builder(config)
        .register::<Patient>()
        .register::<Visit>()
        .open()
        .unwrap()
}

/// Inserts and saves `records` through the primary context.
pub fn seed<R: Record>(store: &mut RecordStore, records: &[R]) {
    for record in records {
        store.insert(record).unwrap();
    }
    store.save_context().unwrap();
}
