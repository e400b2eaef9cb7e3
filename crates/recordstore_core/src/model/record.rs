//! Record trait and typed attribute values.
//!
//! # Responsibility
//! - Let callers describe their own record types without touching SQL.
//! - Carry attribute values as bound parameters, never as SQL text.
//!
//! # Invariants
//! - `Record::values()` yields one value per descriptor attribute, in order.
//! - `RecordField::attribute()` names an attribute of the owning descriptor.

use super::entity::EntityDescriptor;
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::Debug;

/// Typed selector for one attribute of a record type.
///
/// Usually a fieldless enum, one variant per attribute.
pub trait RecordField: Copy + Debug + Send + 'static {
    fn attribute(self) -> &'static str;
}

/// A record type stored by the facade.
pub trait Record: Sized {
    type Field: RecordField;

    /// Static schema of this record type.
    fn entity() -> &'static EntityDescriptor;

    /// Builds an instance from a selected row; columns are addressable by attribute name.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Attribute values in descriptor order.
    fn values(&self) -> Vec<FieldValue>;
}

/// Typed attribute value used for inserts and equality predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub(crate) fn to_sql_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(value) => Value::Integer(*value),
            Self::Real(value) => Value::Real(*value),
            Self::Text(value) => Value::Text(value.clone()),
            Self::Bool(value) => Value::Integer(bool_to_int(*value)),
            Self::Blob(value) => Value::Blob(value.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
