//! Static schema descriptors for record types.
//!
//! # Responsibility
//! - Describe a record type's table name and attribute columns.
//! - Validate identifiers before they are ever placed into SQL text.
//!
//! # Invariants
//! - Entity and attribute names match `^[A-Za-z][A-Za-z0-9_]*$`.
//! - Names starting with `_` are reserved for engine columns such as `_pk`.
//! - The attribute signature is stable for identical descriptors.

use crate::error::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Hidden identity column added to every record table.
pub const PRIMARY_KEY_COLUMN: &str = "_pk";

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern must compile")
});

/// Storage class of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    Integer,
    Real,
    /// Stored as `INTEGER` 0/1.
    Bool,
    Blob,
}

impl AttributeType {
    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer | Self::Bool => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    fn signature_tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "bool",
            Self::Blob => "blob",
        }
    }
}

/// One named attribute of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeType,
    /// Allows `NULL` values.
    pub optional: bool,
    /// Creates a lookup index for equality queries.
    pub indexed: bool,
}

impl Attribute {
    pub const fn required(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            optional: false,
            indexed: false,
        }
    }

    pub const fn optional(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            optional: true,
            indexed: false,
        }
    }

    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Schema of a record type, declared once per type as a `static`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub attributes: &'static [Attribute],
}

impl EntityDescriptor {
    pub const fn new(name: &'static str, attributes: &'static [Attribute]) -> Self {
        Self { name, attributes }
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Checks entity and attribute names, and rejects duplicates.
    pub fn validate(&self) -> StoreResult<()> {
        validate_identifier(self.name)?;
        if self.attributes.is_empty() {
            return Err(StoreError::InvalidIdentifier(format!(
                "{} declares no attributes",
                self.name
            )));
        }
        for (index, attr) in self.attributes.iter().enumerate() {
            validate_identifier(attr.name)?;
            if self.attributes[..index]
                .iter()
                .any(|prev| prev.name.eq_ignore_ascii_case(attr.name))
            {
                return Err(StoreError::InvalidIdentifier(format!(
                    "{}.{} is declared twice",
                    self.name, attr.name
                )));
            }
        }
        Ok(())
    }

    /// Compact layout string persisted in the record-type registry.
    ///
    /// Format: `name:type[?]` per attribute, comma separated, `?` marking optional.
    pub fn signature(&self) -> String {
        self.attributes
            .iter()
            .map(|attr| {
                format!(
                    "{}:{}{}",
                    attr.name,
                    attr.kind.signature_tag(),
                    if attr.optional { "?" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    pub(crate) fn create_table_sql(&self) -> String {
        let mut columns = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_identifier(PRIMARY_KEY_COLUMN)
        )];
        columns.extend(self.attributes.iter().map(|attr| {
            format!(
                "{} {}{}",
                quote_identifier(attr.name),
                attr.kind.sql_type(),
                if attr.optional { "" } else { " NOT NULL" }
            )
        }));

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            quote_identifier(self.name),
            columns.join(",\n    ")
        )
    }

    /// `CREATE INDEX IF NOT EXISTS` statements for indexed attributes.
    ///
    /// Indexing is not part of the signature, so these run on every open.
    pub(crate) fn create_indexes_sql(&self) -> String {
        self.attributes
            .iter()
            .filter(|attr| attr.indexed)
            .map(|attr| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                    quote_identifier(&format!("idx_{}_{}", self.name, attr.name)),
                    quote_identifier(self.name),
                    quote_identifier(attr.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Comma-separated quoted column list, starting with `_pk`.
    pub(crate) fn select_columns_sql(&self) -> String {
        std::iter::once(PRIMARY_KEY_COLUMN)
            .chain(self.attributes.iter().map(|attr| attr.name))
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) fn validate_identifier(name: &str) -> StoreResult<()> {
    if IDENTIFIER_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Wraps a validated identifier in double quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}
