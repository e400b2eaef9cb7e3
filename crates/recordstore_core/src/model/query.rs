//! Typed query builder over record fields.
//!
//! # Responsibility
//! - Express equality filters, ordering and pagination without string predicates.
//! - Render `WHERE`/`ORDER BY`/`LIMIT` fragments with bound parameters.
//!
//! # Invariants
//! - Column names come only from validated descriptors.
//! - Values are always bound, never interpolated.
//! - Default order is insertion order (`_pk ASC`), so results are stable.

use super::entity::{quote_identifier, EntityDescriptor, PRIMARY_KEY_COLUMN};
use super::record::{FieldValue, Record, RecordField};
use crate::error::{StoreError, StoreResult};
use rusqlite::types::Value;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Query options for fetching, counting and deleting records of type `R`.
pub struct Query<R: Record> {
    filters: Vec<(R::Field, FieldValue)>,
    sort: Vec<(R::Field, SortOrder)>,
    limit: Option<u32>,
    offset: u32,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Query<R> {
    /// Matches every record, in store order.
    pub fn all() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: 0,
            _record: PhantomData,
        }
    }

    /// Matches records whose `field` equals `value`.
    ///
    /// `FieldValue::Null` matches records where the attribute is unset.
    pub fn where_eq(field: R::Field, value: impl Into<FieldValue>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: R::Field, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    pub fn sort_by(mut self, field: R::Field, order: SortOrder) -> Self {
        self.sort.push((field, order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Renders ` WHERE ...` (or an empty string) plus its bound values.
    pub(crate) fn where_sql(&self) -> StoreResult<(String, Vec<Value>)> {
        let entity = R::entity();
        if self.filters.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut clauses = Vec::with_capacity(self.filters.len());
        let mut bind_values = Vec::new();
        for (field, value) in &self.filters {
            let column = checked_column(entity, *field)?;
            if value.is_null() {
                clauses.push(format!("{column} IS NULL"));
            } else {
                clauses.push(format!("{column} = ?"));
                bind_values.push(value.to_sql_value());
            }
        }

        Ok((format!(" WHERE {}", clauses.join(" AND ")), bind_values))
    }

    /// Renders ` ORDER BY ... [LIMIT ? [OFFSET ?]]` and appends its bound values.
    pub(crate) fn tail_sql(&self, bind_values: &mut Vec<Value>) -> StoreResult<String> {
        let entity = R::entity();
        let mut order_terms = Vec::with_capacity(self.sort.len() + 1);
        for (field, order) in &self.sort {
            order_terms.push(format!(
                "{} {}",
                checked_column(entity, *field)?,
                order.sql()
            ));
        }
        order_terms.push(format!("{} ASC", quote_identifier(PRIMARY_KEY_COLUMN)));

        let mut sql = format!(" ORDER BY {}", order_terms.join(", "));
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
        Ok(sql)
    }

    /// True when the query narrows the row set beyond its filters.
    pub(crate) fn is_windowed(&self) -> bool {
        self.limit.is_some() || self.offset > 0
    }
}

fn checked_column<F: RecordField>(entity: &EntityDescriptor, field: F) -> StoreResult<String> {
    let name = field.attribute();
    match entity.attribute(name) {
        Some(attr) => Ok(quote_identifier(attr.name)),
        None => Err(StoreError::UnknownAttribute {
            record_type: entity.name,
            attribute: name,
        }),
    }
}
